//! Turns caller-facing listing requests into store predicates and paging
//! windows.

use crate::{
    models::trip::{FuelType, TripStatus},
    services::{store::TripPredicate, validation::ValidationErrors},
};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// The closed set of listing filters. Every field is optional and absent
/// means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripFilter {
    pub driver: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub status: Option<TripStatus>,
}

impl TripFilter {
    /// Parses raw filter values. Blank values are dropped; unknown fuel
    /// types or statuses are reported per field.
    pub fn parse(
        driver: Option<&str>,
        fuel_type: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fuel_type = match non_blank(fuel_type).map(str::parse::<FuelType>) {
            Some(Ok(fuel)) => Some(fuel),
            Some(Err(_)) => {
                errors.push("fuelType", "El combustible debe ser Diésel, Nafta o GNC");
                None
            }
            None => None,
        };
        let status = match non_blank(status).map(str::parse::<TripStatus>) {
            Some(Ok(status)) => Some(status),
            Some(Err(_)) => {
                errors.push("status", "El estado debe ser: En tránsito, Finalizado o Cancelado");
                None
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            driver: non_blank(driver).map(str::to_string),
            fuel_type,
            status,
        })
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the store predicate for `filter`, AND-ing whatever is present.
pub fn build_predicate(filter: &TripFilter) -> TripPredicate {
    TripPredicate {
        driver_contains: filter
            .driver
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(str::to_lowercase),
        fuel_type: filter.fuel_type,
        status: filter.status,
    }
}

/// Normalized 1-based paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Missing, non-numeric or non-positive inputs fall back to page 1 and
    /// limit 10.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let positive = |value: Option<i64>, fallback: u32| {
            value
                .filter(|v| *v > 0)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(fallback)
        };
        Self {
            page: positive(page, DEFAULT_PAGE),
            limit: positive(limit, DEFAULT_LIMIT),
        }
    }

    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let number = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
        Self::new(number(page), number(limit))
    }

    pub fn capped(self, max_limit: u32) -> Self {
        Self {
            page: self.page,
            limit: self.limit.min(max_limit.max(1)),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// `ceil(total / limit)`; zero matches means zero pages.
pub fn page_count(total: u64, limit: u32) -> u64 {
    let limit = u64::from(limit.max(1));
    total.div_ceil(limit)
}
