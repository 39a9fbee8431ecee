use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fuel carried by a tanker. Serialized by canonical name; `label()` is the
/// text shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    #[serde(alias = "Diésel")]
    Diesel,
    #[serde(alias = "Nafta")]
    Gasoline,
    #[serde(rename = "CNG", alias = "GNC")]
    Cng,
}

impl FuelType {
    pub const ALL: [FuelType; 3] = [FuelType::Diesel, FuelType::Gasoline, FuelType::Cng];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Diesel => "Diesel",
            FuelType::Gasoline => "Gasoline",
            FuelType::Cng => "CNG",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Diesel => "Diésel",
            FuelType::Gasoline => "Nafta",
            FuelType::Cng => "GNC",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value {:?}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for FuelType {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_lowercase();
        FuelType::ALL
            .into_iter()
            .find(|fuel| {
                fuel.as_str().to_lowercase() == wanted || fuel.label().to_lowercase() == wanted
            })
            .ok_or_else(|| UnknownVariant(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TripStatus {
    #[default]
    #[serde(alias = "En tránsito")]
    InTransit,
    #[serde(alias = "Finalizado")]
    Completed,
    #[serde(alias = "Cancelado")]
    Cancelled,
}

impl TripStatus {
    pub const ALL: [TripStatus; 3] = [
        TripStatus::InTransit,
        TripStatus::Completed,
        TripStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::InTransit => "InTransit",
            TripStatus::Completed => "Completed",
            TripStatus::Cancelled => "Cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripStatus::InTransit => "En tránsito",
            TripStatus::Completed => "Finalizado",
            TripStatus::Cancelled => "Cancelado",
        }
    }

    /// Cancelled trips accept no further edits.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Cancelled)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_lowercase();
        TripStatus::ALL
            .into_iter()
            .find(|status| {
                status.as_str().to_lowercase() == wanted || status.label().to_lowercase() == wanted
            })
            .ok_or_else(|| UnknownVariant(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub truck: String,
    pub driver: String,
    pub origin: String,
    pub destination: String,
    pub fuel_type: FuelType,
    pub liters: u32,
    pub departure_time: DateTime<Utc>,
    pub status: TripStatus,
    /// Bumped on every write; callers may echo it back as `expectedVersion`.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully validated trip body, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct TripDraft {
    pub truck: String,
    pub driver: String,
    pub origin: String,
    pub destination: String,
    pub fuel_type: FuelType,
    pub liters: u32,
    pub departure_time: DateTime<Utc>,
    pub status: TripStatus,
}

/// Sparse set of column changes applied by the store's update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripUpdate {
    pub truck: Option<String>,
    pub driver: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub liters: Option<u32>,
    pub departure_time: Option<DateTime<Utc>>,
    pub status: Option<TripStatus>,
}

impl TripUpdate {
    pub fn cancel() -> Self {
        Self {
            status: Some(TripStatus::Cancelled),
            ..Self::default()
        }
    }
}

impl From<TripDraft> for TripUpdate {
    fn from(draft: TripDraft) -> Self {
        Self {
            truck: Some(draft.truck),
            driver: Some(draft.driver),
            origin: Some(draft.origin),
            destination: Some(draft.destination),
            fuel_type: Some(draft.fuel_type),
            liters: Some(draft.liters),
            departure_time: Some(draft.departure_time),
            status: Some(draft.status),
        }
    }
}

/// One page of a filtered trip listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPage {
    pub records: Vec<Trip>,
    pub total: u64,
    pub pages: u64,
    pub page: u32,
    pub limit: u32,
}
