//! Field and cross-field rules for trip payloads.
//!
//! Every rule runs on every call; violations are collected in field order so
//! a form can show all of them at once.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::trip::{FuelType, Trip, TripDraft, TripStatus};

pub const MIN_LITERS: u32 = 1;
pub const MAX_LITERS: u32 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|err| err.field == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|err| err.field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Caller-supplied trip body. Every field is optional so the same shape
/// serves creation (all required) and partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPayload {
    pub truck: Option<String>,
    pub driver: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub fuel_type: Option<String>,
    pub liters: Option<Value>,
    pub departure_time: Option<String>,
    pub status: Option<String>,
    pub expected_version: Option<i64>,
}

/// Validates a creation payload. Any supplied status is ignored; new trips
/// always start in transit.
pub fn validate_new(payload: &TripPayload, now: DateTime<Utc>) -> Result<TripDraft, ValidationErrors> {
    check(payload, None, now)
}

/// Validates `payload` merged over the stored trip. The departure time is
/// only held to the future rule when the payload moves it.
pub fn validate_update(
    current: &Trip,
    payload: &TripPayload,
    now: DateTime<Utc>,
) -> Result<TripDraft, ValidationErrors> {
    check(payload, Some(current), now)
}

fn check(
    payload: &TripPayload,
    current: Option<&Trip>,
    now: DateTime<Utc>,
) -> Result<TripDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let truck = text_field(
        &mut errors,
        "truck",
        "El camión",
        payload.truck.as_deref(),
        current.map(|t| t.truck.as_str()),
    );
    let driver = text_field(
        &mut errors,
        "driver",
        "El conductor",
        payload.driver.as_deref(),
        current.map(|t| t.driver.as_str()),
    );
    let origin = text_field(
        &mut errors,
        "origin",
        "El origen",
        payload.origin.as_deref(),
        current.map(|t| t.origin.as_str()),
    );
    let destination = text_field(
        &mut errors,
        "destination",
        "El destino",
        payload.destination.as_deref(),
        current.map(|t| t.destination.as_str()),
    );
    if let (Some(origin), Some(destination)) = (&origin, &destination) {
        if same_place(origin, destination) {
            errors.push("destination", "El destino debe ser diferente al origen");
        }
    }

    let fuel_type = fuel_field(&mut errors, payload.fuel_type.as_deref(), current.map(|t| t.fuel_type));
    let liters = liters_field(&mut errors, payload.liters.as_ref(), current.map(|t| t.liters));
    let departure_time = departure_field(
        &mut errors,
        payload.departure_time.as_deref(),
        current.map(|t| t.departure_time),
        now,
    );
    let status = match current {
        None => Some(TripStatus::InTransit),
        Some(trip) => status_field(&mut errors, payload.status.as_deref(), trip.status),
    };

    match (truck, driver, origin, destination, fuel_type, liters, departure_time, status) {
        (
            Some(truck),
            Some(driver),
            Some(origin),
            Some(destination),
            Some(fuel_type),
            Some(liters),
            Some(departure_time),
            Some(status),
        ) if errors.is_empty() => Ok(TripDraft {
            truck,
            driver,
            origin,
            destination,
            fuel_type,
            liters,
            departure_time,
            status,
        }),
        _ => Err(errors),
    }
}

fn same_place(origin: &str, destination: &str) -> bool {
    origin.to_lowercase() == destination.to_lowercase()
}

fn text_field(
    errors: &mut ValidationErrors,
    field: &'static str,
    subject: &str,
    supplied: Option<&str>,
    current: Option<&str>,
) -> Option<String> {
    match (supplied, current) {
        (Some(raw), _) => {
            let value = raw.trim();
            if value.is_empty() {
                errors.push(field, format!("{subject} no puede estar vacío"));
                None
            } else {
                Some(value.to_string())
            }
        }
        (None, Some(existing)) => Some(existing.to_string()),
        (None, None) => {
            errors.push(field, format!("{subject} es obligatorio"));
            None
        }
    }
}

fn fuel_field(
    errors: &mut ValidationErrors,
    supplied: Option<&str>,
    current: Option<FuelType>,
) -> Option<FuelType> {
    match (supplied, current) {
        (Some(raw), _) => match raw.parse::<FuelType>() {
            Ok(fuel) => Some(fuel),
            Err(_) => {
                errors.push("fuelType", "El combustible debe ser Diésel, Nafta o GNC");
                None
            }
        },
        (None, Some(existing)) => Some(existing),
        (None, None) => {
            errors.push("fuelType", "El tipo de combustible es obligatorio");
            None
        }
    }
}

fn liters_field(
    errors: &mut ValidationErrors,
    supplied: Option<&Value>,
    current: Option<u32>,
) -> Option<u32> {
    let raw = match (supplied, current) {
        (Some(Value::Null), Some(existing)) | (None, Some(existing)) => return Some(existing),
        (Some(Value::Null), None) | (None, None) => {
            errors.push("liters", "La cantidad de litros es obligatoria");
            return None;
        }
        (Some(raw), _) => raw,
    };

    let Some(number) = raw.as_f64() else {
        errors.push("liters", "La cantidad debe ser un número válido");
        return None;
    };
    if number.fract() != 0.0 {
        errors.push("liters", "La cantidad debe ser un número entero");
        return None;
    }
    if number < f64::from(MIN_LITERS) {
        errors.push("liters", "La cantidad mínima es de 1 litro");
        return None;
    }
    if number > f64::from(MAX_LITERS) {
        errors.push("liters", "La cantidad máxima es de 30.000 litros");
        return None;
    }
    Some(number as u32)
}

fn departure_field(
    errors: &mut ValidationErrors,
    supplied: Option<&str>,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let raw = match (supplied, current) {
        (Some(raw), _) => raw,
        (None, Some(existing)) => return Some(existing),
        (None, None) => {
            errors.push("departureTime", "La fecha de salida es obligatoria");
            return None;
        }
    };

    let Some(parsed) = parse_timestamp(raw) else {
        errors.push("departureTime", "La fecha debe tener un formato válido");
        return None;
    };
    if current == Some(parsed) {
        return Some(parsed);
    }
    if parsed <= now {
        errors.push("departureTime", "La fecha de salida no puede ser en el pasado");
        return None;
    }
    Some(parsed)
}

/// RFC 3339, or a zone-less `datetime-local` value read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn status_field(
    errors: &mut ValidationErrors,
    supplied: Option<&str>,
    current: TripStatus,
) -> Option<TripStatus> {
    let Some(raw) = supplied else {
        return Some(current);
    };
    match raw.parse::<TripStatus>() {
        Ok(TripStatus::Cancelled) => {
            errors.push("status", "Para cancelar un viaje use la operación de cancelación");
            None
        }
        Ok(status) => Some(status),
        Err(_) => {
            errors.push("status", "El estado debe ser: En tránsito, Finalizado o Cancelado");
            None
        }
    }
}
