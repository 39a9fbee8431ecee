use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{FuelType, Trip, TripDraft, TripStatus, TripUpdate},
};

const TRIP_COLUMNS: &str = "id, truck, driver, origin, destination, fuel_type, liters, \
                            departure_time, status, version, created_at, updated_at";

/// Store-level conjunction of optional constraints. The default value
/// matches every trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripPredicate {
    /// Already case-folded substring of the driver name.
    pub driver_contains: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub status: Option<TripStatus>,
}

impl TripPredicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Trip),
    Missing,
    Stale { actual: i64 },
    /// The trip was cancelled before the write landed.
    Terminal,
}

/// Thin adapter over the trip collection. Performs no validation.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// `limit = None` returns every match after `skip`.
    async fn find_many(
        &self,
        predicate: &TripPredicate,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Trip>, AppError>;

    async fn count(&self, predicate: &TripPredicate) -> Result<u64, AppError>;

    async fn find_one(&self, id: &str) -> Result<Option<Trip>, AppError>;

    async fn insert(&self, draft: TripDraft) -> Result<Trip, AppError>;

    /// Applies `changes` and bumps the version. When `expected_version` is
    /// set the write only lands if it still matches. Writes other than a
    /// cancel never land on a cancelled trip.
    async fn update_by_id(
        &self,
        id: &str,
        changes: TripUpdate,
        expected_version: Option<i64>,
    ) -> Result<UpdateOutcome, AppError>;
}

#[derive(Clone)]
pub struct SqliteTripStore {
    pool: DbPool,
}

impl SqliteTripStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TripRow {
    id: String,
    truck: String,
    driver: String,
    origin: String,
    destination: String,
    fuel_type: String,
    liters: i64,
    departure_time: DateTime<Utc>,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            AppError::Other(anyhow::anyhow!("trip {} has invalid {what} in store", row.id))
        };
        let fuel_type = row.fuel_type.parse().map_err(|_| corrupt("fuel_type"))?;
        let status = row.status.parse().map_err(|_| corrupt("status"))?;
        let liters = u32::try_from(row.liters).map_err(|_| corrupt("liters"))?;
        Ok(Trip {
            fuel_type,
            status,
            liters,
            id: row.id,
            truck: row.truck,
            driver: row.driver,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn fold_driver(driver: &str) -> String {
    driver.to_lowercase()
}

fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, predicate: &TripPredicate) {
    builder.push(" WHERE 1 = 1");
    if let Some(needle) = &predicate.driver_contains {
        builder
            .push(" AND instr(driver_folded, ")
            .push_bind(needle.clone())
            .push(") > 0");
    }
    if let Some(fuel_type) = predicate.fuel_type {
        builder.push(" AND fuel_type = ").push_bind(fuel_type.as_str());
    }
    if let Some(status) = predicate.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    async fn find_many(
        &self,
        predicate: &TripPredicate,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Trip>, AppError> {
        debug!(?predicate, skip, ?limit, "trips.find_many");
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {TRIP_COLUMNS} FROM trips"));
        push_predicate(&mut builder, predicate);
        builder.push(" ORDER BY rowid DESC");
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)).unwrap_or(-1);
        builder.push(" LIMIT ").push_bind(limit);
        builder
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<TripRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Trip::try_from).collect()
    }

    async fn count(&self, predicate: &TripPredicate) -> Result<u64, AppError> {
        debug!(?predicate, "trips.count");
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM trips");
        push_predicate(&mut builder, predicate);
        let total = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find_one(&self, id: &str) -> Result<Option<Trip>, AppError> {
        debug!(id, "trips.find_one");
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Trip::try_from).transpose()
    }

    async fn insert(&self, draft: TripDraft) -> Result<Trip, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        debug!(%id, "trips.insert");
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "INSERT INTO trips (id, truck, driver, driver_folded, origin, destination, fuel_type, \
             liters, departure_time, status, version, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11) \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(&id)
        .bind(&draft.truck)
        .bind(&draft.driver)
        .bind(fold_driver(&draft.driver))
        .bind(&draft.origin)
        .bind(&draft.destination)
        .bind(draft.fuel_type.as_str())
        .bind(i64::from(draft.liters))
        .bind(draft.departure_time)
        .bind(draft.status.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Trip::try_from(row)
    }

    async fn update_by_id(
        &self,
        id: &str,
        changes: TripUpdate,
        expected_version: Option<i64>,
    ) -> Result<UpdateOutcome, AppError> {
        debug!(id, ?expected_version, "trips.update_by_id");
        let cancelling = changes.status == Some(TripStatus::Cancelled);
        let mut builder =
            QueryBuilder::<Sqlite>::new("UPDATE trips SET version = version + 1, updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(truck) = changes.truck {
            builder.push(", truck = ").push_bind(truck);
        }
        if let Some(driver) = changes.driver {
            builder
                .push(", driver_folded = ")
                .push_bind(fold_driver(&driver))
                .push(", driver = ")
                .push_bind(driver);
        }
        if let Some(origin) = changes.origin {
            builder.push(", origin = ").push_bind(origin);
        }
        if let Some(destination) = changes.destination {
            builder.push(", destination = ").push_bind(destination);
        }
        if let Some(fuel_type) = changes.fuel_type {
            builder.push(", fuel_type = ").push_bind(fuel_type.as_str());
        }
        if let Some(liters) = changes.liters {
            builder.push(", liters = ").push_bind(i64::from(liters));
        }
        if let Some(departure_time) = changes.departure_time {
            builder.push(", departure_time = ").push_bind(departure_time);
        }
        if let Some(status) = changes.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        builder.push(" WHERE id = ").push_bind(id.to_string());
        if !cancelling {
            builder
                .push(" AND status <> ")
                .push_bind(TripStatus::Cancelled.as_str());
        }
        if let Some(version) = expected_version {
            builder.push(" AND version = ").push_bind(version);
        }
        builder.push(format!(" RETURNING {TRIP_COLUMNS}"));

        let row = builder
            .build_query_as::<TripRow>()
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(UpdateOutcome::Updated(Trip::try_from(row)?)),
            None => match self.find_one(id).await? {
                Some(existing) if !cancelling && existing.status.is_terminal() => {
                    Ok(UpdateOutcome::Terminal)
                }
                Some(existing) => Ok(UpdateOutcome::Stale {
                    actual: existing.version,
                }),
                None => Ok(UpdateOutcome::Missing),
            },
        }
    }
}
