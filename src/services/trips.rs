use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::{
        stats::TripStatistics,
        trip::{Trip, TripPage, TripStatus, TripUpdate},
    },
    services::{
        query::{build_predicate, page_count, PageRequest, TripFilter},
        store::{TripStore, UpdateOutcome},
        validation::{validate_new, validate_update, TripPayload},
    },
};

/// Owns trip state transitions and the read views over the collection.
/// Holds no per-request state; clones share the same store handle.
#[derive(Clone)]
pub struct TripService {
    store: Arc<dyn TripStore>,
    max_page_size: u32,
}

impl TripService {
    pub fn new(store: Arc<dyn TripStore>, max_page_size: u32) -> Self {
        Self {
            store,
            max_page_size,
        }
    }

    pub fn store(&self) -> &dyn TripStore {
        self.store.as_ref()
    }

    pub async fn list_paged(
        &self,
        request: PageRequest,
        filter: &TripFilter,
    ) -> Result<TripPage, AppError> {
        let request = request.capped(self.max_page_size);
        let predicate = build_predicate(filter);
        let (total, records) = tokio::try_join!(
            self.store.count(&predicate),
            self.store
                .find_many(&predicate, request.skip(), Some(u64::from(request.limit))),
        )?;
        Ok(TripPage {
            records,
            total,
            pages: page_count(total, request.limit),
            page: request.page,
            limit: request.limit,
        })
    }

    pub async fn list_all(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError> {
        self.store.find_many(&build_predicate(filter), 0, None).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Trip, AppError> {
        self.store.find_one(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn create(&self, payload: &TripPayload) -> Result<Trip, AppError> {
        let mut draft = validate_new(payload, Utc::now()).map_err(|errors| {
            warn!(%errors, "rejected trip creation");
            AppError::InvalidInput(errors)
        })?;
        draft.status = TripStatus::InTransit;
        let trip = self.store.insert(draft).await?;
        info!(id = %trip.id, truck = %trip.truck, "trip created");
        Ok(trip)
    }

    pub async fn update(&self, id: &str, payload: &TripPayload) -> Result<Trip, AppError> {
        let current = self.get_by_id(id).await?;
        if current.status.is_terminal() {
            warn!(id, "refused edit of cancelled trip");
            return Err(AppError::TerminalState);
        }
        let draft = validate_update(&current, payload, Utc::now()).map_err(|errors| {
            warn!(id, %errors, "rejected trip update");
            AppError::InvalidInput(errors)
        })?;

        let outcome = self
            .store
            .update_by_id(id, TripUpdate::from(draft), payload.expected_version)
            .await?;
        let trip = settle(outcome, payload.expected_version)?;
        info!(id, version = trip.version, status = %trip.status, "trip updated");
        Ok(trip)
    }

    /// Marks the trip cancelled. Cancelling twice succeeds both times.
    pub async fn cancel(&self, id: &str) -> Result<Trip, AppError> {
        let outcome = self.store.update_by_id(id, TripUpdate::cancel(), None).await?;
        let trip = settle(outcome, None)?;
        info!(id, "trip cancelled");
        Ok(trip)
    }

    pub async fn statistics(&self) -> Result<TripStatistics, AppError> {
        let trips = self.list_all(&TripFilter::default()).await?;
        Ok(TripStatistics::tally(&trips))
    }
}

fn settle(outcome: UpdateOutcome, expected_version: Option<i64>) -> Result<Trip, AppError> {
    match outcome {
        UpdateOutcome::Updated(trip) => Ok(trip),
        UpdateOutcome::Missing => Err(AppError::NotFound),
        UpdateOutcome::Terminal => Err(AppError::TerminalState),
        UpdateOutcome::Stale { actual } => Err(AppError::VersionConflict {
            expected: expected_version.unwrap_or(actual),
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        db::{init_pool, run_migrations},
        models::trip::{FuelType, TripDraft},
        services::store::{SqliteTripStore, TripPredicate},
    };

    /// Cancels the trip right after handing out the read, so the
    /// following write races a completed cancel.
    struct CancelAfterRead {
        inner: SqliteTripStore,
    }

    #[async_trait]
    impl TripStore for CancelAfterRead {
        async fn find_many(
            &self,
            predicate: &TripPredicate,
            skip: u64,
            limit: Option<u64>,
        ) -> Result<Vec<Trip>, AppError> {
            self.inner.find_many(predicate, skip, limit).await
        }

        async fn count(&self, predicate: &TripPredicate) -> Result<u64, AppError> {
            self.inner.count(predicate).await
        }

        async fn find_one(&self, id: &str) -> Result<Option<Trip>, AppError> {
            let found = self.inner.find_one(id).await?;
            self.inner
                .update_by_id(id, TripUpdate::cancel(), None)
                .await?;
            Ok(found)
        }

        async fn insert(&self, draft: TripDraft) -> Result<Trip, AppError> {
            self.inner.insert(draft).await
        }

        async fn update_by_id(
            &self,
            id: &str,
            changes: TripUpdate,
            expected_version: Option<i64>,
        ) -> Result<UpdateOutcome, AppError> {
            self.inner.update_by_id(id, changes, expected_version).await
        }
    }

    async fn sqlite_store(root: &TempDir) -> SqliteTripStore {
        let db_path = root.path().join("trips.sqlite");
        File::create(&db_path).expect("db file");
        let pool = init_pool(&format!("sqlite://{}", db_path.to_string_lossy()))
            .await
            .expect("pool");
        run_migrations(&pool).await.expect("migrations");
        SqliteTripStore::new(pool)
    }

    fn draft() -> TripDraft {
        TripDraft {
            truck: "ABC123".into(),
            driver: "Ana Gómez".into(),
            origin: "Planta X".into(),
            destination: "Estación Y".into(),
            fuel_type: FuelType::Diesel,
            liters: 10_000,
            departure_time: Utc::now() + Duration::hours(2),
            status: TripStatus::InTransit,
        }
    }

    #[tokio::test]
    async fn update_racing_a_cancel_does_not_revive_the_trip() {
        let root = TempDir::new().expect("temp dir");
        let inner = sqlite_store(&root).await;
        let trip = inner.insert(draft()).await.expect("insert");

        let service = TripService::new(Arc::new(CancelAfterRead { inner: inner.clone() }), 100);
        let patch = TripPayload {
            liters: Some(json!(200)),
            ..TripPayload::default()
        };
        let result = service.update(&trip.id, &patch).await;
        assert!(matches!(result, Err(AppError::TerminalState)), "{result:?}");

        let stored = inner.find_one(&trip.id).await.expect("read").expect("trip");
        assert_eq!(stored.status, TripStatus::Cancelled);
        assert_eq!(stored.liters, 10_000);
    }

    #[tokio::test]
    async fn store_refuses_non_cancel_writes_on_cancelled_trip() {
        let root = TempDir::new().expect("temp dir");
        let store = sqlite_store(&root).await;
        let trip = store.insert(draft()).await.expect("insert");
        store
            .update_by_id(&trip.id, TripUpdate::cancel(), None)
            .await
            .expect("cancel");

        let revive = TripUpdate {
            status: Some(TripStatus::InTransit),
            ..TripUpdate::default()
        };
        let outcome = store.update_by_id(&trip.id, revive, None).await.expect("update");
        assert_eq!(outcome, UpdateOutcome::Terminal);

        let again = store
            .update_by_id(&trip.id, TripUpdate::cancel(), None)
            .await
            .expect("second cancel");
        assert!(matches!(again, UpdateOutcome::Updated(t) if t.status == TripStatus::Cancelled));
    }
}
