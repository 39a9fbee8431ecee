use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{store::SqliteTripStore, trips::TripService},
};

/// Built once at start-up and handed to the router; handlers reach every
/// collaborator through it.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub trips: TripService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let store = Arc::new(SqliteTripStore::new(db.clone()));
        let trips = TripService::new(store, config.max_page_size);
        Self { config, db, trips }
    }
}
