use chrono::{Duration, Utc};
use tracing::info;

use crate::{
    error::AppError,
    models::trip::{FuelType, TripDraft, TripStatus},
    services::store::{TripPredicate, TripStore},
};

/// Inserts the three reference trips when the collection is empty.
/// Returns how many were written.
pub async fn seed_demo_trips(store: &dyn TripStore) -> Result<usize, AppError> {
    if store.count(&TripPredicate::all()).await? > 0 {
        return Ok(0);
    }

    let now = Utc::now();
    let demo = vec![
        TripDraft {
            truck: "ABC123".into(),
            driver: "Juan Pérez".into(),
            origin: "Planta X".into(),
            destination: "Estación Y".into(),
            fuel_type: FuelType::Diesel,
            liters: 15_000,
            departure_time: now + Duration::hours(1),
            status: TripStatus::InTransit,
        },
        TripDraft {
            truck: "DEF456".into(),
            driver: "María López".into(),
            origin: "Puerto A".into(),
            destination: "Planta Z".into(),
            fuel_type: FuelType::Gasoline,
            liters: 20_000,
            departure_time: now + Duration::hours(2),
            status: TripStatus::Completed,
        },
        TripDraft {
            truck: "GHI789".into(),
            driver: "Carlos Ruiz".into(),
            origin: "Depósito B".into(),
            destination: "Refinería C".into(),
            fuel_type: FuelType::Cng,
            liters: 12_000,
            departure_time: now + Duration::hours(3),
            status: TripStatus::Cancelled,
        },
    ];

    let count = demo.len();
    for draft in demo {
        store.insert(draft).await?;
    }

    info!(count, "seeded demo trips");
    Ok(count)
}
