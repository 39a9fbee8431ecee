use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use serde_with::{serde_as, NoneAsEmptyString};
use tracing::debug;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        stats::TripStatistics,
        trip::{Trip, TripPage},
    },
    services::{
        query::{PageRequest, TripFilter},
        validation::{TripPayload, ValidationErrors},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_paged).post(create))
        .route("/all", get(list_all))
        .route("/stats", get(statistics))
        .route("/:id", get(get_by_id).put(update).delete(cancel))
}

/// Query string of the listing endpoints. Keys outside this set are
/// rejected instead of being passed along.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    driver: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    fuel_type: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    status: Option<String>,
}

impl ListQuery {
    fn from_request(query: Result<Query<ListQuery>, QueryRejection>) -> Result<Self, AppError> {
        query.map(|Query(inner)| inner).map_err(|rejection| {
            AppError::InvalidInput(ValidationErrors::single("query", rejection.body_text()))
        })
    }

    fn filter(&self) -> Result<TripFilter, AppError> {
        Ok(TripFilter::parse(
            self.driver.as_deref(),
            self.fuel_type.as_deref(),
            self.status.as_deref(),
        )?)
    }

    fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

async fn list_paged(
    State(state): State<AppState>,
    current: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<TripPage>, AppError> {
    let user = current.require_user()?;
    let query = ListQuery::from_request(query)?;
    debug!(user_id = %user.id, ?query, "list trips");
    let page = state
        .trips
        .list_paged(query.page_request(), &query.filter()?)
        .await?;
    Ok(Json(page))
}

async fn list_all(
    State(state): State<AppState>,
    current: CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Trip>>, AppError> {
    current.require_user()?;
    let query = ListQuery::from_request(query)?;
    let trips = state.trips.list_all(&query.filter()?).await?;
    Ok(Json(trips))
}

async fn statistics(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<TripStatistics>, AppError> {
    current.require_user()?;
    Ok(Json(state.trips.statistics().await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    current.require_user()?;
    Ok(Json(state.trips.get_by_id(&id).await?))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<TripPayload>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let user = current.require_user()?;
    debug!(user_id = %user.id, "create trip");
    let trip = state.trips.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<TripPayload>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    debug!(user_id = %user.id, %id, "update trip");
    Ok(Json(state.trips.update(&id, &payload).await?))
}

async fn cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    debug!(user_id = %user.id, %id, "cancel trip");
    let trip = state.trips.cancel(&id).await?;
    Ok(Json(json!({ "message": "Viaje cancelado", "trip": trip })))
}
