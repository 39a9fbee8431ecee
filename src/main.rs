use tokio::net::TcpListener;
use tracing::{error, info};
use viajes::auth::ensure_admin;
use viajes::config::AppConfig;
use viajes::db::{init_pool, run_migrations};
use viajes::error::AppError;
use viajes::routes::create_router;
use viajes::services::seed::seed_demo_trips;
use viajes::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = run_migrations(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    let state = AppState::new(config.clone(), db);
    ensure_admin(&state).await?;

    if config.seed_demo_data {
        let inserted = seed_demo_trips(state.trips.store()).await?;
        info!("demo seed inserted {inserted} trips");
    }

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,viajes=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
