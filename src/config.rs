use std::{env, net::SocketAddr};

use crate::error::AppError;

pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    /// Upper bound applied to the `limit` of paged trip listings.
    pub max_page_size: u32,
    pub session_ttl_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://viajes.db?mode=rwc".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:4000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let max_page_size = match env::var("MAX_PAGE_SIZE") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => {
                    return Err(AppError::Config(format!(
                        "invalid MAX_PAGE_SIZE: {raw:?} (expected a positive integer)"
                    )))
                }
            },
            Err(_) => DEFAULT_MAX_PAGE_SIZE,
        };

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| AppError::Config(format!("invalid SESSION_TTL_HOURS: {raw:?}")))?,
            Err(_) => 24,
        };

        let admin_email = env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        let seed_demo_data = env::var("SEED_DEMO_DATA")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            listen_addr,
            max_page_size,
            session_ttl_hours,
            admin_email,
            admin_password,
            seed_demo_data,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://viajes.db?mode=rwc".to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            session_ttl_hours: 24,
            admin_email: None,
            admin_password: None,
            seed_demo_data: false,
        }
    }
}
