use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Bearer session. Only the SHA-256 of the token is persisted.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
