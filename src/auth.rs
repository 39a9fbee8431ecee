use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejectionReason,
    TypedHeader,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        session::Session,
        user::{User, UserRole},
    },
    services::validation::ValidationErrors,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// The `{id, role}` principal attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

impl TryFrom<User> for AuthenticatedUser {
    type Error = AppError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        let role = user.role.parse().map_err(|_| {
            AppError::Other(anyhow::anyhow!("user {} has invalid role in store", user.id))
        })?;
        Ok(Self {
            id: user.id,
            email: user.email,
            role,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let user = authenticate_token(state, bearer.token()).await?;
                Ok(Self(Some(user)))
            }
            Err(rejection) if matches!(rejection.reason(), TypedHeaderRejectionReason::Missing) => {
                Ok(Self(None))
            }
            Err(_) => Err(AppError::Unauthorized),
        }
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn require_admin(&self) -> Result<&AuthenticatedUser, AppError> {
        let user = self.require_user()?;
        if user.role == UserRole::Admin {
            Ok(user)
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn find_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, role, created_at FROM users WHERE email = ?1",
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await?;
    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    email: &str,
    password: &str,
    role: UserRole,
) -> Result<AuthenticatedUser, AppError> {
    let email = normalize_email(email);
    let mut errors = ValidationErrors::default();
    if email.is_empty() || !email.contains('@') {
        errors.push("email", "Ingrese un correo electrónico válido");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", "La contraseña debe tener al menos 6 caracteres");
    }
    if errors.is_empty() && find_user_by_email(state, &email).await?.is_some() {
        errors.push("email", "El correo electrónico ya está registrado");
    }
    if !errors.is_empty() {
        return Err(AppError::InvalidInput(errors));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))?
        .to_string();

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5) \
         RETURNING id, email, password_hash, role, created_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(Utc::now())
    .fetch_one(&state.db)
    .await?;

    info!(user_id = %user.id, %role, "user registered");
    AuthenticatedUser::try_from(user)
}

pub async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let Some(user) = find_user_by_email(state, &normalize_email(email)).await? else {
        return Err(AppError::Unauthorized);
    };
    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|err| AppError::Other(anyhow::anyhow!("stored password hash invalid: {err}")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_err()
    {
        warn!(user_id = %user.id, "failed login");
        return Err(AppError::Unauthorized);
    }
    AuthenticatedUser::try_from(user)
}

/// Issues a fresh bearer token for `user_id`.
pub async fn create_session(state: &AppState, user_id: &str) -> Result<String, AppError> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(now)
    .bind(now + Duration::hours(state.config.session_ttl_hours))
    .execute(&state.db)
    .await?;
    Ok(token)
}

pub async fn authenticate_token(
    state: &AppState,
    token: &str,
) -> Result<AuthenticatedUser, AppError> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_id, token_hash, created_at, expires_at FROM sessions WHERE token_hash = ?1",
    )
    .bind(hash_token(token))
    .fetch_optional(&state.db)
    .await?;
    let Some(session) = session.filter(|s| s.expires_at > Utc::now()) else {
        return Err(AppError::Unauthorized);
    };

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, role, created_at FROM users WHERE id = ?1",
    )
    .bind(&session.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized)?;
    AuthenticatedUser::try_from(user)
}

/// Creates the configured bootstrap admin if it does not exist yet.
pub async fn ensure_admin(state: &AppState) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password)
    else {
        return Ok(());
    };
    if find_user_by_email(state, &normalize_email(email)).await?.is_some() {
        return Ok(());
    }
    register_user(state, email, password, UserRole::Admin).await?;
    Ok(())
}
