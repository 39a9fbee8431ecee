use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    models::user::UserRole,
    services::validation::ValidationErrors,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Deserialize)]
struct RegisterForm {
    email: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let role = match form.role.as_deref().map(str::parse::<UserRole>) {
        None => UserRole::User,
        Some(Ok(role)) => role,
        Some(Err(_)) => {
            return Err(AppError::InvalidInput(ValidationErrors::single(
                "role",
                "El rol debe ser usuario o administrador",
            )))
        }
    };
    if role == UserRole::Admin {
        current.require_admin()?;
    }

    let user = auth::register_user(&state, &form.email, &form.password, role).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Usuario registrado", "user": user })),
    ))
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<Json<Value>, AppError> {
    let user = auth::authenticate_user(&state, &form.email, &form.password).await?;
    let token = auth::create_session(&state, &user.id).await?;
    Ok(Json(json!({
        "message": "Inicio de sesión exitoso",
        "user": user,
        "token": token,
    })))
}
