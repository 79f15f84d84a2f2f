use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::*;

use engine::NewUser;

use super::{
    error::ApiError,
    jwt_auth::create_token,
    validation::validate_signup,
    AppState,
};

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct Credentials {
    email: String,
    password: String,
}

pub(crate) async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Invoice backend API is running",
        "timestamp": chrono::Utc::now(),
        "channels": state.broadcaster.channels(),
    }))
}

pub(crate) async fn signup_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    info!("signup");

    validate_signup(&payload.email, &payload.password).map_err(|errors| {
        ApiError::unprocessable("User signup failed due to validation errors.", errors)
    })?;

    let user = state
        .users
        .add_if_absent(NewUser {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = create_token(&user.email, &state.env.jwt_secret)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created.", "user": user, "token": token })),
    ))
}

pub(crate) async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    info!("login");

    let user = state.users.verify(&payload.email, &payload.password).await?;

    let token = create_token(&user.email, &state.env.jwt_secret)?;

    Ok(Json(json!({ "token": token })))
}
