use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::*;

use engine::{EventData, RecordId};

use super::{error::ApiError, jwt_auth::TokenClaims, validation::validate_event, AppState};

pub(crate) async fn list_events_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.events.get_all().await?;

    Ok(Json(json!({ "events": events })))
}

pub(crate) async fn get_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.get(&RecordId::from(id)).await?;

    Ok(Json(json!({ "event": event })))
}

pub(crate) async fn create_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    Json(data): Json<EventData>,
) -> Result<impl IntoResponse, ApiError> {
    validate_event(&data).map_err(|errors| {
        ApiError::unprocessable("Adding the event failed due to validation errors.", errors)
    })?;

    let event = state.events.add(data).await?;

    info!(id = %event.id, by = %claims.sub, "events:created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event saved.", "event": event })),
    ))
}

pub(crate) async fn update_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<String>,
    Json(data): Json<EventData>,
) -> Result<impl IntoResponse, ApiError> {
    validate_event(&data).map_err(|errors| {
        ApiError::unprocessable("Updating the event failed due to validation errors.", errors)
    })?;

    let event = state.events.replace(&RecordId::from(id), data).await?;

    info!(id = %event.id, by = %claims.sub, "events:updated");

    Ok(Json(json!({ "message": "Event updated.", "event": event })))
}

pub(crate) async fn delete_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = RecordId::from(id);

    state.events.remove(&id).await?;

    info!(%id, by = %claims.sub, "events:deleted");

    Ok(Json(json!({ "message": "Event deleted." })))
}
