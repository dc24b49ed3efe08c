//! Driver presence and driver-side queries

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use dispatch_core::geo::GeoPoint;
use serde::Deserialize;
use serde_json::json;

use super::{body, identity, run_as, success, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PresenceRequest {
    pub online: bool,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// GET /drivers/pending
pub async fn pending_rides(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let data = run_as(&state, actor, |coordinator, actor| coordinator.pending_rides(actor)).await?;
    Ok(success(data))
}

/// GET /drivers/accepted
pub async fn accepted_rides(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let data = run_as(&state, actor, |coordinator, actor| {
        coordinator.accepted_rides_for(actor)
    })
    .await?;
    Ok(success(data))
}

/// GET /drivers/earnings
pub async fn earnings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let data = run_as(&state, actor, |coordinator, actor| coordinator.earnings(actor)).await?;
    Ok(success(data))
}

/// GET /drivers/online
pub async fn online_drivers(State(state): State<AppState>) -> impl IntoResponse {
    success(state.coordinator.online_drivers())
}

/// POST /drivers/presence
pub async fn set_presence(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PresenceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let request = body(payload)?;
    let data = run_as(&state, actor, move |coordinator, actor| {
        if request.online {
            let presence = coordinator.go_online(actor, request.location)?;
            Ok(json!({ "online": true, "presence": presence }))
        } else {
            let was_online = coordinator.go_offline(actor)?;
            Ok(json!({ "online": false, "was_online": was_online }))
        }
    })
    .await?;
    Ok(success(data))
}

/// POST /drivers/location
pub async fn update_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GeoPoint>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let location = body(payload)?;
    run_as(&state, actor, move |coordinator, actor| {
        coordinator.update_location(actor, location)
    })
    .await?;
    Ok(success(location))
}
