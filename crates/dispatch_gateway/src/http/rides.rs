//! Ride lifecycle routes

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use dispatch_core::lifecycle::RideRequest;
use serde::Deserialize;
use serde_json::json;

use super::{body, identity, parse_ride_id, run_as, success, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PickupCodeRequest {
    pub code: String,
}

/// POST /rides
pub async fn create_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RideRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let request = body(payload)?;
    let ride = run_as(&state, actor, move |coordinator, actor| {
        coordinator.create_ride(actor, request)
    })
    .await?;
    Ok((StatusCode::CREATED, success(ride)))
}

/// GET /rides/active
pub async fn active_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let active = run_as(&state, actor, |coordinator, actor| {
        coordinator.active_ride_for(actor)
    })
    .await?;
    Ok(success(active))
}

/// GET /rides/history
pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let rides = run_as(&state, actor, |coordinator, actor| coordinator.history(actor)).await?;
    Ok(success(rides))
}

/// GET /rides/:ride_id
pub async fn get_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let ride_id = parse_ride_id(&ride_id)?;
    let ride = run_as(&state, actor, move |coordinator, actor| {
        coordinator.ride(actor, ride_id)
    })
    .await?;
    Ok(success(ride))
}

/// POST /rides/:ride_id/accept
pub async fn accept_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let ride_id = parse_ride_id(&ride_id)?;
    let ride = run_as(&state, actor, move |coordinator, actor| {
        coordinator.accept_ride(actor, ride_id)
    })
    .await?;
    Ok(success(ride))
}

/// POST /rides/:ride_id/reject
pub async fn reject_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let ride_id = parse_ride_id(&ride_id)?;
    run_as(&state, actor, move |coordinator, actor| {
        coordinator.reject_ride(actor, ride_id)
    })
    .await?;
    Ok(success(json!({ "ride_id": ride_id })))
}

/// POST /rides/:ride_id/cancel
pub async fn cancel_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let ride_id = parse_ride_id(&ride_id)?;
    let ride = run_as(&state, actor, move |coordinator, actor| {
        coordinator.cancel_ride(actor, ride_id)
    })
    .await?;
    Ok(success(ride))
}

/// POST /rides/:ride_id/complete
pub async fn complete_ride(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let ride_id = parse_ride_id(&ride_id)?;
    let ride = run_as(&state, actor, move |coordinator, actor| {
        coordinator.complete_ride(actor, ride_id)
    })
    .await?;
    Ok(success(ride))
}

/// POST /rides/:ride_id/pickup-code
pub async fn verify_pickup_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(ride_id): Path<String>,
    payload: Result<Json<PickupCodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let ride_id = parse_ride_id(&ride_id)?;
    let request = body(payload)?;
    let verification = run_as(&state, actor, move |coordinator, actor| {
        coordinator.verify_pickup_code(actor, ride_id, &request.code)
    })
    .await?;
    Ok(success(verification))
}
