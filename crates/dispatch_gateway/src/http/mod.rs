//! Request/response surface. Each route maps onto one coordinator call.

mod drivers;
mod error;
mod rides;
mod users;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use dispatch_core::ride::{Actor, RideId, Role};
use dispatch_core::{DispatchResult, LifecycleCoordinator};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;
use crate::ws;

pub use error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/rides", post(rides::create_ride))
        .route("/rides/active", get(rides::active_ride))
        .route("/rides/history", get(rides::history))
        .route("/rides/:ride_id", get(rides::get_ride))
        .route("/rides/:ride_id/accept", post(rides::accept_ride))
        .route("/rides/:ride_id/reject", post(rides::reject_ride))
        .route("/rides/:ride_id/cancel", post(rides::cancel_ride))
        .route("/rides/:ride_id/complete", post(rides::complete_ride))
        .route("/rides/:ride_id/pickup-code", post(rides::verify_pickup_code))
        .route("/drivers/pending", get(drivers::pending_rides))
        .route("/drivers/accepted", get(drivers::accepted_rides))
        .route("/drivers/earnings", get(drivers::earnings))
        .route("/drivers/online", get(drivers::online_drivers))
        .route("/drivers/presence", post(drivers::set_presence))
        .route("/drivers/location", post(drivers::update_location))
        .route("/ratings", post(users::submit_rating))
        .route("/users/:user_id/ratings", get(users::ratings_received))
        .route("/users/:user_id/ratings/given", get(users::ratings_given))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Success<T> {
    success: bool,
    data: T,
}

fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

/// Read the identity headers.
fn identity(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let user_id = header(headers, USER_ID_HEADER)?;
    let role: Role = header(headers, USER_ROLE_HEADER)?
        .parse()
        .map_err(ApiError::Unauthenticated)?;
    Ok(Actor::new(user_id, role))
}

/// Resolve the caller's account, then run `op` as them on the blocking pool.
async fn run_as<T, F>(state: &AppState, actor: Actor, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&LifecycleCoordinator, &Actor) -> DispatchResult<T> + Send + 'static,
    T: Send + 'static,
{
    run_blocking(state, move |coordinator| {
        coordinator.register(&actor)?;
        op(coordinator, &actor)
    })
    .await
}

/// Coordinator calls hold plain locks and may wait on the account store, so
/// they stay off the async workers.
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&LifecycleCoordinator) -> DispatchResult<T> + Send + 'static,
    T: Send + 'static,
{
    let coordinator = Arc::clone(&state.coordinator);
    let result = tokio::task::spawn_blocking(move || op(&coordinator))
        .await
        .map_err(|err| ApiError::Worker(err.to_string()))?;
    Ok(result?)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(name.to_string()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn parse_ride_id(raw: &str) -> Result<RideId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("'{raw}' is not a ride id")))
}

async fn stats(State(state): State<AppState>) -> Json<Success<Value>> {
    success(json!({
        "dispatch": state.coordinator.stats(),
        "online_drivers": state.coordinator.presence().online_count(),
        "active_rides": state.coordinator.rides().len(),
        "connections": state.connections.len(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
