//! Shared fixtures for gateway integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use dispatch_core::config::DispatchConfig;
use dispatch_core::ride::{RideId, UserId};
use dispatch_core::test_helpers::{pickup_point, seeded_accounts};
use dispatch_core::LifecycleCoordinator;
use dispatch_gateway::http::{USER_ID_HEADER, USER_ROLE_HEADER};
use dispatch_gateway::{create_router, AppState};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const SEED: u64 = 7;

pub fn create_test_state() -> AppState {
    AppState::new(
        LifecycleCoordinator::builder()
            .config(DispatchConfig::default().with_pickup_code_seed(SEED))
            .accounts(Arc::new(seeded_accounts(3, 3))),
    )
    .expect("Failed to build app state")
}

/// Create a test server over a fresh coordinator
pub fn create_test_server() -> (TestServer, AppState) {
    let state = create_test_state();
    let server = TestServer::new(create_router(state.clone())).expect("Failed to create test server");
    (server, state)
}

/// Serve the router on an ephemeral local port for WebSocket clients
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.expect("serve");
    });
    addr
}

/// Attach identity headers
pub fn as_user(request: TestRequest, user_id: &str, role: &str) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_str(user_id).expect("user id header"),
        )
        .add_header(
            HeaderName::from_static(USER_ROLE_HEADER),
            HeaderValue::from_str(role).expect("role header"),
        )
}

pub fn ride_request_body() -> Value {
    json!({
        "pickup": {"lat": 12.90, "lng": 77.59, "address": "MG Road"},
        "dropoff": {"lat": 12.93, "lng": 77.62, "address": "Indiranagar"},
        "fare": 150.0
    })
}

/// Put a driver online at the pickup point, optionally offset north
pub async fn go_online(server: &TestServer, driver: &str, north_km: f64) {
    let location = pickup_point().offset_km(north_km, 0.0);
    let response = as_user(server.post("/drivers/presence"), driver, "driver")
        .json(&json!({
            "online": true,
            "location": {"lat": location.lat, "lng": location.lng}
        }))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Create a ride as `rider` and return its id
pub async fn request_ride(server: &TestServer, rider: &str) -> RideId {
    let response = as_user(server.post("/rides"), rider, "rider")
        .json(&ride_request_body())
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    body["data"]["id"]
        .as_str()
        .expect("ride id")
        .parse()
        .expect("uuid")
}

pub fn pickup_code(state: &AppState, ride_id: RideId) -> String {
    state
        .coordinator
        .rides()
        .get(ride_id)
        .and_then(|ride| ride.pickup_code)
        .expect("pickup code")
}

pub fn user(id: &str) -> UserId {
    UserId::from(id)
}
