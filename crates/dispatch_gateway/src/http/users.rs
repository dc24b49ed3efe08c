//! Ratings

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use dispatch_core::lifecycle::RatingRequest;
use dispatch_core::ride::UserId;

use super::{body, identity, run_as, run_blocking, success, ApiError};
use crate::state::AppState;

/// POST /ratings
pub async fn submit_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity(&headers)?;
    let request = body(payload)?;
    let rating = run_as(&state, actor, move |coordinator, actor| {
        coordinator.submit_rating(actor, request)
    })
    .await?;
    Ok((StatusCode::CREATED, success(rating)))
}

/// GET /users/:user_id/ratings
pub async fn ratings_received(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::new(user_id);
    let summary = run_blocking(&state, move |coordinator| coordinator.ratings_for(&user_id)).await?;
    Ok(success(summary))
}

/// GET /users/:user_id/ratings/given
pub async fn ratings_given(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::new(user_id);
    let given = run_blocking(&state, move |coordinator| coordinator.ratings_by(&user_id)).await?;
    Ok(success(given))
}
