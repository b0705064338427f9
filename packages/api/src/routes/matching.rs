use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info};

use crate::{error::ApiError, state::AppState};
use matching_core::models::matching::requests::MatchRequest;
use matching_core::models::matching::responses::{CancelOutcome, MatchOutcome, UserStatus};
use matching_core::models::matching::MatchRecord;
use matching_core::models::queue::{QueueInfo, QueueUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/match/request", post(request_match))
        .route("/match/status/{id}", get(match_status))
        .route("/match/status/by-user/{user_id}", get(user_status))
        .route("/match/queue", get(queue_users))
        .route("/match/queues", get(queues))
        .route("/match/cancel/{id}", delete(cancel_match))
        .route("/match/cancel/by-user/{user_id}", delete(cancel_by_user))
}

async fn request_match(
    State(state): State<AppState>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchOutcome>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    let outcome = state
        .matching_service
        .request_match(&payload)
        .await
        .map_err(|e| {
            error!("Failed to request match for {}: {}", payload.user_id, e);
            e
        })?;

    info!("Match request for {} resolved as {:?}", payload.user_id, outcome);
    Ok(Json(outcome))
}

async fn match_status(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchRecord>, ApiError> {
    let record = state.matching_service.check_match_status(&match_id).await?;
    Ok(Json(record))
}

async fn user_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatus>, ApiError> {
    let status = state
        .matching_service
        .check_user_status(&user_id)
        .await
        .map_err(|e| {
            error!("Failed to get status for user {}: {}", user_id, e);
            e
        })?;
    Ok(Json(status))
}

async fn queue_users(State(state): State<AppState>) -> Result<Json<Vec<QueueUser>>, ApiError> {
    Ok(Json(state.matching_service.list_queue_users().await?))
}

async fn queues(State(state): State<AppState>) -> Result<Json<Vec<QueueInfo>>, ApiError> {
    Ok(Json(state.matching_service.list_queues().await?))
}

async fn cancel_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<CancelOutcome>, ApiError> {
    let outcome = state
        .matching_service
        .cancel_match(&match_id)
        .await
        .map_err(|e| {
            error!("Failed to cancel match {}: {}", match_id, e);
            e
        })?;
    Ok(Json(outcome))
}

async fn cancel_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CancelOutcome>, ApiError> {
    let outcome = state
        .matching_service
        .cancel_by_user(&user_id)
        .await
        .map_err(|e| {
            error!("Failed to cancel for user {}: {}", user_id, e);
            e
        })?;
    Ok(Json(outcome))
}
