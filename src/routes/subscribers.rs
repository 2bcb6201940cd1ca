use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::{
        common::{MessageResponse, SuccessResponse},
        subscriber::{Subscriber, SubscriberPayload},
        transaction::Transaction,
    },
};

type SubscriberResponse = Json<SuccessResponse<Subscriber>>;

/// POST /api/v1/subscribers
#[instrument(skip(state, payload))]
pub async fn create_subscriber(
    State(state): State<AppState>,
    Json(payload): Json<SubscriberPayload>,
) -> Result<(StatusCode, SubscriberResponse)> {
    let record = payload
        .into_record()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let subscriber = state.subscriber_service.create(record).await?;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(subscriber))))
}

/// GET /api/v1/subscribers/{user_id}
#[instrument(skip(state))]
pub async fn get_subscriber(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<SubscriberResponse> {
    let subscriber = state.subscriber_service.get_by_user_id(&user_id).await?;

    Ok(Json(SuccessResponse::new(subscriber)))
}

/// PUT /api/v1/subscribers/{id}
#[instrument(skip(state, payload))]
pub async fn update_subscriber(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubscriberPayload>,
) -> Result<SubscriberResponse> {
    let record = payload
        .into_record()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let subscriber = state.subscriber_service.update(id, record).await?;

    Ok(Json(SuccessResponse::new(subscriber)))
}

/// PUT /api/v1/subscribers/{id}/transaction
#[instrument(skip(state, transaction))]
pub async fn replace_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(transaction): Json<Transaction>,
) -> Result<SubscriberResponse> {
    let subscriber = state
        .subscriber_service
        .replace_transaction(id, transaction)
        .await?;

    Ok(Json(SuccessResponse::new(subscriber)))
}

/// DELETE /api/v1/subscribers/{id}
#[instrument(skip(state))]
pub async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<MessageResponse>>> {
    state.subscriber_service.delete(id).await?;

    Ok(Json(SuccessResponse::new(MessageResponse::new(
        "Subscriber deleted",
    ))))
}
