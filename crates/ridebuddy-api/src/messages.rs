use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use ridebuddy_gateway::chat::message_response;
use ridebuddy_types::api::{Claims, MessageResponse, SendMessageRequest};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: pass the `timestamp` of the oldest message already loaded to
    /// fetch the page before it.
    pub before: Option<DateTime<Utc>>,
}

fn default_limit() -> u32 {
    50
}

/// GET /messages/{match_id}, oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.chat.participant_match(match_id, claims.sub).await?;

    let limit = query.limit.clamp(1, 200);
    let before = query.before;
    let rows = state
        .db(move |db| db.get_messages(match_id, limit, before))
        .await?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}

/// POST /messages/{match_id}: same path as the gateway command `send_message`.
pub async fn send_message(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .chat
        .send_message(claims.sub, match_id, req.receiver_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
