use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ridebuddy_db::models::{EventRow, JoinEventOutcome};
use ridebuddy_types::api::{Claims, CreateEventRequest, EventResponse};

use crate::AppState;
use crate::error::ApiError;

fn event_response(row: EventRow) -> EventResponse {
    EventResponse {
        id: row.id,
        creator_id: row.creator_id,
        title: row.title,
        description: row.description,
        date: row.date,
        latitude: row.latitude,
        longitude: row.longitude,
        participants: row.participants,
    }
}

/// POST /events
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();
    if title.is_empty() || description.is_empty() {
        return Err(ApiError::bad_request("title and description are required"));
    }

    let location = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ApiError::bad_request("coordinates out of range"));
            }
            Some((lat, lon))
        }
        (None, None) => None,
        _ => return Err(ApiError::bad_request("latitude and longitude go together")),
    };

    let creator = claims.sub;
    let date = req.date;
    let row = state
        .db(move |db| db.create_event(creator, &title, &description, date, location))
        .await?;

    Ok((StatusCode::CREATED, Json(event_response(row))))
}

/// GET /events, soonest first
pub async fn list_events(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db(|db| db.list_events()).await?;
    Ok(Json(rows.into_iter().map(event_response).collect::<Vec<_>>()))
}

/// GET /events/{event_id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db(move |db| db.get_event(event_id))
        .await?
        .ok_or_else(|| ApiError::not_found("event"))?;
    Ok(Json(event_response(row)))
}

/// POST /events/{event_id}/join
pub async fn join_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    match state.db(move |db| db.join_event(event_id, user_id)).await? {
        JoinEventOutcome::NotFound => Err(ApiError::not_found("event")),
        JoinEventOutcome::AlreadyJoined => Err(ApiError::bad_request("already joined this event")),
        JoinEventOutcome::Joined(row) => Ok(Json(event_response(row))),
    }
}
