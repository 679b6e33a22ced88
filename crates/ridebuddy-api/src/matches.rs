use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use ridebuddy_types::api::{Claims, MatchSummary, MatchUser, SwipeResponse};

use crate::AppState;
use crate::error::ApiError;

/// GET /matches
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let rows = state.db(move |db| db.list_matches_for(user_id)).await?;

    let matches: Vec<MatchSummary> = rows
        .into_iter()
        .map(|row| MatchSummary {
            match_id: row.matched.id,
            other_user: MatchUser {
                id: row.other_id,
                name: row.other_name,
                main_image: row.other_main_image,
                is_online: row.other_is_online,
                last_active: row.other_last_active,
            },
            last_message: row.matched.last_message,
            last_message_at: row.matched.last_message_at,
            created_at: row.matched.created_at,
        })
        .collect();

    Ok(Json(matches))
}

/// GET /matches/check/{user_id}
pub async fn check_match(
    State(state): State<AppState>,
    Path(other): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub;
    let found = state.db(move |db| db.find_match_between(me, other)).await?;

    Ok(Json(SwipeResponse {
        matched: found.is_some(),
        match_id: found.map(|m| m.id),
    }))
}
