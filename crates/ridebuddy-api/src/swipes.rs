use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use ridebuddy_db::models::SwipeOutcome;
use ridebuddy_types::api::{Claims, SwipeRequest, SwipeResponse};

use crate::AppState;
use crate::error::ApiError;
use crate::profiles::attach_images;

/// Size of one batch of swipe candidates.
const CANDIDATE_BATCH: u32 = 10;

/// POST /swipes
pub async fn record_swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;
    let target = req.target_id;

    if actor == target {
        return Err(ApiError::bad_request("cannot swipe on yourself"));
    }
    if !state.db(move |db| db.user_exists(target)).await? {
        return Err(ApiError::not_found("user"));
    }

    let outcome = state
        .db(move |db| db.record_swipe(actor, target, req.direction))
        .await?;

    let response = match outcome {
        SwipeOutcome::Duplicate => {
            return Err(ApiError::Conflict("already swiped on this user".into()));
        }
        SwipeOutcome::NoMatch => SwipeResponse {
            matched: false,
            match_id: None,
        },
        SwipeOutcome::Matched { match_id, created } => {
            if created {
                info!("{} and {} matched ({})", actor, target, match_id);
            }
            SwipeResponse {
                matched: true,
                match_id: Some(match_id),
            }
        }
    };

    Ok(Json(response))
}

/// GET /swipes/profiles: next batch of profiles to swipe on.
pub async fn candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (users, images) = state
        .db(move |db| {
            let Some(me) = db.get_user(user_id)? else {
                return Ok(None);
            };
            let users = db.candidate_profiles(&me, CANDIDATE_BATCH)?;
            let ids: Vec<_> = users.iter().map(|u| u.id).collect();
            let images = db.images_for_users(&ids)?;
            Ok(Some((users, images)))
        })
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(attach_images(users, images)))
}
