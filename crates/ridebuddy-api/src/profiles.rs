use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ridebuddy_db::models::{ImageRow, UserRow};
use ridebuddy_types::api::{
    AddImageRequest, Claims, ProfileImage, ProfileResponse, ProfileSettings, PublicProfile,
    UpdateProfileRequest,
};

use crate::AppState;
use crate::error::ApiError;

const MAX_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 500;
const MAX_INTERESTS: usize = 20;
const MAX_URL_LEN: usize = 2048;

pub(crate) fn image_response(row: ImageRow) -> ProfileImage {
    ProfileImage {
        id: row.id,
        url: row.url,
        is_main: row.is_main,
        created_at: row.created_at,
    }
}

fn profile_response(user: UserRow, images: Vec<ImageRow>) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        bio: user.bio,
        age: user.age,
        gender: user.gender,
        looking_for: user.looking_for,
        interests: user.interests,
        images: images.into_iter().map(image_response).collect(),
        settings: ProfileSettings {
            max_distance: user.max_distance,
            age_min: user.age_min,
            age_max: user.age_max,
            notify_matches: user.notify_matches,
            notify_messages: user.notify_messages,
        },
        is_online: user.is_online,
        last_active: user.last_active,
        created_at: user.created_at,
    }
}

pub(crate) fn public_profile(user: UserRow, images: Vec<ImageRow>) -> PublicProfile {
    PublicProfile {
        id: user.id,
        name: user.name,
        bio: user.bio,
        age: user.age,
        gender: user.gender,
        interests: user.interests,
        images: images.into_iter().map(image_response).collect(),
        is_online: user.is_online,
        last_active: user.last_active,
    }
}

/// Pair each user with their images, keeping the users' order.
pub(crate) fn attach_images(users: Vec<UserRow>, images: Vec<ImageRow>) -> Vec<PublicProfile> {
    let mut by_user: HashMap<Uuid, Vec<ImageRow>> = HashMap::new();
    for image in images {
        by_user.entry(image.user_id).or_default().push(image);
    }

    users
        .into_iter()
        .map(|user| {
            let images = by_user.remove(&user.id).unwrap_or_default();
            public_profile(user, images)
        })
        .collect()
}

fn validate_update(req: &UpdateProfileRequest, current: &UserRow) -> Result<(), ApiError> {
    if let Some(name) = &req.name {
        let len = name.trim().chars().count();
        if len == 0 || len > MAX_NAME_LEN {
            return Err(ApiError::bad_request("name must be 1-100 characters"));
        }
    }
    if let Some(bio) = &req.bio {
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(ApiError::bad_request("bio must be at most 500 characters"));
        }
    }
    if let Some(age) = req.age {
        if !(18..=120).contains(&age) {
            return Err(ApiError::bad_request("age must be between 18 and 120"));
        }
    }
    if let Some(interests) = &req.interests {
        if interests.len() > MAX_INTERESTS {
            return Err(ApiError::bad_request("too many interests"));
        }
    }
    if let Some(settings) = &req.settings {
        if let Some(d) = settings.max_distance {
            if !(1..=100).contains(&d) {
                return Err(ApiError::bad_request("max_distance must be between 1 and 100"));
            }
        }
        let age_min = settings.age_min.unwrap_or(current.age_min);
        let age_max = settings.age_max.unwrap_or(current.age_max);
        if !(18..=120).contains(&age_min) || !(18..=120).contains(&age_max) {
            return Err(ApiError::bad_request("age range must be within 18-120"));
        }
        if age_min > age_max {
            return Err(ApiError::bad_request("age_min must not exceed age_max"));
        }
    }
    Ok(())
}

/// GET /profile
pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (user, images) = state
        .db(move |db| Ok((db.get_user(user_id)?, db.list_images(user_id)?)))
        .await?;
    let user = user.ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(profile_response(user, images)))
}

/// PUT /profile: partial update
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let current = state
        .db(move |db| db.get_user(user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    validate_update(&req, &current)?;

    let (user, images) = state
        .db(move |db| Ok((db.update_profile(user_id, &req)?, db.list_images(user_id)?)))
        .await?;
    let user = user.ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(profile_response(user, images)))
}

/// GET /profiles/{user_id}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, images) = state
        .db(move |db| Ok((db.get_user(user_id)?, db.list_images(user_id)?)))
        .await?;
    let user = user.ok_or_else(|| ApiError::not_found("profile"))?;

    Ok(Json(public_profile(user, images)))
}

/// POST /profile/images: registers a URL from the media host.
pub async fn add_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = req.url.trim().to_string();
    if url.len() > MAX_URL_LEN || !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ApiError::bad_request("url must be an http(s) URL"));
    }

    let user_id = claims.sub;
    let row = state.db(move |db| db.add_image(user_id, &url)).await?;

    Ok((StatusCode::CREATED, Json(image_response(row))))
}

/// DELETE /profile/images/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    if !state.db(move |db| db.delete_image(user_id, image_id)).await? {
        return Err(ApiError::not_found("image"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /profile/images/{image_id}/main
pub async fn set_main_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let images = state
        .db(move |db| db.set_main_image(user_id, image_id))
        .await?
        .ok_or_else(|| ApiError::not_found("image"))?;

    Ok(Json(images.into_iter().map(image_response).collect::<Vec<_>>()))
}
