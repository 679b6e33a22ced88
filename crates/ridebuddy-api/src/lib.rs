pub mod auth;
pub mod error;
pub mod events;
pub mod gateway;
pub mod matches;
pub mod messages;
pub mod middleware;
pub mod profiles;
pub mod swipes;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tracing::error;

use ridebuddy_db::Database;
use ridebuddy_gateway::chat::ChatService;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub chat: ChatService,
}

impl AppStateInner {
    /// Run a blocking store call off the async runtime.
    pub(crate) async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
            .map_err(ApiError::from)
    }
}

/// All HTTP routes. `/auth/*` and `/health` are public, `/gateway` checks
/// its own token before upgrading; everything else requires a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/gateway", get(gateway::ws_upgrade))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/profile", get(profiles::get_own_profile).put(profiles::update_profile))
        .route("/profile/images", post(profiles::add_image))
        .route("/profile/images/{image_id}", delete(profiles::delete_image))
        .route("/profile/images/{image_id}/main", put(profiles::set_main_image))
        .route("/profiles/{user_id}", get(profiles::get_profile))
        .route("/swipes", post(swipes::record_swipe))
        .route("/swipes/profiles", get(swipes::candidates))
        .route("/matches", get(matches::list_matches))
        .route("/matches/check/{user_id}", get(matches::check_match))
        .route("/messages/{match_id}", get(messages::get_messages).post(messages::send_message))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/{event_id}", get(events::get_event))
        .route("/events/{event_id}/join", post(events::join_event))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
