use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::rejection::WebSocketUpgradeRejection,
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use ridebuddy_gateway::auth::verify_token;
use ridebuddy_gateway::connection;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// GET /gateway
///
/// Authenticates before upgrading: the token comes from `?token=` (browsers
/// cannot set headers on a WebSocket handshake) or a bearer header. A
/// rejected handshake never registers a session.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = query.token.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let Some(claims) = token.and_then(|t| verify_token(&state.jwt_secret, &t)) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let user_id = claims.sub;
    match state.db(move |db| db.user_exists(user_id)).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => {
            warn!("gateway auth lookup failed for {}", user_id);
            return e.into_response();
        }
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let chat = state.chat.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, chat, user_id, claims.name))
}
