use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use ridebuddy_gateway::auth::verify_token;

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the JWT from the Authorization header; the decoded
/// `Claims` are stored as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = verify_token(&state.jwt_secret, token).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
