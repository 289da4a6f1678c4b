//! Caller identity middleware for player endpoints.
//!
//! Authentication is performed upstream; this server trusts the
//! `x-player-id` header as the authenticated identity. The middleware
//! validates it and injects a [`PlayerId`] into request extensions.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use chkobba::PlayerId;
//!
//! async fn handler(Extension(player): Extension<PlayerId>) -> String {
//!     format!("Hello {player}")
//! }
//! # let _ = handler;
//! ```

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use chkobba::{PlayerId, bot::is_fallback_id};

/// Header carrying the upstream-authenticated player id
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// Validate a caller-supplied identity.
///
/// Empty ids are unauthenticated; ids in the fallback namespace are refused
/// so a caller can never act as a scripted seat.
pub fn parse_player_id(raw: Option<&str>) -> Result<PlayerId, StatusCode> {
    let player = PlayerId::new(raw.ok_or(StatusCode::UNAUTHORIZED)?);
    if player.as_str().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if is_fallback_id(&player) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(player)
}

/// Middleware that reads `x-player-id` and injects the caller's [`PlayerId`].
///
/// - **Missing or empty header**: `401 Unauthorized`
/// - **Fallback-prefixed id**: `403 Forbidden`
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let player = parse_player_id(
        request
            .headers()
            .get(PLAYER_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    )?;

    request.extensions_mut().insert(player);
    Ok(next.run(request).await)
}
