//! Mapping of engine and lobby errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chkobba::ChkobbaError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub ChkobbaError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ChkobbaError::MatchNotFound(_) => StatusCode::NOT_FOUND,
            ChkobbaError::MatchClosed(_) => StatusCode::GONE,
            ChkobbaError::PlayerNotInMatch(_) | ChkobbaError::ReservedPlayerId(_) => {
                StatusCode::FORBIDDEN
            }
            ChkobbaError::NotPlayersTurn { .. }
            | ChkobbaError::InvalidPhase(_)
            | ChkobbaError::AlreadyQueued(_)
            | ChkobbaError::AlreadySeated(_) => StatusCode::CONFLICT,
            ChkobbaError::InvalidStake(_)
            | ChkobbaError::CardNotInHand { .. }
            | ChkobbaError::CaptureSumMismatch { .. }
            | ChkobbaError::ChkobbaPreconditionFailed { .. }
            | ChkobbaError::InvalidParticipants { .. } => StatusCode::BAD_REQUEST,
            ChkobbaError::DealPreconditionFailed { .. } | ChkobbaError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ChkobbaError> for ApiError {
    fn from(err: ChkobbaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !self.0.is_client_error() {
            tracing::error!(status = %status, "Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.client_message(),
            }),
        )
            .into_response()
    }
}
