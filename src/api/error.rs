//! HTTP rendering of [`Error`].
//!
//! Every failure is returned as `{"error": "<message>"}`. Server-side failures are
//! logged and replaced by a generic message; gateway failures keep the gateway's text.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidState { .. }
            | Self::Expired { .. }
            | Self::InsufficientXp { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateRating { .. } | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::TooManyPendingRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Gateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::validation("bad"), StatusCode::BAD_REQUEST),
            (Error::Expired { transaction_id: 1 }, StatusCode::BAD_REQUEST),
            (
                Error::InsufficientXp {
                    current: 1,
                    required: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Unauthorized {
                    message: "no".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (Error::forbidden("no"), StatusCode::FORBIDDEN),
            (Error::not_found("Game", 3), StatusCode::NOT_FOUND),
            (
                Error::DuplicateRating {
                    trade_id: 1,
                    rater_id: "a".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::TooManyPendingRequests { limit: 3 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (Error::gateway("down"), StatusCode::BAD_GATEWAY),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_body_carries_message() {
        let (status, body) = render(Error::not_found("Game", 42)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Game not found: 42");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = render(Error::Database(sea_orm::DbErr::Custom(
            "disk I/O error at /var/lib".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
