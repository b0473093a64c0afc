use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Operational error carried by every failing handler path.
///
/// Each variant holds the message shown to the caller; internals behind an
/// `Unexpected` error are logged, never serialized.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error("An unexpected error occurred.")]
    Unexpected(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unexpected(err)
    }
}

/// JSON body of every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// "fail" for client-caused errors, "error" for server-side ones.
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Unexpected(ref inner) = self {
            tracing::error!(error = ?inner, "unexpected handler error");
        }

        let status = self.status_code();
        let body = ErrorBody {
            status: self.status_label(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_fail() {
        let err = ApiError::BadRequest("Passwords must match.".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.status_label(), "fail");
    }

    #[test]
    fn server_errors_are_error() {
        let err = ApiError::Internal("Failed to send OTP email.".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.status_label(), "error");
    }

    #[test]
    fn unexpected_errors_hide_internals() {
        let err: ApiError = anyhow::anyhow!("connection refused (10.0.0.3:5432)").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "An unexpected error occurred.");
    }

    #[test]
    fn error_body_serializes_envelope() {
        let body = ErrorBody {
            status: "fail",
            message: "OTP has expired. Please request a new one.".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["message"], "OTP has expired. Please request a new one.");
    }
}
