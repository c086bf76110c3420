use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::ScanError;

impl ScanError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScanError::Busy(_) => StatusCode::CONFLICT,
            ScanError::InvalidTarget(_) | ScanError::Config(_) | ScanError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            ScanError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            ScanError::ResourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScanError::Browser(_)
            | ScanError::Transport(_)
            | ScanError::EngineFailure(_)
            | ScanError::Agent(_) => StatusCode::BAD_GATEWAY,
            ScanError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ScanError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let kind = self.classify().error_type;
        (status, Json(json!({"error": self.to_string(), "kind": kind}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ScanError::Busy("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ScanError::InvalidTarget("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ScanError::Timeout("x".into()).status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ScanError::ResourceUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ScanError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
