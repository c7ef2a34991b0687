use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::relay::{RelayError, RelayResponse};

/// Errors surfaced by the relay HTTP endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Never says whether the key was missing or wrong.
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Downstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Send(text) => ApiError::Downstream(text),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(RelayResponse::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(RelayError::NothingToSend).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RelayError::InvalidChatId("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RelayError::Send("timeout".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_downstream_text_is_passed_through() {
        let err = ApiError::from(RelayError::Send("Bad Request: chat not found".into()));
        assert_eq!(err.to_string(), "Bad Request: chat not found");
    }
}
