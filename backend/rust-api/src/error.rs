use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy of the quiz engine. The first four variants are
/// recoverable by the caller and carry enough detail to correct the
/// request; `Storage` covers unexpected store failures whose transaction
/// has already been rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] mongodb::error::Error),
}

impl EngineError {
    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        EngineError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        EngineError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::Validation(errors.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            EngineError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            EngineError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            EngineError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            EngineError::Storage(err) => {
                tracing::error!("storage failure surfaced to client: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
        };

        let body = json!({
            "message": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_variants_keep_their_detail() {
        let err = EngineError::conflict("an incomplete quiz session already exists");
        assert_eq!(
            err.to_string(),
            "an incomplete quiz session already exists"
        );
    }

    #[test]
    fn validation_errors_convert() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(range(min = 1))]
            count: u32,
        }

        let err: EngineError = Probe { count: 0 }.validate().unwrap_err().into();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
