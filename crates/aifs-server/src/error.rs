use axum::http;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use aifs_auth::AuthError;
use aifs_engine::EngineError;
use aifs_protocol::{ErrorBody, ProtocolError, StatusCode};

/// Server-level errors, each carrying its RPC status.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("introspection is disabled in production mode")]
    IntrospectionDisabled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// The RPC status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::InvalidArgument(_) => StatusCode::InvalidArgument,
                EngineError::NotFound { .. } => StatusCode::NotFound,
                EngineError::AlreadyExists { .. } => StatusCode::AlreadyExists,
                EngineError::FailedPrecondition(_) => StatusCode::FailedPrecondition,
                EngineError::Integrity(_) => StatusCode::Internal,
                EngineError::Aborted(_) => StatusCode::Aborted,
                EngineError::Unavailable(_) => StatusCode::Unavailable,
                EngineError::Internal(_) => StatusCode::Internal,
            },
            Self::Auth(AuthError::Unauthenticated(_)) => StatusCode::Unauthenticated,
            Self::Auth(AuthError::PermissionDenied(_)) => StatusCode::PermissionDenied,
            Self::Protocol(_) | Self::BadRequest(_) => StatusCode::InvalidArgument,
            Self::IntrospectionDisabled => StatusCode::PermissionDenied,
            Self::Io(_) => StatusCode::Unavailable,
            Self::Internal(_) => StatusCode::Internal,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Integrity failures are logged loudly; they mean stored data or
        // signatures failed verification, not caller error.
        if matches!(self, Self::Engine(EngineError::Integrity(_))) {
            tracing::error!(error = %self, "integrity failure");
        }
        let body = ErrorBody {
            code: status,
            reason: status.as_str().into(),
            detail: Some(self.to_string()),
            retryable: status.retryable(),
        };
        let http_status = http::StatusCode::from_u16(status.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        (http_status, Json(body)).into_response()
    }
}
