use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::extraction::ExtractionError;
use crate::llm_client::ModelError;
use crate::models::{FailureKind, Stage};

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response with a `{"error": ...}` body.
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::WithContext { source, context } => {
                tracing::debug!("Error with context: {} -> {}", context, source);
                return source.into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

/// Why a single lead could not be processed.
///
/// Never aborts the batch: the batch driver turns it into a `LeadFailure`
/// record and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    /// The model endpoint could not be reached or answered with an error.
    #[error("{stage} call failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: ModelError,
    },
    /// The model answered, but not with the requested structure.
    #[error("{stage} output rejected: {source}")]
    InvalidOutput {
        stage: Stage,
        #[source]
        source: ExtractionError,
    },
    /// The credential was refused too many times in a row in this batch.
    #[error("upstream circuit open, lead skipped")]
    CircuitOpen,
    /// The lead's task died before producing a result.
    #[error("lead task aborted: {0}")]
    Aborted(String),
}

impl LeadError {
    /// Stage the failure happened in, when it happened inside one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LeadError::Upstream { stage, .. } | LeadError::InvalidOutput { stage, .. } => {
                Some(*stage)
            }
            LeadError::CircuitOpen | LeadError::Aborted(_) => None,
        }
    }

    /// Public classification of the failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            LeadError::Upstream { source, .. } => match source {
                ModelError::Timeout => FailureKind::Timeout,
                ModelError::HttpStatus { status, .. } if *status == 401 || *status == 403 => {
                    FailureKind::CredentialRejected
                }
                ModelError::HttpStatus { status, .. } if *status == 429 => {
                    FailureKind::RateLimited
                }
                _ => FailureKind::UpstreamError,
            },
            LeadError::InvalidOutput { .. } => FailureKind::InvalidModelOutput,
            LeadError::CircuitOpen => FailureKind::CircuitOpen,
            LeadError::Aborted(_) => FailureKind::Internal,
        }
    }

    /// Whether the model service refused the credential.
    ///
    /// Only this trips the batch circuit breaker: a refused key stays refused,
    /// while throttling, server errors and timeouts can clear up mid-batch.
    pub fn is_credential_rejection(&self) -> bool {
        self.kind() == FailureKind::CredentialRejected
    }
}
