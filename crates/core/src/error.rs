use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Closed set of failures the domain can produce.
///
/// The core never logs or retries; callers map these to transport
/// status codes at the boundary.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input: non-positive id, inverted bound pair, inverted
    /// statistics range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced roll does not exist, or a filter matched nothing.
    #[error("no matching roll found")]
    NotFound,

    /// An attempted transition out of a terminal state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unexpected failure with the original cause attached.
    #[error("internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(Box::new(source))
    }

    /// Returns the canonical label used for problem types and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}
