//! Adapter error types.
//!
//! All adapters surface errors through [`AdapterError`].  At the trait seam
//! each adapter converts into the matching `DialogueError` variant so the
//! workflow engine can apply its fallback.

/// Unified error type for skycal adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("{service} request failed: {reason}")]
    Request {
        service: &'static str,
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered, but not in the expected shape.
    #[error("unexpected {service} response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    /// A required setting or secret is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdapterError {
    pub(crate) fn request(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Request {
            service,
            reason: err.to_string(),
        }
    }

    pub(crate) fn invalid(service: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
