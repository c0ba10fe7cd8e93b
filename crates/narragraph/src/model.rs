//! External model capability used by the model-backed extractor.
//!
//! The hosted model is a black box behind [`ModelCapability`]: a blocking
//! request/response call that returns raw text. The extractor owns prompts,
//! timeouts, retries and response parsing; implementations only move bytes.

pub mod http;
pub mod prompts;
pub mod response;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use thiserror::Error;

pub use narragraph_text::ModelTier;

pub use http::HttpModelCapability;

/// One call to the external model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    /// Instructions, including the expected response schema
    pub prompt: String,
    /// The text to analyze
    pub context: String,
    pub timeout_ms: u64,
    pub tier: ModelTier,
}

/// A request/response capability backed by an external model.
///
/// Calls block the current thread; the extractor runs them on a worker
/// thread so it can enforce its own timeout and honour cancellation.
pub trait ModelCapability: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Send `request` and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`]; transient kinds are retried by the caller.
    fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("rate limited, retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("capability not configured: {0}")]
    NotConfigured(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,
}

impl ModelError {
    /// True for failures that may succeed when retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::RateLimited { .. } | Self::Timeout(_)
        )
    }
}

/// Shared flag used to abandon in-flight work.
///
/// Clones observe the same flag. Cancelling is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ModelError::RequestFailed("reset".into()).is_transient());
        assert!(ModelError::RateLimited { retry_after_ms: 10 }.is_transient());
        assert!(ModelError::Timeout(5).is_transient());
        assert!(!ModelError::InvalidResponse("html".into()).is_transient());
        assert!(!ModelError::Cancelled.is_transient());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
