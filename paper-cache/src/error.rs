//! Error types for cache operations
//!
//! The cache performs no I/O, so the taxonomy is small: configuration problems
//! detected at construction and invalidation hooks that could not reach the
//! store in time. Failures of the caller's compute step are never wrapped here;
//! they are handed back to the caller as-is.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An invalidation hook could not acquire the store in time
    #[error("Invalidation timed out after {timeout_ms}ms: {context}")]
    InvalidationTimeout { timeout_ms: u64, context: String },
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::ConfigError("max_entries must be greater than 0".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: max_entries must be greater than 0"
        );

        let timeout = CacheError::InvalidationTimeout {
            timeout_ms: 250,
            context: "invalidate_all".to_string(),
        };
        assert!(timeout.to_string().contains("after 250ms"));
        assert!(timeout.to_string().contains("invalidate_all"));
    }
}
