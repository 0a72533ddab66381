//! Store error types
//!
//! The only error type callers of [`super::DocumentStore`] see. Backend
//! errors are converted at the store boundary.
//!
//! Not errors:
//! - no match: reported as zero counts or `None`
//! - an identifier the native backend cannot convert: the query runs with
//!   the original string and simply matches nothing

use thiserror::Error;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Network or database unreachable, or timed out
    #[error("Backend unreachable: {0}")]
    Connectivity(String),

    /// Persisting a mutation was not confirmed; nothing was applied
    #[error("Write to collection '{collection}' failed: {reason}")]
    WriteFailed { collection: String, reason: String },

    /// The stored collection could not be parsed
    #[error("Collection '{collection}' is corrupt: {reason}")]
    CorruptCollection { collection: String, reason: String },

    /// The backend refused the operation
    #[error("Operation rejected: {0}")]
    Rejected(String),

    /// A store could not be built from the configuration
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create a write failure error
    pub fn write_failed(collection: &str, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt collection error
    pub fn corrupt(collection: &str, reason: impl Into<String>) -> Self {
        Self::CorruptCollection {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connectivity(_) => "CONNECTIVITY_FAILURE",
            Self::WriteFailed { .. } => "STORAGE_WRITE_FAILURE",
            Self::CorruptCollection { .. } => "CORRUPT_COLLECTION",
            Self::Rejected(_) => "OPERATION_REJECTED",
            Self::Config(_) => "STORE_CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(StoreError::Connectivity("x".into()).code(), "CONNECTIVITY_FAILURE");
        assert_eq!(StoreError::write_failed("orders", "503").code(), "STORAGE_WRITE_FAILURE");
    }

    #[test]
    fn test_display() {
        let err = StoreError::write_failed("orders", "status 503");
        assert_eq!(err.to_string(), "Write to collection 'orders' failed: status 503");
    }
}
