//! # Blob Storage Errors

use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Blob backend errors
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    // Transport errors
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status} from blob {operation}")]
    Status { operation: &'static str, status: u16 },

    // Content errors
    #[error("Malformed blob response: {0}")]
    Malformed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // Credentials
    #[error("Blob storage token is not set")]
    MissingToken,

    #[error("I/O error: {0}")]
    IoError(String),
}

impl BlobError {
    /// True when the remote side could not be reached or did not answer in time
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BlobError::Timeout(_) | BlobError::Request(_))
    }
}

impl From<reqwest::Error> for BlobError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BlobError::Timeout(e.to_string())
        } else if e.is_decode() {
            BlobError::Malformed(e.to_string())
        } else {
            BlobError::Request(e.to_string())
        }
    }
}

impl From<std::io::Error> for BlobError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            BlobError::NotFound(e.to_string())
        } else {
            BlobError::IoError(e.to_string())
        }
    }
}
