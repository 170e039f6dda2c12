//! Error types for recollect.

use thiserror::Error;

/// Main error type for recollect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Every configured embedding backend failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Caller-supplied input was rejected (malformed id, empty content, bad limit).
    #[error("Validation error: {0}")]
    Validation(String),

    /// SQLite error.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation invoked on a closed store or before initialization succeeded.
    #[error("Memory store is not initialized")]
    NotInitialized,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error from a remote or local embedding server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ONNX inference error.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Tokenization error.
    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    /// ONNX session error.
    #[error("ONNX session error: {0}")]
    Onnx(#[from] ort::Error),

    /// HuggingFace Hub error.
    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::sync::ApiError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from the storage layer (open, I/O or SQL failure).
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = Error::Validation("invalid memory id: abc".to_string());
        assert_eq!(err.to_string(), "Validation error: invalid memory id: abc");
    }

    #[test]
    fn test_storage_classification() {
        let io = Error::Io(std::io::Error::other("disk gone"));
        assert!(io.is_storage());
        assert!(!Error::NotInitialized.is_storage());
        assert!(!Error::Embedding("all tiers failed".into()).is_storage());
    }
}
