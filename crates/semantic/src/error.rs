use std::io;
use thiserror::Error;

/// Errors surfaced by the semantic layer. Every one of them is recoverable
/// from the router's perspective: the layer reports itself unavailable and
/// routing proceeds on the hybrid result alone.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The ONNX model file could not be located.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// The tokenizer JSON is missing.
    #[error("tokenizer missing: {0}")]
    TokenizerMissing(String),
    /// Configuration is inconsistent (zero dimension, unknown mode).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Filesystem failures around the persistent cache.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime, tokenizer, or pooling errors.
    #[error("inference failure: {0}")]
    Inference(String),
    /// The layer is not initialized or its worker died.
    #[error("semantic layer unavailable: {0}")]
    Unavailable(String),
    /// The per-request or init deadline expired.
    #[error("semantic deadline exceeded")]
    DeadlineExceeded,
}
