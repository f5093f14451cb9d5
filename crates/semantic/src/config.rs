use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the semantic verification layer.
///
/// `"onnx"` mode runs a local sentence-transformer; `"stub"` mode uses the
/// deterministic feature-hashing embedder (the test and offline mode). When
/// ONNX assets are missing the layer degrades to the stub rather than
/// failing routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Inference mode selector: `"onnx"` (local model) or `"stub"`.
    pub mode: String,
    /// Friendly label surfaced in reasoning notes.
    pub model_name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Embedding width; the bge-small family is 384.
    pub embedding_dim: usize,
    pub max_sequence_length: usize,
    /// L2-normalize vectors (required for cosine ranking).
    pub normalize: bool,
    /// Cold-start budget for embedding the endpoint catalog.
    pub init_timeout_ms: u64,
    /// Hot-path budget for embedding one query.
    pub request_budget_ms: u64,
    /// Directory for the persistent endpoint-embedding cache; `None`
    /// disables persistence.
    pub cache_dir: Option<PathBuf>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "onnx".into(),
            model_name: "bge-small-en-v1.5".into(),
            model_path: PathBuf::from("./models/bge-small-en-v1.5/onnx/model.onnx"),
            tokenizer_path: PathBuf::from("./models/bge-small-en-v1.5/tokenizer.json"),
            embedding_dim: 384,
            max_sequence_length: 256,
            normalize: true,
            init_timeout_ms: 2_000,
            request_budget_ms: 100,
            cache_dir: None,
        }
    }
}

impl SemanticConfig {
    /// Stub-mode config used by tests and offline deployments.
    pub fn stub() -> Self {
        Self {
            mode: "stub".into(),
            model_name: "hashed-bow".into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_onnx_384() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, "onnx");
        assert_eq!(cfg.embedding_dim, 384);
        assert!(cfg.normalize);
    }

    #[test]
    fn stub_mode_keeps_dimension() {
        let cfg = SemanticConfig::stub();
        assert_eq!(cfg.mode, "stub");
        assert_eq!(cfg.embedding_dim, 384);
    }
}
