use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One endpoint description embedded into the routing space.
#[derive(Debug, Clone)]
pub struct EndpointEmbedding {
    pub endpoint: String,
    pub vector: Arc<Vec<f32>>,
}

/// Verdict of the semantic layer for one query: the cosine-nearest endpoint
/// plus the full ranking for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticVerdict {
    pub endpoint: String,
    /// Cosine similarity of the winning endpoint, clamped to [0, 1].
    pub confidence: f64,
    /// All endpoints ordered best-first.
    pub ranking: Vec<(String, f64)>,
    /// Label of the model that produced the vectors.
    pub model_name: String,
}
