//! Geoquery Semantic Enhancement Layer
//!
//! Embeds the user's query and every endpoint description into a shared
//! 384-dimensional space and ranks endpoints by cosine similarity. The
//! hybrid router uses this as a verifier (confidence boost on agreement)
//! and as a last resort when its own confidence is low.
//!
//! Operational contract:
//!
//! - Endpoint descriptions are embedded once per catalog fingerprint,
//!   cached in memory and optionally on disk.
//! - Initialization is bounded (2 s default); the per-query hot path is
//!   bounded separately (100 ms default) and observes the router deadline.
//! - Any failure - missing model, inference error, expired deadline -
//!   makes the layer report unavailable; routing never fails because of it.
//!
//! Tokenizer and ONNX session are cached per-thread; first call on a
//! blocking worker pays the setup cost. `"stub"` mode swaps the model for
//! a deterministic feature-hashing embedder.

mod cache;
mod config;
mod error;
mod normalize;
mod onnx;
mod stub;
mod types;

pub use crate::cache::EmbeddingCache;
pub use crate::config::SemanticConfig;
pub use crate::error::SemanticError;
pub use crate::normalize::cosine_similarity;
pub use crate::types::{EndpointEmbedding, SemanticVerdict};

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::onnx::embed_with_onnx;
use crate::stub::hashed_embedding;

/// Cosine-ranking router over embedded endpoint descriptions.
pub struct SemanticRouter {
    cfg: SemanticConfig,
    cache: EmbeddingCache,
    endpoints: RwLock<Arc<Vec<EndpointEmbedding>>>,
}

impl SemanticRouter {
    pub fn new(cfg: SemanticConfig, catalog_fingerprint: u64) -> Self {
        let cache = EmbeddingCache::open(
            cfg.cache_dir.as_deref(),
            catalog_fingerprint,
            &cfg.model_name,
        );
        Self {
            cfg,
            cache,
            endpoints: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.cfg
    }

    /// Whether [`initialize`](Self::initialize) has produced a usable space.
    pub fn is_ready(&self) -> bool {
        !self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<Vec<EndpointEmbedding>> {
        self.endpoints
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Embed every endpoint's routing text within the init budget. Entries
    /// already in the (possibly persisted) cache are free; only new texts
    /// hit the model. Idempotent.
    pub async fn initialize(&self, entries: &[(String, String)]) -> Result<(), SemanticError> {
        let started = Instant::now();
        let budget = Duration::from_millis(self.cfg.init_timeout_ms);
        let mut embedded = Vec::with_capacity(entries.len());

        for (endpoint, text) in entries {
            let remaining = budget
                .checked_sub(started.elapsed())
                .ok_or(SemanticError::DeadlineExceeded)?;
            let vector = self.embed_cached(text, remaining).await?;
            embedded.push(EndpointEmbedding {
                endpoint: endpoint.clone(),
                vector,
            });
        }

        if let Err(err) = self.cache.persist() {
            warn!(error = %err, "embedding cache persist failed");
        }

        let mut guard = self
            .endpoints
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(embedded);
        info!(
            endpoints = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            model = %self.cfg.model_name,
            "semantic_layer_initialized"
        );
        Ok(())
    }

    /// Rank all endpoints against the query. `deadline` is the router's
    /// remaining budget; the layer also enforces its own hot-path budget,
    /// whichever is tighter.
    pub async fn verify(
        &self,
        query: &str,
        deadline: Duration,
    ) -> Result<SemanticVerdict, SemanticError> {
        let endpoints = self.snapshot();
        if endpoints.is_empty() {
            return Err(SemanticError::Unavailable(
                "semantic layer not initialized".into(),
            ));
        }

        let budget = deadline.min(Duration::from_millis(self.cfg.request_budget_ms));
        let query_vector = self.embed_cached(query, budget).await?;

        let mut ranking: Vec<(String, f64)> = endpoints
            .iter()
            .map(|endpoint| {
                let score = cosine_similarity(&query_vector, &endpoint.vector) as f64;
                (endpoint.endpoint.clone(), score.clamp(0.0, 1.0))
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let (endpoint, confidence) = ranking
            .first()
            .cloned()
            .ok_or_else(|| SemanticError::Unavailable("no endpoints embedded".into()))?;
        debug!(endpoint = %endpoint, confidence, "semantic_verdict");

        Ok(SemanticVerdict {
            endpoint,
            confidence,
            ranking,
            model_name: self.cfg.model_name.clone(),
        })
    }

    async fn embed_cached(
        &self,
        text: &str,
        budget: Duration,
    ) -> Result<Arc<Vec<f32>>, SemanticError> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit);
        }
        let vector = self.embed_within(text, budget).await?;
        Ok(self.cache.insert(text, vector))
    }

    async fn embed_within(&self, text: &str, budget: Duration) -> Result<Vec<f32>, SemanticError> {
        if budget.is_zero() {
            return Err(SemanticError::DeadlineExceeded);
        }
        if self.cfg.mode == "stub" {
            return Ok(hashed_embedding(text, &self.cfg));
        }

        let cfg = self.cfg.clone();
        let owned = text.to_string();
        let task = tokio::task::spawn_blocking(move || match embed_with_onnx(&owned, &cfg) {
            // Missing assets degrade to the deterministic stub, mirroring
            // the catalog-embedding behavior in offline deployments.
            Err(SemanticError::ModelNotFound(path)) => {
                warn!(path = %path, "model assets missing; using hashed embedding");
                Ok(hashed_embedding(&owned, &cfg))
            }
            Err(SemanticError::TokenizerMissing(path)) => {
                warn!(path = %path, "tokenizer missing; using hashed embedding");
                Ok(hashed_embedding(&owned, &cfg))
            }
            other => other,
        });

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(SemanticError::Unavailable(join_err.to_string())),
            Err(_) => Err(SemanticError::DeadlineExceeded),
        }
    }
}
