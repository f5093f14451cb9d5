//! Embedding cache.
//!
//! Embeddings are deterministic for a given model, so concurrent writes of
//! the same key are idempotent and last-writer-wins is safe; readers never
//! block. Endpoint-description vectors are additionally persisted to a JSON
//! file keyed by the catalog fingerprint, so a restart skips the cold-start
//! embedding pass as long as the catalog is unchanged.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SemanticError;

#[derive(Serialize, Deserialize)]
struct PersistedCache {
    model_name: String,
    entries: HashMap<String, Vec<f32>>,
}

pub struct EmbeddingCache {
    memory: DashMap<String, Arc<Vec<f32>>>,
    disk_path: Option<PathBuf>,
    model_name: String,
}

impl EmbeddingCache {
    /// Open a cache. With a cache dir, previously persisted vectors for the
    /// same catalog fingerprint and model are loaded eagerly.
    pub fn open(cache_dir: Option<&Path>, fingerprint: u64, model_name: &str) -> Self {
        let disk_path =
            cache_dir.map(|dir| dir.join(format!("endpoint-embeddings-{fingerprint:016x}.json")));
        let cache = Self {
            memory: DashMap::new(),
            disk_path,
            model_name: model_name.to_string(),
        };
        cache.load_from_disk();
        cache
    }

    pub fn get(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        self.memory.get(text).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, text: &str, vector: Vec<f32>) -> Arc<Vec<f32>> {
        let vector = Arc::new(vector);
        self.memory.insert(text.to_string(), vector.clone());
        vector
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    fn load_from_disk(&self) {
        let Some(path) = &self.disk_path else {
            return;
        };
        let Ok(bytes) = fs::read(path) else {
            return;
        };
        match serde_json::from_slice::<PersistedCache>(&bytes) {
            Ok(persisted) if persisted.model_name == self.model_name => {
                for (text, vector) in persisted.entries {
                    self.memory.insert(text, Arc::new(vector));
                }
                debug!(entries = self.memory.len(), "embedding_cache_loaded");
            }
            Ok(_) => {
                debug!("embedding cache model changed; ignoring persisted file");
            }
            Err(err) => {
                warn!(error = %err, "embedding cache unreadable; starting cold");
            }
        }
    }

    /// Persist the current entries. IO failures are logged, not fatal: the
    /// cache is an optimization, never a correctness dependency.
    pub fn persist(&self) -> Result<(), SemanticError> {
        let Some(path) = &self.disk_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let persisted = PersistedCache {
            model_name: self.model_name.clone(),
            entries: self
                .memory
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().as_ref().clone()))
                .collect(),
        };
        let bytes = serde_json::to_vec(&persisted)
            .map_err(|e| SemanticError::Inference(e.to_string()))?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let cache = EmbeddingCache::open(None, 1, "stub");
        assert!(cache.get("query").is_none());
        cache.insert("query", vec![0.5, 0.5]);
        assert_eq!(cache.get("query").unwrap().as_ref(), &vec![0.5, 0.5]);
    }

    #[test]
    fn persist_and_reload_same_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(Some(dir.path()), 42, "stub");
        cache.insert("endpoint text", vec![1.0, 0.0]);
        cache.persist().unwrap();

        let reloaded = EmbeddingCache::open(Some(dir.path()), 42, "stub");
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get("endpoint text").unwrap().as_ref(),
            &vec![1.0, 0.0]
        );
    }

    #[test]
    fn different_fingerprint_starts_cold() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(Some(dir.path()), 1, "stub");
        cache.insert("text", vec![1.0]);
        cache.persist().unwrap();

        let other = EmbeddingCache::open(Some(dir.path()), 2, "stub");
        assert!(other.is_empty());
    }

    #[test]
    fn different_model_ignores_persisted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(Some(dir.path()), 7, "stub");
        cache.insert("text", vec![1.0]);
        cache.persist().unwrap();

        let other = EmbeddingCache::open(Some(dir.path()), 7, "bge-small-en-v1.5");
        assert!(other.is_empty());
    }

    #[test]
    fn last_writer_wins_is_acceptable() {
        let cache = EmbeddingCache::open(None, 1, "stub");
        cache.insert("k", vec![1.0]);
        cache.insert("k", vec![2.0]);
        assert_eq!(cache.get("k").unwrap().as_ref(), &vec![2.0]);
    }
}
