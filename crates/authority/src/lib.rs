//! Geoquery Configuration Authority
//!
//! Single source of truth for the score-field contract. Every endpoint has
//! exactly one canonical score field; processors, the renderer, and the map
//! popup must all agree on it. Historically a processor could emit its own
//! guess (`strategic_value_score` vs `strategic_analysis_score`) and the
//! popup grew duplicate rows - the authority exists so that after a
//! processor runs, the orchestrator overwrites the result's target variable
//! with the value resolved here.
//!
//! The descriptor map is read-mostly: reloads swap the whole map atomically
//! behind an `RwLock<Arc<_>>`, so readers never observe a half-applied
//! configuration.

mod catalog;
mod descriptor;

pub use catalog::default_catalog;
pub use descriptor::{
    EndpointDescriptor, EndpointFamily, FieldTag, IntentKind, PaletteFamily, RendererDefaults,
    WeightedTerm,
};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use fxhash::hash64;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors surfaced by the configuration authority.
#[derive(Debug, Clone, Error)]
pub enum AuthorityError {
    /// The endpoint is not in the catalog. Echoes the id for diagnostics.
    #[error("no configuration for endpoint: {0}")]
    ConfigurationMissing(String),
    /// A descriptor failed load-time validation.
    #[error("invalid endpoint descriptor for {id}: {reason}")]
    InvalidDescriptor { id: String, reason: String },
}

/// Authoritative rendering/processing contract for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Canonical score field; the renderer field and popup row use this name.
    pub target_variable: String,
    pub processor_id: String,
    pub renderer: RendererDefaults,
}

#[derive(Debug)]
struct Catalog {
    by_id: HashMap<String, Arc<EndpointDescriptor>>,
    order: Vec<String>,
    fingerprint: u64,
}

impl Catalog {
    fn build(descriptors: Vec<EndpointDescriptor>) -> Result<Self, AuthorityError> {
        let mut by_id = HashMap::with_capacity(descriptors.len());
        let mut order = Vec::with_capacity(descriptors.len());
        let mut digest = String::new();

        for descriptor in descriptors {
            validate_descriptor(&descriptor)?;
            digest.push_str(&descriptor.id);
            digest.push('\u{1f}');
            digest.push_str(&descriptor.description);
            digest.push('\u{1e}');
            if by_id
                .insert(descriptor.id.clone(), Arc::new(descriptor.clone()))
                .is_some()
            {
                return Err(AuthorityError::InvalidDescriptor {
                    id: descriptor.id,
                    reason: "duplicate endpoint id".into(),
                });
            }
            order.push(descriptor.id);
        }

        Ok(Self {
            by_id,
            order,
            fingerprint: hash64(digest.as_bytes()),
        })
    }
}

fn validate_descriptor(descriptor: &EndpointDescriptor) -> Result<(), AuthorityError> {
    let invalid = |reason: &str| AuthorityError::InvalidDescriptor {
        id: descriptor.id.clone(),
        reason: reason.into(),
    };

    if !descriptor.id.starts_with('/') || descriptor.id.len() < 2 {
        return Err(invalid("id must be a /path identifier"));
    }
    if descriptor.score_field.trim().is_empty() {
        return Err(invalid("score_field must not be empty"));
    }
    if descriptor.processor_id.trim().is_empty() {
        return Err(invalid("processor_id must not be empty"));
    }
    if descriptor.primary_keywords.is_empty() {
        return Err(invalid("at least one primary keyword is required"));
    }
    if let Some(threshold) = descriptor.confidence_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid("confidence_threshold must be within [0, 1]"));
        }
    }
    if descriptor.renderer.classes == 0 {
        return Err(invalid("renderer must declare at least one class"));
    }
    Ok(())
}

/// Process-wide, reloadable endpoint catalog.
#[derive(Debug)]
pub struct ConfigAuthority {
    inner: RwLock<Arc<Catalog>>,
}

impl ConfigAuthority {
    /// Build an authority over the built-in 25-endpoint catalog.
    pub fn with_defaults() -> Self {
        Self::new(default_catalog()).expect("built-in catalog must validate")
    }

    pub fn new(descriptors: Vec<EndpointDescriptor>) -> Result<Self, AuthorityError> {
        let catalog = Catalog::build(descriptors)?;
        info!(
            endpoints = catalog.order.len(),
            fingerprint = catalog.fingerprint,
            "authority_loaded"
        );
        Ok(Self {
            inner: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Atomically replace the catalog. Readers holding the previous map keep
    /// a consistent view until they re-read.
    pub fn reload(&self, descriptors: Vec<EndpointDescriptor>) -> Result<(), AuthorityError> {
        let catalog = Arc::new(Catalog::build(descriptors)?);
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        info!(
            endpoints = catalog.order.len(),
            fingerprint = catalog.fingerprint,
            "authority_reloaded"
        );
        *guard = catalog;
        Ok(())
    }

    fn snapshot(&self) -> Arc<Catalog> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Authoritative score config for an endpoint. The returned
    /// `target_variable` overrides whatever a processor emitted.
    pub fn score_config(&self, endpoint: &str) -> Result<ScoreConfig, AuthorityError> {
        let descriptor = self.descriptor(endpoint)?;
        Ok(ScoreConfig {
            target_variable: descriptor.score_field.clone(),
            processor_id: descriptor.processor_id.clone(),
            renderer: descriptor.renderer.clone(),
        })
    }

    pub fn descriptor(&self, endpoint: &str) -> Result<Arc<EndpointDescriptor>, AuthorityError> {
        self.snapshot()
            .by_id
            .get(endpoint)
            .cloned()
            .ok_or_else(|| AuthorityError::ConfigurationMissing(endpoint.to_string()))
    }

    /// Endpoint ids in catalog order.
    pub fn list_endpoints(&self) -> Vec<String> {
        self.snapshot().order.clone()
    }

    /// All descriptors in catalog order.
    pub fn descriptors(&self) -> Vec<Arc<EndpointDescriptor>> {
        let snapshot = self.snapshot();
        snapshot
            .order
            .iter()
            .filter_map(|id| snapshot.by_id.get(id).cloned())
            .collect()
    }

    /// Stable fingerprint over endpoint ids + descriptions; keys the
    /// persistent embedding cache.
    pub fn catalog_fingerprint(&self) -> u64 {
        self.snapshot().fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(id: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            id: id.into(),
            display_name: "Test".into(),
            description: "test endpoint".into(),
            score_field: EndpointDescriptor::derived_score_field(id),
            processor_id: "analyze".into(),
            family: EndpointFamily::General,
            intent: IntentKind::DemographicAnalysis,
            sample_queries: vec!["sample".into()],
            primary_keywords: vec![WeightedTerm::new("test", 1.0)],
            context_keywords: vec![],
            boost_terms: vec![],
            penalty_terms: vec![],
            avoid_terms: vec![],
            confidence_threshold: None,
            required_tags: vec![],
            renderer: RendererDefaults::default(),
        }
    }

    #[test]
    fn score_config_matches_catalog() {
        let authority = ConfigAuthority::with_defaults();
        let config = authority.score_config("/strategic-analysis").unwrap();
        assert_eq!(config.target_variable, "strategic_analysis_score");
        assert_eq!(config.processor_id, "strategic_analysis");
    }

    #[test]
    fn unknown_endpoint_is_configuration_missing() {
        let authority = ConfigAuthority::with_defaults();
        let err = authority.score_config("/no-such-endpoint").unwrap_err();
        match err {
            AuthorityError::ConfigurationMissing(id) => assert_eq!(id, "/no-such-endpoint"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reload_same_catalog_is_idempotent() {
        let authority = ConfigAuthority::with_defaults();
        let before: Vec<_> = authority
            .descriptors()
            .iter()
            .map(|d| (**d).clone())
            .collect();
        let fingerprint = authority.catalog_fingerprint();

        authority.reload(default_catalog()).unwrap();

        let after: Vec<_> = authority
            .descriptors()
            .iter()
            .map(|d| (**d).clone())
            .collect();
        assert_eq!(before, after);
        assert_eq!(fingerprint, authority.catalog_fingerprint());
    }

    #[test]
    fn reload_swaps_visible_catalog() {
        let authority = ConfigAuthority::with_defaults();
        authority
            .reload(vec![minimal("/only-endpoint")])
            .expect("reload should succeed");
        assert_eq!(authority.list_endpoints(), vec!["/only-endpoint"]);
        assert!(authority.score_config("/strategic-analysis").is_err());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = ConfigAuthority::new(vec![minimal("/dup"), minimal("/dup")]).unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidDescriptor { .. }));
    }

    #[test]
    fn invalid_threshold_rejected() {
        let mut descriptor = minimal("/bad");
        descriptor.confidence_threshold = Some(1.5);
        let err = ConfigAuthority::new(vec![descriptor]).unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidDescriptor { .. }));
    }

    #[test]
    fn fingerprint_changes_with_descriptions() {
        let a = ConfigAuthority::new(vec![minimal("/a")]).unwrap();
        let mut changed = minimal("/a");
        changed.description = "something else".into();
        let b = ConfigAuthority::new(vec![changed]).unwrap();
        assert_ne!(a.catalog_fingerprint(), b.catalog_fingerprint());
    }
}
