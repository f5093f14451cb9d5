//! Geoquery Endpoint Processors
//!
//! One processor per analysis endpoint. Each takes the endpoint's raw
//! pre-computed records - open JSON maps with inconsistent field naming -
//! and produces a normalized, ranked, scored result: canonical area ids
//! and names, one canonical score per record, dense ranks, statistics, and
//! a prose summary for the narrating LLM.
//!
//! Processors are stateless. They read only the fields they need, keep a
//! processor-specific context subset in `properties`, and skip unusable
//! records with a counted warning rather than aborting the endpoint.
//! `process(raw) == process(raw)` for the same input.

mod common;
mod registry;
mod stats;
mod types;

mod anomaly;
mod brand_difference;
mod clusters;
mod comparative;
mod competitive;
mod correlation;
mod customer;
mod demographic;
mod model_selection;
mod outliers;
mod scored;
mod segments;
mod spatial;
mod strategic;

pub use common::{
    area_id, area_name, first_numeric_field, numeric, preferred_numeric, retain_properties,
    sort_and_rank, top_list, validate_scores, ScoreCap, ScoreSource, ShapeSpec,
    AREA_ID_ALIASES, AREA_NAME_ALIASES, GENERIC_SCORE_FALLBACK,
};
pub use registry::ProcessorRegistry;
pub use scored::ScoredProcessor;
pub use stats::ScoreStatistics;
pub use types::{ProcessedRecord, ProcessedResult, RawEndpointData};

use std::sync::Arc;

use georef::CityLookup;
use thiserror::Error;

/// Errors surfaced by processors.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The raw payload failed validation; fatal for this endpoint (the
    /// orchestrator may retry the next-best endpoint).
    #[error("endpoint data validation failed: {0}")]
    ValidationFailed(String),
    /// Options required by this processor are missing or inconsistent.
    #[error("invalid processor options: {0}")]
    InvalidOptions(String),
    /// No processor is registered under the requested id.
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),
}

/// Per-request knobs shared by all processors.
#[derive(Clone, Default)]
pub struct ProcessOptions {
    /// Synchronous zip → city lookup for area-name augmentation.
    pub city_lookup: Option<Arc<dyn CityLookup>>,
    /// The original query text, used by processors that auto-detect brands.
    pub query: Option<String>,
    /// Explicit field pair for correlation analysis.
    pub correlation_fields: Option<(String, String)>,
}

impl std::fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("city_lookup", &self.city_lookup.is_some())
            .field("query", &self.query)
            .field("correlation_fields", &self.correlation_fields)
            .finish()
    }
}

/// The common processor contract: validate the raw payload, then shape it.
pub trait EndpointProcessor: Send + Sync {
    /// Registry key, e.g. `strategic_analysis`.
    fn processor_id(&self) -> &str;

    /// Endpoint identifier, e.g. `/strategic-analysis`.
    fn endpoint(&self) -> &str;

    /// Canonical score field this processor emits (the Configuration
    /// Authority may still override it downstream).
    fn score_field(&self) -> &str;

    /// Cheap validation of the raw payload shape.
    fn validate(&self, raw: &RawEndpointData) -> Result<(), ProcessorError> {
        validate_scores(raw, self.score_field()).map(|_| ())
    }

    fn process(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<ProcessedResult, ProcessorError>;
}
