//! Geoquery - query understanding and data shaping for geospatial
//! analytics chat.
//!
//! The crate turns a natural-language analytical question into three
//! things: a routing decision over ~25 pre-computed analysis endpoints, a
//! normalized and ranked record set with one canonical score per area, and
//! a class-break renderer spec plus a bounded payload summary the
//! narrating LLM consumes instead of raw feature enumeration.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use geoquery::{
//!     AnalysisRequest, GeoqueryConfig, Pipeline, StaticDataSource,
//! };
//! use georef::StaticGeoReference;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = GeoqueryConfig::default();
//!     let reference = Arc::new(StaticGeoReference::florida_fixture());
//!     let pipeline = Pipeline::new(
//!         &config,
//!         Arc::new(StaticDataSource::new()),
//!         reference.clone(),
//!         Some(reference),
//!     )
//!     .await
//!     .expect("pipeline assembles");
//!
//!     let response = pipeline
//!         .handle(AnalysisRequest {
//!             query: "Show me the top strategic markets for expansion".into(),
//!             dataset_context: None,
//!             deadline_ms: None,
//!         })
//!         .await;
//!     assert!(response.is_success() || response.as_failure().is_some());
//! }
//! ```
//!
//! ## Structure
//!
//! The stage crates do the work; this umbrella wires them together:
//!
//! - [`authority`] - endpoint catalog and the score-field contract
//! - [`brand`] - brand field detection and market-gap arithmetic
//! - [`georef`] - place extraction and the geographic reference client
//! - [`router`] - the five-layer hybrid router and keyword fallback
//! - [`semantic`] - the local-embedding verification layer
//! - [`processors`] - per-endpoint raw-data shaping
//! - [`renderer`] - quartile class-break renderer specs
//! - [`payload`] - bounded, analysis-aware LLM payload summaries
//!
//! ## Observability
//!
//! Install a [`StageMetrics`] recorder via [`set_stage_metrics`] and/or a
//! [`StageEventLogger`] via [`set_stage_logger`] to capture per-stage
//! latency and structured success/failure events; [`KeyValueLogger`]
//! writes escaped key-value lines to any writer.

pub mod config;
mod observe;
mod pipeline;

pub use config::{ConfigLoadError, GeoqueryConfig};
pub use observe::{
    set_stage_logger, set_stage_metrics, KeyValueLogger, Stage, StageEvent, StageEventLogger,
    StageMetrics, StageStatus,
};
pub use pipeline::{
    AnalysisRequest, DataSourceError, EndpointDataSource, FailureEnvelope, FileDataSource,
    Pipeline, PipelineError, PipelineResponse, StaticDataSource, SuccessEnvelope,
    UserFacingResponse,
};

pub use authority::{
    default_catalog, AuthorityError, ConfigAuthority, EndpointDescriptor, EndpointFamily,
    FieldTag, IntentKind, PaletteFamily, RendererDefaults, ScoreConfig, WeightedTerm,
};
pub use brand::{BrandConfig, BrandError, BrandResolver, BrandSpec, DetectedBrand};
pub use georef::{
    AreaRestriction, CityLookup, EntityResolver, GeoRefError, GeoReference, HttpGeoReference,
    PlaceAlias, PlaceKind, StaticGeoReference,
};
pub use payload::{
    optimize as optimize_payload, PayloadConfig, PayloadError, PayloadSummary,
};
pub use processors::{
    EndpointProcessor, ProcessOptions, ProcessedRecord, ProcessedResult, ProcessorError,
    ProcessorRegistry, RawEndpointData, ScoreStatistics,
};
pub use renderer::{build_renderer, ClassBreak, RenderError, RendererSpec};
pub use router::{
    DatasetContext, HybridRouter, RouterConfig, RoutingDecision, Scope, UserResponse,
};
pub use semantic::{SemanticConfig, SemanticError, SemanticRouter, SemanticVerdict};
