//! The pipeline orchestrator.
//!
//! Owns the per-request sequence: route → load raw endpoint data → apply
//! the geographic filter → dispatch the processor → apply the authority's
//! score-field override → build the renderer spec → optimize the payload.
//! Every failure produces a structured envelope that preserves the routing
//! reasoning, so the caller can always explain what happened.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use authority::{AuthorityError, ConfigAuthority};
use brand::BrandResolver;
use georef::{AreaRestriction, CityLookup, EntityResolver, GeoReference};
use payload::{optimize, PayloadConfig, PayloadError, PayloadSummary};
use processors::{
    ProcessOptions, ProcessedRecord, ProcessedResult, ProcessorError, ProcessorRegistry,
    RawEndpointData,
};
use renderer::{build_renderer, RenderError, RendererSpec};
use router::{DatasetContext, HybridRouter, RoutingDecision, UserResponse};
use semantic::SemanticRouter;

use crate::config::GeoqueryConfig;
use crate::observe::{observe, Stage};

/// Inbound request.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AnalysisRequest {
    pub query: String,
    #[serde(default)]
    pub dataset_context: Option<DatasetContext>,
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

/// Outbound success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub success: bool,
    pub endpoint: String,
    pub confidence: f64,
    pub routing: RoutingDecision,
    pub records: Vec<ProcessedRecord>,
    pub renderer_spec: RendererSpec,
    pub optimized_payload: PayloadSummary,
    pub summary: String,
    pub reasoning: Vec<String>,
}

/// User-visible failure shape.
#[derive(Debug, Clone, Serialize)]
pub struct UserFacingResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Outbound failure envelope.
#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub success: bool,
    pub user_response: UserFacingResponse,
    pub routing: RoutingDecision,
}

/// Either outcome, serialized flat for the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineResponse {
    Success(Box<SuccessEnvelope>),
    Failure(Box<FailureEnvelope>),
}

impl PipelineResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResponse::Success(_))
    }

    pub fn as_success(&self) -> Option<&SuccessEnvelope> {
        match self {
            PipelineResponse::Success(envelope) => Some(envelope),
            PipelineResponse::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&FailureEnvelope> {
        match self {
            PipelineResponse::Failure(envelope) => Some(envelope),
            PipelineResponse::Success(_) => None,
        }
    }
}

/// Internal error taxonomy; anything recoverable never reaches here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error("raw endpoint data unavailable: {0}")]
    RawDataUnavailable(String),

    #[error("raw endpoint data unreadable: {0}")]
    Parse(String),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("request cancelled: deadline expired")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Abstract source of pre-computed endpoint files. The "how" of delivery
/// is external; the pipeline consumes bytes and parses them.
#[async_trait]
pub trait EndpointDataSource: Send + Sync {
    async fn load(&self, endpoint: &str) -> Result<Vec<u8>, DataSourceError>;
}

#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    #[error("endpoint data not found: {0}")]
    NotFound(String),
    #[error("endpoint data read failed: {0}")]
    Io(String),
}

/// Loads `{root}/{endpoint-id}.json` from disk.
pub struct FileDataSource {
    root: PathBuf,
}

impl FileDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl EndpointDataSource for FileDataSource {
    async fn load(&self, endpoint: &str) -> Result<Vec<u8>, DataSourceError> {
        let file = self
            .root
            .join(format!("{}.json", endpoint.trim_start_matches('/')));
        tokio::task::spawn_blocking(move || std::fs::read(&file))
            .await
            .map_err(|err| DataSourceError::Io(err.to_string()))?
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => DataSourceError::NotFound(endpoint.to_string()),
                _ => DataSourceError::Io(err.to_string()),
            })
    }
}

/// In-memory source for tests and embedded deployments.
#[derive(Default)]
pub struct StaticDataSource {
    by_endpoint: HashMap<String, Vec<u8>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, endpoint: &str, data: &RawEndpointData) -> Self {
        let bytes = serde_json::to_vec(data).expect("raw endpoint data serializes");
        self.by_endpoint.insert(endpoint.to_string(), bytes);
        self
    }
}

#[async_trait]
impl EndpointDataSource for StaticDataSource {
    async fn load(&self, endpoint: &str) -> Result<Vec<u8>, DataSourceError> {
        self.by_endpoint
            .get(endpoint)
            .cloned()
            .ok_or_else(|| DataSourceError::NotFound(endpoint.to_string()))
    }
}

const DEFAULT_DEADLINE_MS: u64 = 30_000;
/// Below this routed confidence a validation failure may retry the
/// next-best alternative endpoint once.
const BORDERLINE_RETRY_CEILING: f64 = 0.7;

pub struct Pipeline {
    authority: Arc<ConfigAuthority>,
    router: HybridRouter,
    registry: ProcessorRegistry,
    resolver: EntityResolver,
    city_lookup: Option<Arc<dyn CityLookup>>,
    data_source: Arc<dyn EndpointDataSource>,
    payload_cfg: PayloadConfig,
    load_deadline: Duration,
    retry_delay: Duration,
}

impl Pipeline {
    /// Assemble the full pipeline from a project configuration. The
    /// semantic layer initializes here (bounded); on failure the pipeline
    /// runs without it.
    pub async fn new(
        config: &GeoqueryConfig,
        data_source: Arc<dyn EndpointDataSource>,
        reference: Arc<dyn GeoReference>,
        city_lookup: Option<Arc<dyn CityLookup>>,
    ) -> Result<Self, PipelineError> {
        let authority = Arc::new(ConfigAuthority::new(config.catalog())?);
        let brand = Arc::new(BrandResolver::new(config.brand_config()));

        let semantic = if config.router.semantic_enabled {
            let layer = SemanticRouter::new(
                config.semantic_config(),
                authority.catalog_fingerprint(),
            );
            match layer.initialize(&routing_texts(&authority)).await {
                Ok(()) => Some(Arc::new(layer)),
                Err(err) => {
                    warn!(error = %err, "semantic layer unavailable; routing without it");
                    None
                }
            }
        } else {
            None
        };

        let router = HybridRouter::new(
            authority.clone(),
            brand.clone(),
            semantic,
            config.router_config(),
        );
        let registry = ProcessorRegistry::with_defaults(brand);
        let resolver = EntityResolver::new(reference)
            .with_lookup_deadline(Duration::from_millis(config.georef.lookup_deadline_ms));

        Ok(Self {
            authority,
            router,
            registry,
            resolver,
            city_lookup,
            data_source,
            payload_cfg: config.payload_config(),
            load_deadline: Duration::from_millis(config.data.load_deadline_ms),
            retry_delay: Duration::from_millis(config.data.retry_delay_ms),
        })
    }

    /// Swap in a new project configuration at runtime. The catalog
    /// replacement is atomic; requests already holding descriptors keep a
    /// consistent view until they finish.
    pub fn reload(&self, config: &GeoqueryConfig) -> Result<(), PipelineError> {
        config
            .validate()
            .map_err(|err| PipelineError::Config(err.to_string()))?;
        self.authority.reload(config.catalog())?;
        Ok(())
    }

    /// Handle one request end to end.
    pub async fn handle(&self, request: AnalysisRequest) -> PipelineResponse {
        let started = Instant::now();
        let deadline = Duration::from_millis(request.deadline_ms.unwrap_or(DEFAULT_DEADLINE_MS));

        let routing_started = Instant::now();
        let routing = self
            .router
            .route(
                &request.query,
                request.dataset_context.as_ref(),
                deadline.saturating_sub(started.elapsed()),
            )
            .await;
        observe(
            Stage::Routing,
            routing_started.elapsed(),
            routing.endpoint.as_deref(),
            None,
        );

        match routing.user_response {
            UserResponse::Reject => {
                return failure_envelope("rejection", &routing, None);
            }
            UserResponse::Clarify => {
                return failure_envelope("clarification", &routing, None);
            }
            UserResponse::Route => {}
        }
        let Some(endpoint) = routing.endpoint.clone() else {
            return failure_envelope(
                "error",
                &routing,
                Some("Routing produced no endpoint.".to_string()),
            );
        };

        // Borderline routes get one shot at the next-best alternative when
        // the chosen endpoint's data fails validation.
        let mut attempts = vec![endpoint.clone()];
        if routing.confidence < BORDERLINE_RETRY_CEILING {
            if let Some(alternative) = routing.alternatives.first() {
                attempts.push(alternative.endpoint.clone());
            }
        }

        let mut last_error: Option<PipelineError> = None;
        for (index, attempt) in attempts.iter().enumerate() {
            match self
                .run_endpoint(&request, &routing, attempt, started, deadline)
                .await
            {
                Ok(envelope) => {
                    if index > 0 {
                        info!(endpoint = %attempt, "alternative endpoint succeeded after validation failure");
                    }
                    return PipelineResponse::Success(Box::new(envelope));
                }
                Err(PipelineError::Processor(ProcessorError::ValidationFailed(reason)))
                    if index + 1 < attempts.len() =>
                {
                    warn!(endpoint = %attempt, reason = %reason, "validation failed; trying alternative");
                    last_error = Some(PipelineError::Processor(
                        ProcessorError::ValidationFailed(reason),
                    ));
                }
                Err(err) => {
                    return failure_from_error(err, &routing);
                }
            }
        }

        failure_from_error(
            last_error.unwrap_or(PipelineError::Config("no endpoint attempts ran".into())),
            &routing,
        )
    }

    async fn run_endpoint(
        &self,
        request: &AnalysisRequest,
        routing: &RoutingDecision,
        endpoint: &str,
        started: Instant,
        deadline: Duration,
    ) -> Result<SuccessEnvelope, PipelineError> {
        let mut reasoning = routing.reasoning.clone();

        let score_config = self.authority.score_config(endpoint)?;
        let descriptor = self.authority.descriptor(endpoint)?;

        // Step 2: load the pre-computed endpoint data (one retry).
        let load_started = Instant::now();
        let raw_bytes = self
            .load_with_retry(endpoint, started, deadline)
            .await
            .map_err(|err| {
                observe(
                    Stage::Load,
                    load_started.elapsed(),
                    Some(endpoint),
                    Some(err.to_string()),
                );
                err
            })?;
        observe(Stage::Load, load_started.elapsed(), Some(endpoint), None);

        let mut raw: RawEndpointData = serde_json::from_slice(&raw_bytes)
            .map_err(|err| PipelineError::Parse(err.to_string()))?;

        // Step 3: geographic filter, fail-open.
        if remaining(started, deadline).is_zero() {
            return Err(PipelineError::Cancelled);
        }
        let geo_started = Instant::now();
        let resolution = self.resolver.resolve(&request.query).await;
        observe(Stage::GeoFilter, geo_started.elapsed(), Some(endpoint), None);
        reasoning.extend(resolution.notes.iter().cloned());
        if let AreaRestriction::Areas(_) = &resolution.restriction {
            let before = raw.results.len();
            raw.results.retain(|record| {
                processors::area_id(record)
                    .map(|id| resolution.restriction.allows(&id))
                    .unwrap_or(false)
            });
            reasoning.push(format!(
                "Geographic filter kept {} of {before} areas",
                raw.results.len()
            ));
        }

        // Step 4: processor dispatch.
        if remaining(started, deadline).is_zero() {
            return Err(PipelineError::Cancelled);
        }
        let process_started = Instant::now();
        let processor = self.registry.get(&score_config.processor_id)?;
        let opts = ProcessOptions {
            city_lookup: self.city_lookup.clone(),
            query: Some(request.query.clone()),
            correlation_fields: None,
        };
        let mut result = processor.process(&raw, &opts).map_err(|err| {
            observe(
                Stage::Process,
                process_started.elapsed(),
                Some(endpoint),
                Some(err.to_string()),
            );
            err
        })?;
        observe(Stage::Process, process_started.elapsed(), Some(endpoint), None);
        if result.skipped_records > 0 {
            reasoning.push(format!(
                "{} raw records skipped during processing",
                result.skipped_records
            ));
        }

        // Step 5: authority override - the canonical score contract.
        apply_score_authority(&mut result, &score_config.target_variable);

        // Step 6: renderer spec.
        let render_started = Instant::now();
        let renderer_spec = build_renderer(
            &result,
            &score_config.target_variable,
            &score_config.renderer,
        )?;
        observe(Stage::Render, render_started.elapsed(), Some(endpoint), None);

        // Step 7: bounded payload.
        let payload_started = Instant::now();
        let optimized_payload = optimize(&result, descriptor.family, &self.payload_cfg)?;
        observe(Stage::Payload, payload_started.elapsed(), Some(endpoint), None);
        reasoning.push(format!(
            "Payload optimized: {} records summarized into {} bytes",
            result.records.len(),
            optimized_payload.serialized_size()
        ));

        Ok(SuccessEnvelope {
            success: true,
            endpoint: endpoint.to_string(),
            confidence: routing.confidence,
            routing: routing.clone(),
            summary: result.summary.clone(),
            records: result.records,
            renderer_spec,
            optimized_payload,
            reasoning,
        })
    }

    async fn load_with_retry(
        &self,
        endpoint: &str,
        started: Instant,
        deadline: Duration,
    ) -> Result<Vec<u8>, PipelineError> {
        let budget = self.load_deadline.min(remaining(started, deadline));
        if budget.is_zero() {
            return Err(PipelineError::Cancelled);
        }
        match timeout(budget, self.data_source.load(endpoint)).await {
            Ok(Ok(bytes)) => return Ok(bytes),
            Ok(Err(err)) => {
                warn!(endpoint = %endpoint, error = %err, "raw data load failed; retrying once");
            }
            Err(_) => return Err(PipelineError::Cancelled),
        }

        // Jittered pause before the single retry.
        let jitter = self.retry_delay.as_millis() as u64 / 2;
        let pause = self.retry_delay + Duration::from_millis(fastrand::u64(0..=jitter.max(1)));
        tokio::time::sleep(pause.min(remaining(started, deadline))).await;

        let budget = self.load_deadline.min(remaining(started, deadline));
        if budget.is_zero() {
            return Err(PipelineError::Cancelled);
        }
        match timeout(budget, self.data_source.load(endpoint)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(err)) => Err(PipelineError::RawDataUnavailable(err.to_string())),
            Err(_) => Err(PipelineError::Cancelled),
        }
    }
}

fn remaining(started: Instant, deadline: Duration) -> Duration {
    deadline.saturating_sub(started.elapsed())
}

/// Texts embedded by the semantic layer: display name, rich description,
/// and the sample queries.
fn routing_texts(authority: &ConfigAuthority) -> Vec<(String, String)> {
    authority
        .descriptors()
        .iter()
        .map(|descriptor| {
            (
                descriptor.id.clone(),
                format!(
                    "{}. {} {}",
                    descriptor.display_name,
                    descriptor.description,
                    descriptor.sample_queries.join(" ")
                ),
            )
        })
        .collect()
}

/// Enforce the score-field contract on a processed result: the authority's
/// target variable overwrites whatever the processor emitted, at the top
/// level and wherever `properties` already carried the name.
fn apply_score_authority(result: &mut ProcessedResult, target_variable: &str) {
    result.target_variable = target_variable.to_string();
    for record in &mut result.records {
        let value = record.value;
        record.set_canonical(target_variable, value);
        if record.properties.contains_key(target_variable) {
            let number = serde_json::Number::from_f64(value)
                .unwrap_or_else(|| serde_json::Number::from(0));
            record
                .properties
                .insert(target_variable.to_string(), Value::Number(number));
        }
    }
}

fn failure_envelope(
    kind: &str,
    routing: &RoutingDecision,
    message_override: Option<String>,
) -> PipelineResponse {
    let message = message_override
        .or_else(|| routing.message.clone())
        .unwrap_or_else(|| "The request could not be completed.".to_string());
    PipelineResponse::Failure(Box::new(FailureEnvelope {
        success: false,
        user_response: UserFacingResponse {
            kind: kind.to_string(),
            message,
            suggestions: routing.suggestions.clone(),
        },
        routing: routing.clone(),
    }))
}

fn failure_from_error(err: PipelineError, routing: &RoutingDecision) -> PipelineResponse {
    let message = match &err {
        PipelineError::RawDataUnavailable(_) => {
            "The data for this analysis is temporarily unavailable. Please try again shortly."
                .to_string()
        }
        PipelineError::Cancelled => {
            "The request was cancelled before it could complete.".to_string()
        }
        _ => format!(
            "Something went wrong while preparing this analysis ({err}). \
             The routing trace below explains how the question was interpreted."
        ),
    };
    warn!(error = %err, "pipeline_failure");
    failure_envelope("error", routing, Some(message))
}
