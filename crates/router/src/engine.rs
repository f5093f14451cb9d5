//! The hybrid router: five sequential layers with early exit, semantic
//! verification, and the keyword fallback wired in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, Level};

use authority::ConfigAuthority;
use brand::BrandResolver;
use semantic::SemanticRouter;

use crate::confidence::{decide, Thresholds};
use crate::context::{apply_coverage, describe_dataset};
use crate::intents::{classify, default_signatures, IntentSignature};
use crate::keyword;
use crate::types::{
    Alternative, DatasetContext, LayerTiming, RoutingDecision, Scope, SemanticVerification,
    UserResponse,
};
use crate::validation::{self, default_suggestions};
use crate::vocabulary::{expand_query, score_candidates};

/// Router-wide tunables. Endpoint descriptors may override the route
/// threshold per endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub thresholds: Thresholds,
    /// Below this confidence the semantic verifier is consulted even for a
    /// routed decision.
    pub verification_threshold: f64,
    /// Minimum semantic confidence for last-resort semantic routing.
    pub semantic_floor: f64,
    /// Absolute minimum keyword-fallback score; below it the query is
    /// rejected rather than guessed at.
    pub keyword_floor: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            verification_threshold: 0.75,
            semantic_floor: 0.5,
            keyword_floor: 1.0,
        }
    }
}

/// Maximum confidence the semantic verifier may add on agreement.
const MAX_SEMANTIC_BOOST: f64 = 0.2;
const SEMANTIC_BOOST_FACTOR: f64 = 0.3;
/// A disagreeing semantic verdict must beat the hybrid result by this much
/// to be recorded as an alternative.
const MATERIAL_DISAGREEMENT: f64 = 0.15;

pub struct HybridRouter {
    authority: Arc<ConfigAuthority>,
    brand: Arc<BrandResolver>,
    semantic: Option<Arc<SemanticRouter>>,
    signatures: Vec<IntentSignature>,
    cfg: RouterConfig,
}

impl HybridRouter {
    pub fn new(
        authority: Arc<ConfigAuthority>,
        brand: Arc<BrandResolver>,
        semantic: Option<Arc<SemanticRouter>>,
        cfg: RouterConfig,
    ) -> Self {
        Self {
            authority,
            brand,
            semantic,
            signatures: default_signatures(),
            cfg,
        }
    }

    /// Route one query. `deadline` bounds only the semantic suspension
    /// point; the lexical layers are microsecond-scale.
    pub async fn route(
        &self,
        query: &str,
        dataset: Option<&DatasetContext>,
        deadline: Duration,
    ) -> RoutingDecision {
        let started = Instant::now();
        let span = tracing::span!(Level::INFO, "router.route");
        let _guard = span.enter();

        let mut reasoning: Vec<String> = Vec::new();
        let mut timings: Vec<LayerTiming> = Vec::new();

        // Layer 0 - validation.
        let layer_started = Instant::now();
        let assessment = validation::validate(query);
        timings.push(timing("validation", layer_started));
        match assessment.scope {
            Scope::OutOfScope | Scope::Malformed => {
                reasoning.push(format!(
                    "Layer 0: query classified {}; early exit",
                    scope_label(assessment.scope)
                ));
                info!(scope = scope_label(assessment.scope), "query_rejected");
                return RoutingDecision::rejection(
                    assessment.scope,
                    assessment
                        .message
                        .unwrap_or_else(|| "This question is outside the supported scope.".into()),
                    assessment.suggestions,
                    reasoning,
                    timings,
                );
            }
            Scope::Borderline => {
                reasoning.push("Layer 0: query is borderline; continuing with caution".into());
            }
            Scope::InScope => {
                reasoning.push("Layer 0: query in scope".into());
            }
        }
        let scope = assessment.scope;

        // Layer 1 - base intent classification on the raw query.
        let layer_started = Instant::now();
        let raw_intents = classify(query, &self.signatures);
        timings.push(timing("intent", layer_started));
        match &raw_intents.primary {
            Some(primary) => reasoning.push(format!(
                "Layer 1: primary intent {} ({:.2})",
                primary.kind.as_str(),
                primary.confidence
            )),
            None => reasoning.push("Layer 1: no intent signature matched".into()),
        }

        // Layer 2 - domain vocabulary adaptation and candidate scoring.
        let layer_started = Instant::now();
        let expanded = expand_query(query);
        let intents = classify(&expanded, &self.signatures);
        let descriptors = self.authority.descriptors();
        let mentioned = self.brand.mentioned_brands(query);
        let mut outcome =
            score_candidates(&expanded, &intents, &descriptors, mentioned.len());
        timings.push(timing("vocabulary", layer_started));
        if let Some(top) = outcome.candidates.first() {
            reasoning.push(format!(
                "Layer 2: domain relevance {:.2}; leading candidate {} ({:.2})",
                outcome.domain_relevance, top.endpoint, top.confidence
            ));
        }

        // Layer 3 - context enhancement from the dataset descriptor.
        let layer_started = Instant::now();
        match dataset {
            Some(context) if !context.available_fields.is_empty() => {
                let descriptor = describe_dataset(context);
                let coverage =
                    apply_coverage(&mut outcome.candidates, &descriptor, &descriptors);
                reasoning.push(format!(
                    "Layer 3: field coverage {coverage:.2} across {} fields",
                    descriptor.field_count
                ));
            }
            _ => reasoning.push("Layer 3: no dataset context supplied; skipped".into()),
        }
        timings.push(timing("context", layer_started));

        // Layer 4 - confidence management.
        let layer_started = Instant::now();
        let mut decision = decide(&outcome.candidates, &descriptors, &self.cfg.thresholds);
        timings.push(timing("confidence", layer_started));
        reasoning.push(format!(
            "Layer 4: {} {} at {:.2} (threshold {:.2})",
            action_label(decision.action),
            decision.endpoint.as_deref().unwrap_or("nothing"),
            decision.confidence,
            decision.threshold
        ));

        // The span guard cannot be held across the semantic await; the
        // remaining work logs through plain events.
        drop(_guard);

        // Semantic verification: creative queries and sub-threshold
        // confidence both trigger it.
        let creative = raw_intents.is_miss() && outcome.keyword_miss;
        let mut semantic_verification = None;
        let mut semantic_verdict = None;
        if creative {
            reasoning.push("Query looks creative (no signature or keyword match)".into());
        }
        if let Some(semantic) = &self.semantic {
            let needs_verification =
                creative || decision.confidence < self.cfg.verification_threshold;
            if needs_verification {
                let layer_started = Instant::now();
                let remaining = deadline.saturating_sub(started.elapsed());
                match semantic.verify(query, remaining).await {
                    Ok(verdict) => {
                        let agrees = decision.endpoint.as_deref() == Some(verdict.endpoint.as_str());
                        if agrees {
                            let boost = (SEMANTIC_BOOST_FACTOR * verdict.confidence)
                                .min(MAX_SEMANTIC_BOOST);
                            decision.confidence = (decision.confidence + boost).min(1.0);
                            reasoning.push(format!(
                                "Semantic router agrees ({}, {:.2}); confidence +{boost:.2}",
                                verdict.endpoint, verdict.confidence
                            ));
                            semantic_verification = Some(SemanticVerification {
                                endpoint: verdict.endpoint.clone(),
                                confidence: verdict.confidence,
                                boost,
                                agrees: true,
                            });
                            if decision.action == UserResponse::Clarify
                                && decision.confidence >= decision.threshold
                            {
                                decision.action = UserResponse::Route;
                                reasoning
                                    .push("Semantic boost lifted confidence above threshold".into());
                            }
                        } else {
                            if verdict.confidence
                                > decision.confidence + MATERIAL_DISAGREEMENT
                            {
                                reasoning.push(format!(
                                    "Semantic router prefers {} ({:.2}); recorded as alternative",
                                    verdict.endpoint, verdict.confidence
                                ));
                                push_alternative(
                                    &mut decision.alternatives,
                                    Alternative {
                                        endpoint: verdict.endpoint.clone(),
                                        confidence: verdict.confidence,
                                    },
                                );
                            } else {
                                reasoning.push(format!(
                                    "Semantic router disagrees ({}, {:.2}); keeping hybrid result",
                                    verdict.endpoint, verdict.confidence
                                ));
                            }
                            semantic_verification = Some(SemanticVerification {
                                endpoint: verdict.endpoint.clone(),
                                confidence: verdict.confidence,
                                boost: 0.0,
                                agrees: false,
                            });
                        }
                        semantic_verdict = Some(verdict);
                    }
                    Err(err) => {
                        debug!(error = %err, "semantic verification unavailable");
                        reasoning
                            .push(format!("Semantic verification unavailable ({err}); skipped"));
                    }
                }
                timings.push(timing("semantic", layer_started));
            }
        }

        // Last resorts for an in-scope query the layers could not place.
        if decision.action == UserResponse::Reject {
            if let Some(verdict) = &semantic_verdict {
                if verdict.confidence >= self.cfg.semantic_floor {
                    reasoning.push(format!(
                        "Semantic last-resort route to {} ({:.2})",
                        verdict.endpoint, verdict.confidence
                    ));
                    decision.action = UserResponse::Route;
                    decision.endpoint = Some(verdict.endpoint.clone());
                    decision.confidence = verdict.confidence;
                }
            }
        }
        if decision.action == UserResponse::Reject {
            let target_mentioned = mentioned.iter().any(|b| b.name == self.brand.target_brand_name());
            if let Some(verdict) = keyword::route(query, &descriptors, target_mentioned) {
                if verdict.score >= self.cfg.keyword_floor {
                    let confidence = verdict.score / (verdict.score + 5.0);
                    reasoning.push(format!(
                        "Keyword fallback selected {} (score {:.1})",
                        verdict.endpoint, verdict.score
                    ));
                    decision.action = UserResponse::Route;
                    decision.endpoint = Some(verdict.endpoint);
                    decision.confidence = confidence.max(decision.confidence);
                }
            }
        }

        let (message, suggestions) = match decision.action {
            UserResponse::Route => (None, Vec::new()),
            UserResponse::Clarify => (
                Some(
                    "I can read that question a few different ways - which analysis did you mean?"
                        .to_string(),
                ),
                self.clarify_suggestions(&decision.endpoint, &decision.alternatives),
            ),
            UserResponse::Reject => (
                Some(
                    "I couldn't match that question to any of the available analyses."
                        .to_string(),
                ),
                default_suggestions(),
            ),
        };

        info!(
            endpoint = decision.endpoint.as_deref().unwrap_or(""),
            confidence = decision.confidence,
            action = action_label(decision.action),
            elapsed_micros = started.elapsed().as_micros() as u64,
            "query_routed"
        );

        RoutingDecision {
            endpoint: decision.endpoint,
            confidence: decision.confidence,
            scope,
            user_response: decision.action,
            alternatives: decision.alternatives,
            reasoning,
            layer_timings: timings,
            early_exit: false,
            semantic_verification,
            message,
            suggestions,
        }
    }

    fn clarify_suggestions(
        &self,
        top: &Option<String>,
        alternatives: &[Alternative],
    ) -> Vec<String> {
        let mut suggestions = Vec::new();
        for endpoint in top.iter().chain(alternatives.iter().map(|a| &a.endpoint)) {
            if let Ok(descriptor) = self.authority.descriptor(endpoint) {
                if let Some(sample) = descriptor.sample_queries.first() {
                    suggestions.push(format!("{} - e.g. \"{sample}\"", descriptor.display_name));
                }
            }
            if suggestions.len() == 3 {
                break;
            }
        }
        if suggestions.is_empty() {
            suggestions = default_suggestions();
        }
        suggestions
    }
}

fn push_alternative(alternatives: &mut Vec<Alternative>, alternative: Alternative) {
    if alternatives.iter().any(|a| a.endpoint == alternative.endpoint) {
        return;
    }
    alternatives.insert(0, alternative);
    alternatives.truncate(3);
}

fn timing(layer: &str, started: Instant) -> LayerTiming {
    LayerTiming {
        layer: layer.to_string(),
        micros: started.elapsed().as_micros() as u64,
    }
}

fn scope_label(scope: Scope) -> &'static str {
    match scope {
        Scope::InScope => "in scope",
        Scope::OutOfScope => "out of scope",
        Scope::Borderline => "borderline",
        Scope::Malformed => "malformed",
    }
}

fn action_label(action: UserResponse) -> &'static str {
    match action {
        UserResponse::Route => "route",
        UserResponse::Clarify => "clarify",
        UserResponse::Reject => "reject",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic::SemanticConfig;

    fn authority() -> Arc<ConfigAuthority> {
        Arc::new(ConfigAuthority::with_defaults())
    }

    async fn semantic_layer(authority: &ConfigAuthority) -> Arc<SemanticRouter> {
        let layer = SemanticRouter::new(SemanticConfig::stub(), authority.catalog_fingerprint());
        let entries: Vec<(String, String)> = authority
            .descriptors()
            .iter()
            .map(|d| {
                (
                    d.id.clone(),
                    format!(
                        "{}. {} {}",
                        d.display_name,
                        d.description,
                        d.sample_queries.join(" ")
                    ),
                )
            })
            .collect();
        layer.initialize(&entries).await.unwrap();
        Arc::new(layer)
    }

    fn hybrid(authority: Arc<ConfigAuthority>, semantic: Option<Arc<SemanticRouter>>) -> HybridRouter {
        HybridRouter::new(
            authority,
            Arc::new(BrandResolver::with_defaults()),
            semantic,
            RouterConfig::default(),
        )
    }

    #[tokio::test]
    async fn strategic_query_routes_with_confidence() {
        let router = hybrid(authority(), None);
        let decision = router
            .route(
                "Show me the top strategic markets for H&R Block tax service expansion",
                None,
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(decision.user_response, UserResponse::Route);
        assert_eq!(decision.endpoint.as_deref(), Some("/strategic-analysis"));
        assert!(decision.confidence >= 0.6, "{}", decision.confidence);
        assert!(decision.reasoning.len() >= 3);
    }

    #[tokio::test]
    async fn weather_query_early_exits() {
        let router = hybrid(authority(), None);
        let decision = router
            .route(
                "What's the weather forecast for tomorrow?",
                None,
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(decision.scope, Scope::OutOfScope);
        assert_eq!(decision.user_response, UserResponse::Reject);
        assert!(decision.early_exit);
        assert!(decision.message.unwrap().contains("weather"));
        assert!(!decision.suggestions.is_empty());
    }

    #[tokio::test]
    async fn semantic_agreement_boosts_confidence() {
        let authority = authority();
        let semantic = semantic_layer(&authority).await;
        let router = hybrid(authority, Some(semantic));
        let decision = router
            .route(
                "Paint me a picture of segment behavior",
                None,
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(decision.endpoint.as_deref(), Some("/segment-profiling"));
        let verification = decision.semantic_verification.expect("verifier consulted");
        assert!(verification.agrees);
        assert!(verification.boost > 0.0 && verification.boost <= 0.2);
        assert!(decision
            .reasoning
            .iter()
            .any(|note| note.contains("Semantic router agrees")));
    }

    #[tokio::test]
    async fn routing_is_deterministic() {
        let router = hybrid(authority(), None);
        let query = "Which markets are statistical outliers?";
        let a = router.route(query, None, Duration::from_millis(100)).await;
        let b = router.route(query, None, Duration::from_millis(100)).await;
        assert_eq!(a.endpoint, b.endpoint);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.user_response, b.user_response);
    }

    #[tokio::test]
    async fn dataset_context_boosts_coverage() {
        let router = hybrid(authority(), None);
        let context = DatasetContext {
            available_fields: vec![
                "median_income".into(),
                "hr_block_market_share".into(),
                "zip".into(),
            ],
            sample_record: None,
        };
        let query = "Where do we have the strongest competitive position?";
        let without = router.route(query, None, Duration::from_millis(100)).await;
        let with = router
            .route(query, Some(&context), Duration::from_millis(100))
            .await;
        assert!(with.confidence > without.confidence);
    }

    #[tokio::test]
    async fn alternatives_capped_at_three() {
        let router = hybrid(authority(), None);
        let decision = router
            .route(
                "analysis of markets and data",
                None,
                Duration::from_millis(100),
            )
            .await;
        assert!(decision.alternatives.len() <= 3);
    }
}
