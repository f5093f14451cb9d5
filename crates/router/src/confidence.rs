//! Layer 4 - confidence management.
//!
//! Turns the ranked candidate list into a recommended action: route when
//! the winner clears its threshold, clarify inside the clarify band with up
//! to three alternatives, reject below it. Thresholds are per-endpoint
//! overridable through the catalog.

use std::sync::Arc;

use authority::EndpointDescriptor;

use crate::types::{Alternative, UserResponse};
use crate::vocabulary::CandidateScore;

/// Router-level thresholds; endpoint descriptors may override the route
/// threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub route: f64,
    pub clarify_floor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            route: 0.55,
            clarify_floor: 0.35,
        }
    }
}

/// Layer-4 output.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceDecision {
    pub action: UserResponse,
    pub endpoint: Option<String>,
    pub confidence: f64,
    pub alternatives: Vec<Alternative>,
    /// The route threshold actually applied (after endpoint override).
    pub threshold: f64,
}

const MAX_ALTERNATIVES: usize = 3;

pub fn decide(
    candidates: &[CandidateScore],
    descriptors: &[Arc<EndpointDescriptor>],
    thresholds: &Thresholds,
) -> ConfidenceDecision {
    let Some(top) = candidates.first() else {
        return ConfidenceDecision {
            action: UserResponse::Reject,
            endpoint: None,
            confidence: 0.0,
            alternatives: Vec::new(),
            threshold: thresholds.route,
        };
    };

    let route_threshold = descriptors
        .iter()
        .find(|d| d.id == top.endpoint)
        .and_then(|d| d.confidence_threshold)
        .unwrap_or(thresholds.route);

    let alternatives: Vec<Alternative> = candidates
        .iter()
        .skip(1)
        .filter(|c| c.confidence > 0.0)
        .take(MAX_ALTERNATIVES)
        .map(|c| Alternative {
            endpoint: c.endpoint.clone(),
            confidence: c.confidence,
        })
        .collect();

    let action = if top.confidence >= route_threshold {
        UserResponse::Route
    } else if top.confidence >= thresholds.clarify_floor {
        UserResponse::Clarify
    } else {
        UserResponse::Reject
    };

    ConfidenceDecision {
        action,
        endpoint: Some(top.endpoint.clone()),
        confidence: top.confidence,
        alternatives,
        threshold: route_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(endpoint: &str, confidence: f64) -> CandidateScore {
        CandidateScore {
            endpoint: endpoint.into(),
            confidence,
            intent_component: confidence,
            keyword_component: confidence,
            boost: 0.0,
            penalty: 0.0,
        }
    }

    fn catalog() -> Vec<Arc<EndpointDescriptor>> {
        authority::default_catalog().into_iter().map(Arc::new).collect()
    }

    #[test]
    fn high_confidence_routes() {
        let decision = decide(
            &[candidate("/strategic-analysis", 0.7)],
            &catalog(),
            &Thresholds::default(),
        );
        assert_eq!(decision.action, UserResponse::Route);
        assert_eq!(decision.endpoint.as_deref(), Some("/strategic-analysis"));
    }

    #[test]
    fn clarify_band_offers_alternatives() {
        let decision = decide(
            &[
                candidate("/strategic-analysis", 0.45),
                candidate("/demographic-insights", 0.40),
                candidate("/competitive-analysis", 0.38),
                candidate("/analyze", 0.30),
                candidate("/trend-analysis", 0.28),
            ],
            &catalog(),
            &Thresholds::default(),
        );
        assert_eq!(decision.action, UserResponse::Clarify);
        assert_eq!(decision.alternatives.len(), 3);
        assert_eq!(decision.alternatives[0].endpoint, "/demographic-insights");
    }

    #[test]
    fn below_clarify_floor_rejects() {
        let decision = decide(
            &[candidate("/analyze", 0.2)],
            &catalog(),
            &Thresholds::default(),
        );
        assert_eq!(decision.action, UserResponse::Reject);
    }

    #[test]
    fn endpoint_override_lowers_bar() {
        // /analyze carries a 0.45 threshold override in the catalog.
        let decision = decide(
            &[candidate("/analyze", 0.5)],
            &catalog(),
            &Thresholds::default(),
        );
        assert_eq!(decision.threshold, 0.45);
        assert_eq!(decision.action, UserResponse::Route);
    }

    #[test]
    fn empty_candidates_reject() {
        let decision = decide(&[], &catalog(), &Thresholds::default());
        assert_eq!(decision.action, UserResponse::Reject);
        assert!(decision.endpoint.is_none());
    }
}
