//! Deterministic keyword fallback router.
//!
//! Last line of defense when the hybrid layers and the semantic verifier
//! both come up empty. Pure weighted keyword arithmetic over the endpoint
//! descriptors' keyword packs; always produces an answer, and the caller
//! applies an absolute minimum score before trusting it.

use std::sync::Arc;

use authority::{EndpointDescriptor, EndpointFamily};

use crate::intents::contains_phrase;

const PRIMARY_FACTOR: f64 = 1.0;
const CONTEXT_FACTOR: f64 = 0.7;
const AVOID_PENALTY: f64 = 1.5;
const INTENT_HINT_BONUS: f64 = 0.5;
const BRAND_CONCORDANCE_BONUS: f64 = 1.0;

/// Phrases that hint at a "rank the areas" question.
const RANKING_HINTS: &[&str] = &["top", "best", "highest", "rank", "ranked"];

/// Fallback result: the winning endpoint and its raw weighted score.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordVerdict {
    pub endpoint: String,
    pub score: f64,
}

fn is_ranking_endpoint(descriptor: &EndpointDescriptor) -> bool {
    descriptor.family == EndpointFamily::Strategic || descriptor.id.contains("ranking")
}

fn is_brand_endpoint(descriptor: &EndpointDescriptor) -> bool {
    matches!(
        descriptor.family,
        EndpointFamily::Competitive | EndpointFamily::Difference
    )
}

fn score_one(lowered: &str, descriptor: &EndpointDescriptor, target_brand_mentioned: bool) -> f64 {
    let mut score = 0.0;
    for keyword in &descriptor.primary_keywords {
        if contains_phrase(lowered, &keyword.term) {
            score += PRIMARY_FACTOR * keyword.weight;
        }
    }
    for keyword in &descriptor.context_keywords {
        if contains_phrase(lowered, &keyword.term) {
            score += CONTEXT_FACTOR * keyword.weight;
        }
    }
    for avoid in &descriptor.avoid_terms {
        if contains_phrase(lowered, avoid) {
            score -= AVOID_PENALTY;
        }
    }
    if is_ranking_endpoint(descriptor)
        && RANKING_HINTS.iter().any(|hint| contains_phrase(lowered, hint))
    {
        score += INTENT_HINT_BONUS;
    }
    if is_brand_endpoint(descriptor) && target_brand_mentioned {
        score += BRAND_CONCORDANCE_BONUS;
    }
    score
}

/// Score every endpoint; ties break to the shorter identifier, then
/// lexicographically. Always returns a verdict when any descriptor exists.
pub fn route(
    query: &str,
    descriptors: &[Arc<EndpointDescriptor>],
    target_brand_mentioned: bool,
) -> Option<KeywordVerdict> {
    let lowered = query.to_lowercase();
    descriptors
        .iter()
        .map(|descriptor| KeywordVerdict {
            endpoint: descriptor.id.clone(),
            score: score_one(&lowered, descriptor, target_brand_mentioned),
        })
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Reversed length comparison: shorter id wins the tie.
                .then_with(|| b.endpoint.len().cmp(&a.endpoint.len()))
                .then_with(|| b.endpoint.cmp(&a.endpoint))
        })
}
