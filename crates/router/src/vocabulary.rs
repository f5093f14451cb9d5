//! Layer 2 - domain vocabulary adaptation.
//!
//! Expands the query with domain synonyms, re-scores intents on the
//! expanded text, and maps intent evidence plus endpoint keyword packs into
//! per-endpoint candidate confidences. Boost terms are additive, penalty
//! terms subtractive, both bounded so keyword stuffing cannot dominate.

use std::collections::HashSet;
use std::sync::Arc;

use authority::{EndpointDescriptor, EndpointFamily};

use crate::intents::{contains_phrase, IntentClassification};

/// Domain phrase → vocabulary appended to the expanded query.
const SYNONYMS: &[(&str, &str)] = &[
    ("where should we open", "expansion strategic"),
    ("best areas", "top markets"),
    ("best neighborhoods", "top markets"),
    ("penetration", "market share"),
    ("stores", "locations"),
    ("customers", "demographic customer"),
    ("shoppers", "customer demographic"),
    ("head to head", "compare"),
    ("delta", "difference"),
    ("stack up", "compare positioning"),
    ("hot spots", "cluster"),
    ("weird", "unusual outlier"),
    ("strange", "unusual outlier"),
    ("drivers of", "feature importance"),
    ("what matters", "important factors"),
];

const BOOST_STEP: f64 = 0.05;
const PENALTY_STEP: f64 = 0.07;
const MAX_TERM_HITS: usize = 3;
const INTENT_WEIGHT: f64 = 0.55;
const KEYWORD_WEIGHT: f64 = 0.45;
/// Extra confidence for brand-oriented endpoints when the query names
/// configured brands: one mention is weak evidence, two or more strong.
const ONE_BRAND_BOOST: f64 = 0.04;
const TWO_BRAND_BOOST: f64 = 0.08;

/// One endpoint's Layer-2 score with its components kept for reasoning.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub endpoint: String,
    pub confidence: f64,
    pub intent_component: f64,
    pub keyword_component: f64,
    pub boost: f64,
    pub penalty: f64,
}

/// Layer-2 output.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyOutcome {
    pub expanded_query: String,
    /// Fraction of meaningful query tokens recognized as domain vocabulary.
    pub domain_relevance: f64,
    /// Candidates sorted best-first; deterministic tie-break by id.
    pub candidates: Vec<CandidateScore>,
    /// True when no endpoint keyword matched at all - the second half of
    /// the creative-query signal.
    pub keyword_miss: bool,
}

/// Append synonym expansions so downstream phrase matching sees both the
/// user's wording and the canonical domain terms.
pub fn expand_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let mut expanded = lowered.clone();
    for (phrase, expansion) in SYNONYMS {
        if contains_phrase(&lowered, phrase) {
            expanded.push(' ');
            expanded.push_str(expansion);
        }
    }
    expanded
}

fn keyword_raw(expanded: &str, descriptor: &EndpointDescriptor) -> f64 {
    let mut raw = 0.0;
    for keyword in &descriptor.primary_keywords {
        if contains_phrase(expanded, &keyword.term) {
            raw += keyword.weight;
        }
    }
    for keyword in &descriptor.context_keywords {
        if contains_phrase(expanded, &keyword.term) {
            raw += 0.7 * keyword.weight;
        }
    }
    raw
}

fn squash(raw: f64) -> f64 {
    raw / (raw + 3.0)
}

fn term_hits(expanded: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .filter(|term| contains_phrase(expanded, term))
        .count()
        .min(MAX_TERM_HITS)
}

fn brand_boost(descriptor: &EndpointDescriptor, mentioned_brands: usize) -> f64 {
    let brand_family = matches!(
        descriptor.family,
        EndpointFamily::Competitive | EndpointFamily::Difference
    );
    if !brand_family {
        return 0.0;
    }
    match mentioned_brands {
        0 => 0.0,
        1 => ONE_BRAND_BOOST,
        _ => TWO_BRAND_BOOST,
    }
}

/// Score every endpoint against the expanded query.
pub fn score_candidates(
    expanded: &str,
    intents: &IntentClassification,
    descriptors: &[Arc<EndpointDescriptor>],
    mentioned_brands: usize,
) -> VocabularyOutcome {
    let mut candidates = Vec::with_capacity(descriptors.len());
    let mut any_keyword_hit = false;

    for descriptor in descriptors {
        let raw = keyword_raw(expanded, descriptor);
        if raw > 0.0 {
            any_keyword_hit = true;
        }
        let keyword_component = squash(raw);
        let intent_component = intents.confidence_for(descriptor.intent);
        let boost = BOOST_STEP * term_hits(expanded, &descriptor.boost_terms) as f64
            + brand_boost(descriptor, mentioned_brands);
        let penalty = PENALTY_STEP * term_hits(expanded, &descriptor.penalty_terms) as f64;

        let confidence = (INTENT_WEIGHT * intent_component + KEYWORD_WEIGHT * keyword_component
            + boost
            - penalty)
            .clamp(0.0, 1.0);

        candidates.push(CandidateScore {
            endpoint: descriptor.id.clone(),
            confidence,
            intent_component,
            keyword_component,
            boost,
            penalty,
        });
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.endpoint.len().cmp(&b.endpoint.len()))
            .then_with(|| a.endpoint.cmp(&b.endpoint))
    });

    VocabularyOutcome {
        domain_relevance: domain_relevance(expanded, descriptors),
        expanded_query: expanded.to_string(),
        candidates,
        keyword_miss: !any_keyword_hit,
    }
}

/// Share of meaningful tokens that appear in any endpoint's vocabulary.
fn domain_relevance(expanded: &str, descriptors: &[Arc<EndpointDescriptor>]) -> f64 {
    let mut vocabulary: HashSet<&str> = HashSet::new();
    for descriptor in descriptors {
        for keyword in descriptor
            .primary_keywords
            .iter()
            .chain(descriptor.context_keywords.iter())
        {
            vocabulary.extend(keyword.term.split_whitespace());
        }
    }

    let tokens: Vec<&str> = expanded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens
        .iter()
        .filter(|token| vocabulary.contains(**token))
        .count();
    matched as f64 / tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intents::{classify, default_signatures};
    use authority::default_catalog;

    fn descriptors() -> Vec<Arc<EndpointDescriptor>> {
        default_catalog().into_iter().map(Arc::new).collect()
    }

    fn run(query: &str, mentioned: usize) -> VocabularyOutcome {
        let expanded = expand_query(query);
        let intents = classify(&expanded, &default_signatures());
        score_candidates(&expanded, &intents, &descriptors(), mentioned)
    }

    #[test]
    fn expansion_appends_domain_terms() {
        let expanded = expand_query("Where should we open new stores?");
        assert!(expanded.contains("expansion strategic"));
        assert!(expanded.contains("locations"));
    }

    #[test]
    fn strategic_query_ranks_strategic_first() {
        let outcome = run("Show me the top strategic markets for expansion", 0);
        assert_eq!(outcome.candidates[0].endpoint, "/strategic-analysis");
        assert!(outcome.candidates[0].confidence >= 0.6);
    }

    #[test]
    fn synonym_expansion_routes_colloquial_query() {
        let outcome = run("Where should we open new stores?", 0);
        assert_eq!(outcome.candidates[0].endpoint, "/strategic-analysis");
    }

    #[test]
    fn share_difference_beats_competitive_via_penalty() {
        let outcome = run("Show me the market share difference between the brands", 2);
        assert_eq!(outcome.candidates[0].endpoint, "/brand-difference");
        let competitive = outcome
            .candidates
            .iter()
            .find(|c| c.endpoint == "/competitive-analysis")
            .unwrap();
        assert!(competitive.penalty > 0.0);
    }

    #[test]
    fn keyword_miss_flagged_for_novel_wording() {
        let outcome = run("paint the town in vivid colors", 0);
        assert!(outcome.keyword_miss);
        assert!(outcome.domain_relevance < 0.3);
    }

    #[test]
    fn domain_relevance_high_for_market_query() {
        let outcome = run("market share analysis by demographic segment", 0);
        assert!(outcome.domain_relevance > 0.5);
    }

    #[test]
    fn candidate_order_is_deterministic() {
        let a = run("compare the markets", 0);
        let b = run("compare the markets", 0);
        let ids_a: Vec<_> = a.candidates.iter().map(|c| &c.endpoint).collect();
        let ids_b: Vec<_> = b.candidates.iter().map(|c| &c.endpoint).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn brand_mentions_boost_brand_family_only() {
        let with = run("market share difference between the two brands", 2);
        let without = run("market share difference between the two brands", 0);
        let diff_with = with
            .candidates
            .iter()
            .find(|c| c.endpoint == "/brand-difference")
            .unwrap();
        let diff_without = without
            .candidates
            .iter()
            .find(|c| c.endpoint == "/brand-difference")
            .unwrap();
        assert!(diff_with.confidence > diff_without.confidence);

        let strategic_with = with
            .candidates
            .iter()
            .find(|c| c.endpoint == "/strategic-analysis")
            .unwrap();
        let strategic_without = without
            .candidates
            .iter()
            .find(|c| c.endpoint == "/strategic-analysis")
            .unwrap();
        assert_eq!(strategic_with.confidence, strategic_without.confidence);
    }
}
