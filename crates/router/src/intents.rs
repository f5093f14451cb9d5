//! Layer 1 - base intent classification.
//!
//! Fourteen domain-agnostic intent signatures scored by weighted trigger
//! phrases. No endpoint decision is made here; the output is a primary
//! intent plus up to two secondaries that Layer 2 maps onto endpoints.

use authority::{FieldTag, IntentKind, WeightedTerm};

/// One intent's trigger vocabulary.
#[derive(Debug, Clone)]
pub struct IntentSignature {
    pub kind: IntentKind,
    pub triggers: Vec<WeightedTerm>,
    pub context: Vec<WeightedTerm>,
    pub avoid: Vec<String>,
    pub required_tags: Vec<FieldTag>,
    pub optional_tags: Vec<FieldTag>,
}

/// Scored intent.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentScore {
    pub kind: IntentKind,
    pub confidence: f64,
}

/// Layer-1 output: ranked intents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentClassification {
    pub primary: Option<IntentScore>,
    pub secondary: Vec<IntentScore>,
}

impl IntentClassification {
    pub fn confidence_for(&self, kind: IntentKind) -> f64 {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .find(|score| score.kind == kind)
            .map(|score| score.confidence)
            .unwrap_or(0.0)
    }

    /// True when no signature matched at all - one half of the
    /// creative-query signal.
    pub fn is_miss(&self) -> bool {
        self.primary.is_none()
    }
}

fn sig(
    kind: IntentKind,
    triggers: &[(&str, f64)],
    context: &[(&str, f64)],
    avoid: &[&str],
    required_tags: &[FieldTag],
    optional_tags: &[FieldTag],
) -> IntentSignature {
    IntentSignature {
        kind,
        triggers: triggers
            .iter()
            .map(|(t, w)| WeightedTerm::new(*t, *w))
            .collect(),
        context: context
            .iter()
            .map(|(t, w)| WeightedTerm::new(*t, *w))
            .collect(),
        avoid: avoid.iter().map(|s| s.to_string()).collect(),
        required_tags: required_tags.to_vec(),
        optional_tags: optional_tags.to_vec(),
    }
}

/// The fourteen built-in signatures.
pub fn default_signatures() -> Vec<IntentSignature> {
    use FieldTag::*;
    use IntentKind::*;
    vec![
        sig(
            DemographicAnalysis,
            &[
                ("demographic", 3.0),
                ("demographics", 3.0),
                ("population", 2.0),
                ("income", 1.5),
                ("age", 1.2),
                ("household", 1.5),
                ("customer profile", 2.0),
                ("customer", 1.5),
                ("who lives", 2.0),
            ],
            &[("education", 1.0), ("residents", 1.0), ("profile", 1.0)],
            &["model accuracy"],
            &[Demographic],
            &[Geographic],
        ),
        sig(
            CompetitiveAnalysis,
            &[
                ("competitive", 3.0),
                ("competition", 2.5),
                ("competitor", 2.0),
                ("advantage", 1.8),
                ("positioning", 1.8),
                ("compare", 2.0),
            ],
            &[("versus", 1.2), ("against", 1.0), ("landscape", 1.0)],
            &["share difference"],
            &[Brand],
            &[Numeric],
        ),
        sig(
            StrategicAnalysis,
            &[
                ("strategic", 3.0),
                ("expansion", 2.5),
                ("expand", 2.0),
                ("top markets", 2.0),
                ("best markets", 2.0),
                ("invest", 1.5),
                ("opportunity", 1.5),
            ],
            &[("growth", 1.0), ("new locations", 1.5), ("priority", 1.0)],
            &[],
            &[Numeric],
            &[Demographic],
        ),
        sig(
            OutlierDetection,
            &[
                ("outlier", 3.0),
                ("outliers", 3.0),
                ("anomaly", 2.5),
                ("anomalies", 2.5),
                ("anomalous", 2.5),
                ("unusual", 2.0),
            ],
            &[("deviate", 1.5), ("extreme", 1.0), ("stand out", 1.2)],
            &[],
            &[Numeric],
            &[],
        ),
        sig(
            Clustering,
            &[
                ("cluster", 2.5),
                ("clusters", 2.5),
                ("segment", 2.5),
                ("segments", 2.5),
                ("group", 1.5),
                ("similar areas", 2.0),
            ],
            &[("behavior", 1.0), ("alike", 1.0), ("grouping", 1.2)],
            &[],
            &[Numeric],
            &[Geographic],
        ),
        sig(
            Sensitivity,
            &[
                ("sensitivity", 3.0),
                ("sensitive", 2.5),
                ("elasticity", 2.5),
            ],
            &[("input change", 1.5), ("respond to", 1.0)],
            &[],
            &[Numeric],
            &[],
        ),
        sig(
            FeatureImportance,
            &[
                ("feature importance", 3.0),
                ("important factors", 2.5),
                ("matter most", 2.5),
                ("drivers", 2.0),
                ("key variables", 2.0),
            ],
            &[("influence", 1.2), ("contribute", 1.0)],
            &["interaction"],
            &[Numeric],
            &[],
        ),
        sig(
            ModelSelection,
            &[
                ("model", 1.5),
                ("algorithm", 2.0),
                ("algorithms", 2.0),
                ("predict", 2.0),
                ("forecast", 2.0),
                ("accuracy", 1.8),
                ("r-squared", 2.5),
            ],
            &[("machine learning", 1.5), ("xgboost", 1.5), ("best model", 1.5)],
            &[],
            &[Numeric],
            &[],
        ),
        sig(
            Ensemble,
            &[("ensemble", 3.0), ("combined model", 2.5), ("all models", 2.0)],
            &[("blended", 1.2)],
            &["consensus"],
            &[Numeric],
            &[],
        ),
        sig(
            Consensus,
            &[("consensus", 3.0), ("agreement", 2.5), ("models agree", 3.0)],
            &[("agree", 1.0), ("disagree", 1.2)],
            &["ensemble"],
            &[Numeric],
            &[],
        ),
        sig(
            Dimensionality,
            &[
                ("dimensionality", 3.0),
                ("principal component", 3.0),
                ("pca", 2.5),
                ("variance explained", 2.5),
                ("dimensions", 2.0),
            ],
            &[("reduce", 1.0), ("latent", 1.2)],
            &[],
            &[Numeric],
            &[],
        ),
        sig(
            BrandDifference,
            &[
                ("difference", 2.5),
                ("share difference", 3.0),
                ("gap between", 2.5),
                ("market share difference", 3.0),
            ],
            &[("lead", 1.0), ("ahead", 1.0), ("behind", 1.0), ("margin", 1.2)],
            &[],
            &[Brand],
            &[],
        ),
        sig(
            Scenario,
            &[
                ("what if", 3.0),
                ("scenario", 3.0),
                ("what happens if", 3.0),
                ("trend", 2.0),
                ("trending", 3.0),
                ("over time", 2.0),
            ],
            &[("simulate", 1.5), ("projection", 1.2), ("trajectory", 1.2)],
            &[],
            &[Numeric],
            &[Temporal],
        ),
        sig(
            Interactions,
            &[
                ("interaction", 3.0),
                ("interactions", 3.0),
                ("interact", 2.0),
                ("correlation", 2.5),
                ("correlated", 2.5),
                ("relationship between", 2.5),
            ],
            &[("combined effect", 1.5), ("linked", 1.0), ("related", 1.0)],
            &[],
            &[Numeric],
            &[],
        ),
    ]
}

/// Case-folded phrase search with word boundaries on both ends. The
/// haystack must already be lowercase.
pub(crate) fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let needle = phrase.to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        let left_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let right_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        if left_ok && right_ok {
            return true;
        }
        from = end;
    }
    false
}

fn raw_score(lowered: &str, signature: &IntentSignature) -> f64 {
    let mut raw = 0.0;
    for trigger in &signature.triggers {
        if contains_phrase(lowered, &trigger.term) {
            raw += trigger.weight;
        }
    }
    for context in &signature.context {
        if contains_phrase(lowered, &context.term) {
            raw += 0.7 * context.weight;
        }
    }
    for avoid in &signature.avoid {
        if contains_phrase(lowered, avoid) {
            raw -= 1.0;
        }
    }
    raw.max(0.0)
}

/// Squash a raw phrase-weight sum into [0, 1). A single strong trigger
/// (weight 3.0) lands at 0.5; stacked evidence approaches 1.
fn squash(raw: f64) -> f64 {
    raw / (raw + 3.0)
}

const SECONDARY_FLOOR: f64 = 0.15;

/// Score the query against every signature. Deterministic: ties are broken
/// by intent declaration order.
pub fn classify(query: &str, signatures: &[IntentSignature]) -> IntentClassification {
    let lowered = query.to_lowercase();
    let mut scored: Vec<IntentScore> = signatures
        .iter()
        .filter_map(|signature| {
            let raw = raw_score(&lowered, signature);
            (raw > 0.0).then(|| IntentScore {
                kind: signature.kind,
                confidence: squash(raw),
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut iter = scored.into_iter();
    let primary = iter.next();
    let secondary: Vec<IntentScore> = iter
        .filter(|score| score.confidence >= SECONDARY_FLOOR)
        .take(2)
        .collect();

    IntentClassification { primary, secondary }
}
