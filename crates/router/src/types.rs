use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Layer-0 scope classification of the incoming query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    InScope,
    OutOfScope,
    Borderline,
    Malformed,
}

/// User-visible shape of the routing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserResponse {
    Route,
    Clarify,
    Reject,
}

/// A runner-up endpoint offered in clarification responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub endpoint: String,
    pub confidence: f64,
}

/// Record of the semantic layer's involvement in a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticVerification {
    pub endpoint: String,
    pub confidence: f64,
    /// Confidence added to the hybrid result (zero on disagreement).
    pub boost: f64,
    pub agrees: bool,
}

/// Wall-clock spent in one router layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTiming {
    pub layer: String,
    pub micros: u64,
}

/// The router's complete output for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub endpoint: Option<String>,
    pub confidence: f64,
    pub scope: Scope,
    pub user_response: UserResponse,
    /// At most three runners-up, best first.
    pub alternatives: Vec<Alternative>,
    /// Ordered execution trace; at least three entries on a routed query.
    pub reasoning: Vec<String>,
    pub layer_timings: Vec<LayerTiming>,
    /// True when Layer 0 rejected before the scoring layers ran.
    pub early_exit: bool,
    pub semantic_verification: Option<SemanticVerification>,
    /// Non-technical message for clarify/reject outcomes.
    pub message: Option<String>,
    pub suggestions: Vec<String>,
}

impl RoutingDecision {
    pub(crate) fn rejection(
        scope: Scope,
        message: String,
        suggestions: Vec<String>,
        reasoning: Vec<String>,
        layer_timings: Vec<LayerTiming>,
    ) -> Self {
        Self {
            endpoint: None,
            confidence: 0.0,
            scope,
            user_response: UserResponse::Reject,
            alternatives: Vec::new(),
            reasoning,
            layer_timings,
            early_exit: true,
            semantic_verification: None,
            message: Some(message),
            suggestions,
        }
    }
}

/// Optional dataset context supplied with a request: the available field
/// names and an example record for type sniffing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetContext {
    pub available_fields: Vec<String>,
    #[serde(default)]
    pub sample_record: Option<Map<String, Value>>,
}
