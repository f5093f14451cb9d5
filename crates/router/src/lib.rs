//! Geoquery Hybrid Router
//!
//! Turns free-text analytical questions into endpoint selections through
//! five strictly sequential layers:
//!
//! 0. **Validation** - reject out-of-scope and malformed queries in
//!    microseconds, before any scoring work.
//! 1. **Intent classification** - fourteen domain-agnostic signatures
//!    scored by weighted trigger phrases.
//! 2. **Vocabulary adaptation** - domain synonym expansion, endpoint
//!    keyword packs, boost and penalty terms.
//! 3. **Context enhancement** - dataset field coverage, bounded to +0.2.
//! 4. **Confidence management** - route / clarify / reject with per-endpoint
//!    threshold overrides and up to three alternatives.
//!
//! The semantic layer is consulted as a verifier for creative or
//! low-confidence queries, and the deterministic keyword scorer backstops
//! everything. Decisions are deterministic for identical input and
//! configuration, and every decision carries an ordered reasoning trace.

mod confidence;
mod context;
mod engine;
mod intents;
mod keyword;
mod types;
mod validation;
mod vocabulary;

pub use confidence::Thresholds;
pub use context::{describe_dataset, DatasetDescriptor};
pub use engine::{HybridRouter, RouterConfig};
pub use intents::{classify, default_signatures, IntentClassification, IntentScore, IntentSignature};
pub use keyword::{route as keyword_route, KeywordVerdict};
pub use types::{
    Alternative, DatasetContext, LayerTiming, RoutingDecision, Scope, SemanticVerification,
    UserResponse,
};
pub use validation::{validate, ScopeAssessment};
pub use vocabulary::{expand_query, score_candidates, CandidateScore, VocabularyOutcome};
