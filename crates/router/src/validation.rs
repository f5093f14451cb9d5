//! Layer 0 - query validation.
//!
//! Cheap lexical screening that rejects out-of-scope and malformed queries
//! before any scoring work happens. Rejections carry a human-readable
//! message and at least one suggestion pointing back to market analysis.

use crate::types::Scope;

/// Outcome of Layer 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeAssessment {
    pub scope: Scope,
    pub message: Option<String>,
    pub suggestions: Vec<String>,
}

const OUT_OF_SCOPE_TOPICS: &[(&str, &[&str])] = &[
    (
        "weather",
        &["weather", "forecast for tomorrow", "temperature today", "rain", "snow", "hurricane"],
    ),
    (
        "cooking",
        &["recipe", "how do i cook", "how to bake", "ingredients for", "dinner ideas"],
    ),
    (
        "tech support",
        &[
            "fix my computer",
            "reset my password",
            "wifi not working",
            "printer",
            "blue screen",
            "install windows",
        ],
    ),
    (
        "entertainment",
        &[
            "movie",
            "song",
            "celebrity",
            "who won the oscar",
            "tv show",
            "lyrics",
        ],
    ),
    (
        "small talk",
        &[
            "how are you",
            "tell me a joke",
            "what is your name",
            "good morning",
            "thank you",
        ],
    ),
];

/// Words that signal an analytical question even when the rest is vague.
const ANALYTICAL_HINTS: &[&str] = &[
    "market", "analysis", "analyze", "score", "rank", "compare", "brand", "share", "demographic",
    "customer", "segment", "area", "region", "zip", "county", "expansion", "competitive", "trend",
    "predict", "cluster", "outlier", "model", "insight", "data",
];

pub fn default_suggestions() -> Vec<String> {
    vec![
        "Try asking about market analysis, for example: \"Show me the top strategic markets for expansion\"".to_string(),
        "Ask about brand performance, for example: \"Where is our market share strongest?\"".to_string(),
    ]
}

/// Classify the query's scope. Runs in microseconds; no allocation beyond
/// one lowercase copy.
pub fn validate(query: &str) -> ScopeAssessment {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return malformed("The query is empty.");
    }
    if !trimmed.chars().any(|c| c.is_alphabetic()) {
        return malformed("The query contains no words.");
    }
    if trimmed.len() < 2 {
        return malformed("The query is too short to interpret.");
    }

    let lowered = trimmed.to_lowercase();

    for (topic, phrases) in OUT_OF_SCOPE_TOPICS {
        if phrases.iter().any(|phrase| lowered.contains(phrase)) {
            // A phrase hit is only disqualifying when nothing analytical
            // appears alongside it ("movie theater market share" stays in).
            let has_analytical = ANALYTICAL_HINTS.iter().any(|hint| lowered.contains(hint));
            if !has_analytical {
                return ScopeAssessment {
                    scope: Scope::OutOfScope,
                    message: Some(format!(
                        "Questions about {topic} aren't supported here - this assistant answers \
                         questions about your geographic market data."
                    )),
                    suggestions: default_suggestions(),
                };
            }
        }
    }

    let word_count = lowered.split_whitespace().count();
    let has_analytical = ANALYTICAL_HINTS.iter().any(|hint| lowered.contains(hint));
    if word_count <= 2 && !has_analytical {
        return ScopeAssessment {
            scope: Scope::Borderline,
            message: None,
            suggestions: Vec::new(),
        };
    }

    ScopeAssessment {
        scope: Scope::InScope,
        message: None,
        suggestions: Vec::new(),
    }
}

fn malformed(reason: &str) -> ScopeAssessment {
    ScopeAssessment {
        scope: Scope::Malformed,
        message: Some(format!(
            "{reason} Please ask a question about your market data."
        )),
        suggestions: default_suggestions(),
    }
}
