use serde::{Deserialize, Serialize};

/// A keyword or phrase with a routing weight.
///
/// Weights express how strongly the term indicates its endpoint: 1.0 is a
/// common signal, 2.0 a strong one, 3.0 near-definitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

impl WeightedTerm {
    pub fn new(term: impl Into<String>, weight: f64) -> Self {
        Self {
            term: term.into(),
            weight,
        }
    }
}

/// Domain-agnostic analytical intents recognized by the router's Layer 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    DemographicAnalysis,
    CompetitiveAnalysis,
    StrategicAnalysis,
    OutlierDetection,
    Clustering,
    Sensitivity,
    FeatureImportance,
    ModelSelection,
    Ensemble,
    Consensus,
    Dimensionality,
    BrandDifference,
    Scenario,
    Interactions,
}

impl IntentKind {
    /// All fourteen intents, in declaration order.
    pub const ALL: [IntentKind; 14] = [
        IntentKind::DemographicAnalysis,
        IntentKind::CompetitiveAnalysis,
        IntentKind::StrategicAnalysis,
        IntentKind::OutlierDetection,
        IntentKind::Clustering,
        IntentKind::Sensitivity,
        IntentKind::FeatureImportance,
        IntentKind::ModelSelection,
        IntentKind::Ensemble,
        IntentKind::Consensus,
        IntentKind::Dimensionality,
        IntentKind::BrandDifference,
        IntentKind::Scenario,
        IntentKind::Interactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::DemographicAnalysis => "demographic_analysis",
            IntentKind::CompetitiveAnalysis => "competitive_analysis",
            IntentKind::StrategicAnalysis => "strategic_analysis",
            IntentKind::OutlierDetection => "outlier_detection",
            IntentKind::Clustering => "clustering",
            IntentKind::Sensitivity => "sensitivity",
            IntentKind::FeatureImportance => "feature_importance",
            IntentKind::ModelSelection => "model_selection",
            IntentKind::Ensemble => "ensemble",
            IntentKind::Consensus => "consensus",
            IntentKind::Dimensionality => "dimensionality",
            IntentKind::BrandDifference => "brand_difference",
            IntentKind::Scenario => "scenario",
            IntentKind::Interactions => "interactions",
        }
    }
}

/// Categorical tags attached to dataset field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    Demographic,
    Brand,
    Numeric,
    Temporal,
    Geographic,
}

/// Endpoint families sharing renderer palettes and payload profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointFamily {
    Strategic,
    Competitive,
    Difference,
    Demographic,
    Correlation,
    OutlierDetection,
    SpatialClusters,
    General,
}

/// Color ramp family used when building class-break renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteFamily {
    /// Red-to-green ramp for opportunity/strategic scoring.
    SequentialRedGreen,
    /// Diverging ramp centered at zero for difference endpoints.
    Diverging,
}

/// Renderer defaults carried by the authority for each endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererDefaults {
    pub palette: PaletteFamily,
    pub classes: usize,
}

impl Default for RendererDefaults {
    fn default() -> Self {
        Self {
            palette: PaletteFamily::SequentialRedGreen,
            classes: 4,
        }
    }
}

/// Everything the pipeline knows about one analysis endpoint.
///
/// The `score_field` is the single canonical numeric field name used for
/// ranking, rendering, and popups; it doubles as the renderer's target
/// variable. Keyword packs drive both the hybrid router's Layer 2 and the
/// deterministic keyword fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// URL-style identifier, e.g. `/strategic-analysis`.
    pub id: String,
    pub display_name: String,
    /// Rich prose used by the semantic layer; embedded once and cached.
    pub description: String,
    /// Canonical score field name. Equals the renderer target variable.
    pub score_field: String,
    /// Registry key of the processor that shapes this endpoint's raw data.
    pub processor_id: String,
    pub family: EndpointFamily,
    /// Declared primary intent; Layer 2 boosts apply when it matches.
    pub intent: IntentKind,
    pub sample_queries: Vec<String>,
    pub primary_keywords: Vec<WeightedTerm>,
    pub context_keywords: Vec<WeightedTerm>,
    /// Additive boost terms applied at Layer 2.
    pub boost_terms: Vec<String>,
    /// Subtractive penalty terms applied at Layer 2.
    pub penalty_terms: Vec<String>,
    /// Hard avoid terms for the keyword fallback scorer.
    pub avoid_terms: Vec<String>,
    /// Per-endpoint route threshold override; `None` uses the router default.
    pub confidence_threshold: Option<f64>,
    /// Field categories this endpoint's analysis expects in the dataset.
    pub required_tags: Vec<FieldTag>,
    pub renderer: RendererDefaults,
}

impl EndpointDescriptor {
    /// Canonical score field derived from an endpoint id:
    /// `/strategic-analysis` → `strategic_analysis_score`.
    pub fn derived_score_field(id: &str) -> String {
        let mut base = id.trim_start_matches('/').replace('-', "_");
        base.push_str("_score");
        base
    }
}
