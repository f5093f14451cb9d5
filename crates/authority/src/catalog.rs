//! Built-in endpoint catalog.
//!
//! Twenty-five pre-computed analysis endpoints with their canonical score
//! fields, processor bindings, keyword packs, and renderer defaults. The
//! catalog is data: projects replace or extend it through
//! [`crate::ConfigAuthority::reload`], and the three non-standard score
//! names (`/model-selection`, `/customer-profile`, `/analyze`) are carried
//! here rather than special-cased in processor code.

use crate::descriptor::{
    EndpointDescriptor, EndpointFamily, FieldTag, IntentKind, PaletteFamily, RendererDefaults,
    WeightedTerm,
};

fn terms(pairs: &[(&str, f64)]) -> Vec<WeightedTerm> {
    pairs
        .iter()
        .map(|(term, weight)| WeightedTerm::new(*term, *weight))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

struct Blueprint {
    id: &'static str,
    display_name: &'static str,
    description: &'static str,
    score_field: Option<&'static str>,
    processor_id: &'static str,
    family: EndpointFamily,
    intent: IntentKind,
    sample_queries: &'static [&'static str],
    primary: &'static [(&'static str, f64)],
    context: &'static [(&'static str, f64)],
    boost: &'static [&'static str],
    penalty: &'static [&'static str],
    avoid: &'static [&'static str],
    threshold: Option<f64>,
    required_tags: &'static [FieldTag],
    palette: PaletteFamily,
}

impl Blueprint {
    fn build(&self) -> EndpointDescriptor {
        let score_field = self
            .score_field
            .map(str::to_string)
            .unwrap_or_else(|| EndpointDescriptor::derived_score_field(self.id));
        EndpointDescriptor {
            id: self.id.to_string(),
            display_name: self.display_name.to_string(),
            description: self.description.to_string(),
            score_field,
            processor_id: self.processor_id.to_string(),
            family: self.family,
            intent: self.intent,
            sample_queries: strings(self.sample_queries),
            primary_keywords: terms(self.primary),
            context_keywords: terms(self.context),
            boost_terms: strings(self.boost),
            penalty_terms: strings(self.penalty),
            avoid_terms: strings(self.avoid),
            confidence_threshold: self.threshold,
            required_tags: self.required_tags.to_vec(),
            renderer: RendererDefaults {
                palette: self.palette,
                classes: 4,
            },
        }
    }
}

const BLUEPRINTS: &[Blueprint] = &[
    Blueprint {
        id: "/strategic-analysis",
        display_name: "Strategic Analysis",
        description: "Ranks geographic markets by strategic expansion value, combining \
                      market opportunity, purchasing power, diversity, and growth potential \
                      into a single strategic score for identifying the best new markets.",
        score_field: None,
        processor_id: "strategic_analysis",
        family: EndpointFamily::Strategic,
        intent: IntentKind::StrategicAnalysis,
        sample_queries: &[
            "Show me the top strategic markets for expansion",
            "Where should we open new locations?",
            "Best markets for growth investment",
        ],
        primary: &[
            ("strategic", 3.0),
            ("expansion", 2.5),
            ("top markets", 2.0),
            ("invest", 1.5),
            ("growth", 1.2),
        ],
        context: &[
            ("opportunity", 1.5),
            ("best", 1.0),
            ("new locations", 1.5),
            ("market entry", 2.0),
        ],
        boost: &["expand", "opportunity", "potential", "priority"],
        penalty: &["difference", "outlier", "cluster"],
        avoid: &["anomaly", "model accuracy"],
        threshold: None,
        required_tags: &[FieldTag::Numeric, FieldTag::Demographic],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/competitive-analysis",
        display_name: "Competitive Analysis",
        description: "Scores each market on competitive positioning and advantage for the \
                      target brand versus named competitors, on a 1-10 advantage scale \
                      rather than raw market share.",
        score_field: None,
        processor_id: "competitive_analysis",
        family: EndpointFamily::Competitive,
        intent: IntentKind::CompetitiveAnalysis,
        sample_queries: &[
            "Where do we have the strongest competitive position?",
            "Competitive landscape by market",
            "Which areas favor us against the competition?",
        ],
        primary: &[
            ("competitive", 3.0),
            ("competition", 2.5),
            ("versus", 1.5),
            ("advantage", 2.0),
            ("positioning", 2.0),
        ],
        context: &[
            ("rivals", 1.5),
            ("market position", 1.5),
            ("stronghold", 1.0),
        ],
        boost: &["against", "landscape", "dominance"],
        penalty: &["share difference", "gap between"],
        avoid: &["weather"],
        threshold: None,
        required_tags: &[FieldTag::Brand, FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/comparative-analysis",
        display_name: "Comparative Analysis",
        description: "Compares two entities or two regions side by side, surfacing per-area \
                      shares for each and the dominance margin between them.",
        score_field: None,
        processor_id: "comparative_analysis",
        family: EndpointFamily::Competitive,
        intent: IntentKind::CompetitiveAnalysis,
        sample_queries: &[
            "Compare usage between Alachua County and Miami-Dade County",
            "Compare brand A and brand B across regions",
        ],
        primary: &[
            ("compare", 3.0),
            ("comparison", 2.5),
            ("between", 1.5),
            ("side by side", 2.0),
        ],
        context: &[("usage", 1.0), ("across", 1.0), ("county", 1.0)],
        boost: &["versus", "both"],
        penalty: &["share difference"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Brand, FieldTag::Geographic],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/brand-difference",
        display_name: "Brand Difference",
        description: "Maps the market share difference between the target brand and a chosen \
                      competitor, positive where the target leads and negative where the \
                      competitor leads, with a balanced band near zero.",
        score_field: None,
        processor_id: "brand_difference",
        family: EndpointFamily::Difference,
        intent: IntentKind::BrandDifference,
        sample_queries: &[
            "Show me the market share difference between our brand and the competitor",
            "Where is the share gap largest?",
        ],
        primary: &[
            ("difference", 3.0),
            ("share difference", 3.0),
            ("gap", 2.0),
            ("lead", 1.5),
        ],
        context: &[
            ("market share", 2.0),
            ("versus", 1.0),
            ("ahead", 1.0),
            ("behind", 1.0),
        ],
        boost: &["between", "margin", "delta"],
        penalty: &["expansion", "cluster"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Brand],
        palette: PaletteFamily::Diverging,
    },
    Blueprint {
        id: "/demographic-insights",
        display_name: "Demographic Insights",
        description: "Profiles the demographic makeup of each area: age cohorts, income \
                      brackets, education, and household composition, scored by alignment \
                      with the target customer base.",
        score_field: None,
        processor_id: "demographic_insights",
        family: EndpointFamily::Demographic,
        intent: IntentKind::DemographicAnalysis,
        sample_queries: &[
            "What are the demographics of our best markets?",
            "Show me areas with young high-income households",
        ],
        primary: &[
            ("demographic", 3.0),
            ("demographics", 3.0),
            ("population", 2.0),
            ("income", 1.5),
            ("age", 1.2),
        ],
        context: &[
            ("households", 1.5),
            ("education", 1.2),
            ("residents", 1.0),
            ("who lives", 1.5),
        ],
        boost: &["profile", "makeup", "composition"],
        penalty: &["model", "algorithm"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Demographic],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/correlation-analysis",
        display_name: "Correlation Analysis",
        description: "Measures how strongly two variables move together across areas, \
                      highlighting where the relationship is strongest and weakest.",
        score_field: None,
        processor_id: "correlation_analysis",
        family: EndpointFamily::Correlation,
        intent: IntentKind::Interactions,
        sample_queries: &[
            "Is income correlated with our usage?",
            "What is the relationship between age and adoption?",
        ],
        primary: &[
            ("correlation", 3.0),
            ("correlated", 3.0),
            ("relationship between", 2.5),
            ("related to", 1.5),
        ],
        context: &[("drives", 1.0), ("linked", 1.0), ("association", 1.5)],
        boost: &["variables", "factors"],
        penalty: &["cluster", "outlier"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/outlier-detection",
        display_name: "Outlier Detection",
        description: "Finds areas whose performance deviates sharply from the norm, with \
                      z-scores explaining how unusual each outlier is.",
        score_field: None,
        processor_id: "outlier_detection",
        family: EndpointFamily::OutlierDetection,
        intent: IntentKind::OutlierDetection,
        sample_queries: &[
            "Which markets are statistical outliers?",
            "Show me unusual areas",
        ],
        primary: &[
            ("outlier", 3.0),
            ("outliers", 3.0),
            ("unusual", 2.0),
            ("deviate", 2.0),
        ],
        context: &[("abnormal", 1.5), ("extreme", 1.2), ("stand out", 1.5)],
        boost: &["statistical", "exception"],
        penalty: &["anomaly insights"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/spatial-clusters",
        display_name: "Spatial Clusters",
        description: "Groups geographically contiguous areas into clusters of similar \
                      performance, with cluster membership and centroid distance per area.",
        score_field: None,
        processor_id: "spatial_clusters",
        family: EndpointFamily::SpatialClusters,
        intent: IntentKind::Clustering,
        sample_queries: &[
            "Show me spatial clusters of similar markets",
            "Which regions group together geographically?",
        ],
        primary: &[
            ("spatial", 3.0),
            ("spatial clusters", 3.0),
            ("cluster", 2.0),
            ("clusters", 2.0),
            ("geographic group", 2.5),
        ],
        context: &[("region", 1.0), ("contiguous", 1.5), ("nearby", 1.0)],
        boost: &["neighboring", "adjacent"],
        penalty: &["segment"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Geographic, FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/scenario-analysis",
        display_name: "Scenario Analysis",
        description: "Evaluates what-if scenarios per area, scoring resilience of outcomes \
                      under modeled changes in market conditions.",
        score_field: None,
        processor_id: "scenario_analysis",
        family: EndpointFamily::General,
        intent: IntentKind::Scenario,
        sample_queries: &[
            "What happens if spending drops 10 percent?",
            "Scenario analysis for next year",
        ],
        primary: &[
            ("scenario", 3.0),
            ("what if", 3.0),
            ("what happens if", 3.0),
            ("simulate", 2.0),
        ],
        context: &[("projection", 1.5), ("assume", 1.0), ("if we", 1.2)],
        boost: &["hypothetical", "change"],
        penalty: &[],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/sensitivity-analysis",
        display_name: "Sensitivity Analysis",
        description: "Shows how sensitive each area's outcome is to changes in the model's \
                      input variables, identifying fragile versus robust markets.",
        score_field: None,
        processor_id: "sensitivity_analysis",
        family: EndpointFamily::General,
        intent: IntentKind::Sensitivity,
        sample_queries: &[
            "How sensitive are results to income changes?",
            "Which markets are most sensitive to input shifts?",
        ],
        primary: &[
            ("sensitivity", 3.0),
            ("sensitive", 2.5),
            ("elasticity", 2.0),
        ],
        context: &[("input change", 1.5), ("robust", 1.0), ("fragile", 1.0)],
        boost: &["respond", "react"],
        penalty: &[],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/feature-importance-ranking",
        display_name: "Feature Importance Ranking",
        description: "Ranks which variables matter most to the model's predictions in each \
                      area, exposing the drivers behind the scores.",
        score_field: None,
        processor_id: "feature_importance_ranking",
        family: EndpointFamily::General,
        intent: IntentKind::FeatureImportance,
        sample_queries: &[
            "What factors matter most to the prediction?",
            "Rank the most important variables",
        ],
        primary: &[
            ("feature importance", 3.0),
            ("important factors", 2.5),
            ("drivers", 2.0),
            ("matter most", 2.0),
        ],
        context: &[("influence", 1.5), ("contribute", 1.2), ("weight", 1.0)],
        boost: &["key variables", "top factors"],
        penalty: &["interaction"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/feature-interactions",
        display_name: "Feature Interactions",
        description: "Surfaces pairs of variables whose combined effect differs from their \
                      individual effects, per area.",
        score_field: None,
        processor_id: "feature_interactions",
        family: EndpointFamily::Correlation,
        intent: IntentKind::Interactions,
        sample_queries: &[
            "Which variables interact with each other?",
            "Show me interaction effects",
        ],
        primary: &[
            ("interaction", 3.0),
            ("interactions", 3.0),
            ("combined effect", 2.5),
        ],
        context: &[
            ("together", 1.0),
            ("jointly", 1.2),
            ("pairs", 1.0),
            ("interact", 1.5),
            ("effects", 1.0),
        ],
        boost: &["synergy"],
        penalty: &["correlation"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/model-performance",
        display_name: "Model Performance",
        description: "Reports how accurately the predictive model performs in each area, \
                      exposing r-squared style performance per geography.",
        score_field: None,
        processor_id: "model_performance",
        family: EndpointFamily::General,
        intent: IntentKind::ModelSelection,
        sample_queries: &[
            "How accurate is the model by area?",
            "Where does the model perform worst?",
        ],
        primary: &[
            ("model performance", 3.0),
            ("accuracy", 2.0),
            ("r-squared", 2.5),
            ("model quality", 2.0),
        ],
        context: &[("predictions", 1.0), ("error", 1.2), ("fit", 1.0)],
        boost: &["reliable", "trust"],
        penalty: &["algorithm comparison"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/algorithm-comparison",
        display_name: "Algorithm Comparison",
        description: "Compares candidate algorithms head to head per area, showing which \
                      modeling approach wins where and by how much.",
        score_field: None,
        processor_id: "algorithm_comparison",
        family: EndpointFamily::General,
        intent: IntentKind::ModelSelection,
        sample_queries: &[
            "Which algorithm performs best by region?",
            "Compare the models against each other",
        ],
        primary: &[
            ("algorithm", 2.5),
            ("algorithms", 2.5),
            ("compare models", 3.0),
            ("model comparison", 3.0),
        ],
        context: &[("xgboost", 1.5), ("random forest", 1.5), ("best model", 1.5)],
        boost: &["head to head"],
        penalty: &["model selection"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/ensemble-analysis",
        display_name: "Ensemble Analysis",
        description: "Scores areas using the combined ensemble of all models, the most \
                      robust single prediction available per area.",
        score_field: None,
        processor_id: "ensemble_analysis",
        family: EndpointFamily::General,
        intent: IntentKind::Ensemble,
        sample_queries: &[
            "What does the ensemble model predict?",
            "Show me the combined model results",
        ],
        primary: &[
            ("ensemble", 3.0),
            ("combined model", 2.5),
            ("all models", 2.0),
        ],
        context: &[("blended", 1.2), ("aggregate prediction", 1.5)],
        boost: &["robust"],
        penalty: &["consensus"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/model-selection",
        display_name: "Model Selection",
        description: "Recommends which algorithm family fits each area best, a categorical \
                      assignment rather than a numeric score.",
        score_field: Some("algorithm_category"),
        processor_id: "model_selection",
        family: EndpointFamily::General,
        intent: IntentKind::ModelSelection,
        sample_queries: &[
            "Which model should we use per area?",
            "Recommend an algorithm for each market",
        ],
        primary: &[
            ("model selection", 3.0),
            ("which model", 2.5),
            ("recommend algorithm", 2.5),
        ],
        context: &[("choose", 1.0), ("pick", 1.0), ("fits best", 1.5)],
        boost: &["per area"],
        penalty: &["performance"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/dimensionality-insights",
        display_name: "Dimensionality Insights",
        description: "Summarizes how many underlying dimensions explain the variance across \
                      areas and how each area loads on them.",
        score_field: None,
        processor_id: "dimensionality_insights",
        family: EndpointFamily::General,
        intent: IntentKind::Dimensionality,
        sample_queries: &[
            "How many factors explain the variation?",
            "Show me the principal components",
        ],
        primary: &[
            ("dimensionality", 3.0),
            ("principal component", 2.5),
            ("dimensions", 2.0),
            ("variance explained", 2.5),
        ],
        context: &[("reduce", 1.0), ("factors", 1.0), ("pca", 2.0)],
        boost: &["latent"],
        penalty: &[],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/consensus-analysis",
        display_name: "Consensus Analysis",
        description: "Measures how strongly independent models agree about each area, \
                      separating settled predictions from contested ones.",
        score_field: None,
        processor_id: "consensus_analysis",
        family: EndpointFamily::General,
        intent: IntentKind::Consensus,
        sample_queries: &[
            "Where do the models agree?",
            "Show me consensus across predictions",
        ],
        primary: &[
            ("consensus", 3.0),
            ("agree", 2.0),
            ("agreement", 2.5),
        ],
        context: &[("models agree", 2.0), ("confidence", 1.0), ("disagree", 1.5)],
        boost: &["unanimous"],
        penalty: &["ensemble"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/anomaly-insights",
        display_name: "Anomaly Insights",
        description: "Explains detected anomalies with z-scores and neighborhood statistics, \
                      separating data quality issues from genuine market surprises.",
        score_field: None,
        processor_id: "anomaly_insights",
        family: EndpointFamily::OutlierDetection,
        intent: IntentKind::OutlierDetection,
        sample_queries: &[
            "Explain the anomalies in the data",
            "Why are these areas anomalous?",
        ],
        primary: &[
            ("anomaly", 3.0),
            ("anomalies", 3.0),
            ("anomalous", 2.5),
        ],
        context: &[("explain", 1.0), ("why unusual", 1.5), ("surprise", 1.2)],
        boost: &["investigate"],
        penalty: &["outlier detection"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/cluster-analysis",
        display_name: "Cluster Analysis",
        description: "Segments areas into behavioral clusters by similarity of their metrics, \
                      with cluster id and centroid distance retained per area.",
        score_field: None,
        processor_id: "cluster_analysis",
        family: EndpointFamily::SpatialClusters,
        intent: IntentKind::Clustering,
        sample_queries: &[
            "Cluster the markets by behavior",
            "Which areas behave similarly?",
        ],
        primary: &[
            ("cluster analysis", 3.0),
            ("clustering", 2.5),
            ("cluster", 2.0),
            ("group by similarity", 2.0),
            ("similar markets", 2.0),
            ("behavior", 1.5),
            ("behave", 1.5),
        ],
        context: &[("segments", 1.0), ("behave", 1.0), ("alike", 1.0)],
        boost: &["grouping"],
        penalty: &["spatial"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/segment-profiling",
        display_name: "Segment Profiling",
        description: "Paints a detailed portrait of each customer segment's behavior and \
                      demographics across geographies.",
        score_field: None,
        processor_id: "segment_profiling",
        family: EndpointFamily::Demographic,
        intent: IntentKind::Clustering,
        sample_queries: &[
            "Profile the customer segments",
            "Paint me a picture of segment behavior",
        ],
        primary: &[
            ("segment", 3.0),
            ("segments", 2.5),
            ("segment behavior", 3.0),
            ("profiling", 2.0),
        ],
        context: &[("persona", 1.5), ("behavior", 1.2), ("portrait", 1.5)],
        boost: &["describe", "picture"],
        penalty: &["cluster analysis"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Demographic],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/customer-profile",
        display_name: "Customer Profile",
        description: "Scores each area by purchase propensity of its resident customer base, \
                      profiling who buys and how likely they are to buy.",
        score_field: Some("purchase_propensity"),
        processor_id: "customer_profile",
        family: EndpointFamily::Demographic,
        intent: IntentKind::DemographicAnalysis,
        sample_queries: &[
            "What does our ideal customer look like?",
            "Where are the most likely buyers?",
        ],
        primary: &[
            ("customer profile", 3.0),
            ("ideal customer", 2.5),
            ("propensity", 2.5),
            ("likely buyers", 2.0),
        ],
        context: &[("purchase", 1.5), ("buyer", 1.2), ("customer base", 1.5)],
        boost: &["who buys"],
        penalty: &["segment"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Demographic, FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/trend-analysis",
        display_name: "Trend Analysis",
        description: "Tracks how each area's performance is trending over time, separating \
                      rising markets from declining ones.",
        score_field: None,
        processor_id: "trend_analysis",
        family: EndpointFamily::Strategic,
        intent: IntentKind::Scenario,
        sample_queries: &[
            "Which markets are trending up?",
            "Show me growth trends over time",
        ],
        primary: &[
            ("trend", 3.0),
            ("trending", 3.0),
            ("over time", 2.0),
            ("trajectory", 2.0),
        ],
        context: &[("rising", 1.5), ("declining", 1.5), ("momentum", 1.2)],
        boost: &["growth", "historic"],
        penalty: &["predict"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Temporal, FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/predictive-modeling",
        display_name: "Predictive Modeling",
        description: "Forecasts future performance per area from the trained predictive \
                      model, scoring expected outcomes rather than current state.",
        score_field: None,
        processor_id: "predictive_modeling",
        family: EndpointFamily::Strategic,
        intent: IntentKind::ModelSelection,
        sample_queries: &[
            "Predict next year's performance by market",
            "What is the forecast for each area?",
        ],
        primary: &[
            ("predict", 3.0),
            ("prediction", 2.5),
            ("forecast", 3.0),
            ("future", 1.5),
        ],
        context: &[("next year", 1.5), ("expected", 1.2), ("will", 0.8)],
        boost: &["projection"],
        penalty: &["trend"],
        avoid: &[],
        threshold: None,
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
    Blueprint {
        id: "/analyze",
        display_name: "General Analysis",
        description: "General-purpose ranking of areas by the primary analysis score when no \
                      specialized endpoint fits the question.",
        score_field: Some("analyze_score"),
        processor_id: "analyze",
        family: EndpointFamily::General,
        intent: IntentKind::DemographicAnalysis,
        sample_queries: &["Analyze the market data", "Give me an overview of the areas"],
        primary: &[
            ("analyze", 2.0),
            ("analysis", 1.5),
            ("overview", 1.5),
            ("show me", 0.8),
        ],
        context: &[("data", 0.5), ("areas", 0.5), ("markets", 0.5)],
        boost: &[],
        penalty: &[],
        avoid: &[],
        // Generic endpoint routes only when nothing specific clears its bar.
        threshold: Some(0.45),
        required_tags: &[FieldTag::Numeric],
        palette: PaletteFamily::SequentialRedGreen,
    },
];

/// The default 25-endpoint catalog.
pub fn default_catalog() -> Vec<EndpointDescriptor> {
    BLUEPRINTS.iter().map(Blueprint::build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_twenty_five_endpoints() {
        assert_eq!(default_catalog().len(), 25);
    }

    #[test]
    fn catalog_ids_are_unique_and_slash_prefixed() {
        let catalog = default_catalog();
        let ids: HashSet<_> = catalog.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
        for descriptor in &catalog {
            assert!(descriptor.id.starts_with('/'), "{}", descriptor.id);
        }
    }

    #[test]
    fn score_fields_follow_naming_rule_except_documented_exceptions() {
        for descriptor in default_catalog() {
            let derived = EndpointDescriptor::derived_score_field(&descriptor.id);
            match descriptor.id.as_str() {
                "/model-selection" => assert_eq!(descriptor.score_field, "algorithm_category"),
                "/customer-profile" => assert_eq!(descriptor.score_field, "purchase_propensity"),
                "/analyze" => assert_eq!(descriptor.score_field, "analyze_score"),
                _ => assert_eq!(descriptor.score_field, derived, "{}", descriptor.id),
            }
        }
    }

    #[test]
    fn brand_difference_uses_diverging_palette() {
        let catalog = default_catalog();
        let diff = catalog
            .iter()
            .find(|d| d.id == "/brand-difference")
            .unwrap();
        assert_eq!(diff.renderer.palette, PaletteFamily::Diverging);
        let strategic = catalog
            .iter()
            .find(|d| d.id == "/strategic-analysis")
            .unwrap();
        assert_eq!(
            strategic.renderer.palette,
            PaletteFamily::SequentialRedGreen
        );
    }

    #[test]
    fn every_endpoint_has_keywords_and_samples() {
        for descriptor in default_catalog() {
            assert!(
                !descriptor.primary_keywords.is_empty(),
                "{} missing primary keywords",
                descriptor.id
            );
            assert!(
                !descriptor.sample_queries.is_empty(),
                "{} missing sample queries",
                descriptor.id
            );
            assert!(!descriptor.description.is_empty());
        }
    }
}
