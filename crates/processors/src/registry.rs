//! Processor registry: the closed set of 25 endpoint processors keyed by
//! processor id. Dispatch is a map lookup; there is no inheritance chain.

use std::collections::HashMap;
use std::sync::Arc;

use brand::BrandResolver;

use crate::anomaly::AnomalyProcessor;
use crate::brand_difference::BrandDifferenceProcessor;
use crate::clusters::ClusterAnalysisProcessor;
use crate::comparative::ComparativeProcessor;
use crate::competitive::CompetitiveProcessor;
use crate::correlation::CorrelationProcessor;
use crate::customer::CustomerProfileProcessor;
use crate::demographic::DemographicProcessor;
use crate::model_selection::ModelSelectionProcessor;
use crate::outliers::OutlierProcessor;
use crate::scored::ScoredProcessor;
use crate::segments::SegmentProfilingProcessor;
use crate::spatial::SpatialClustersProcessor;
use crate::strategic::StrategicProcessor;
use crate::{EndpointProcessor, ProcessorError};

pub struct ProcessorRegistry {
    by_id: HashMap<String, Box<dyn EndpointProcessor>>,
}

impl ProcessorRegistry {
    /// Registry over the full endpoint set.
    pub fn with_defaults(brand: Arc<BrandResolver>) -> Self {
        let mut registry = Self {
            by_id: HashMap::new(),
        };

        registry.register(Box::new(StrategicProcessor::new(brand.clone())));
        registry.register(Box::new(CompetitiveProcessor::new(brand.clone())));
        registry.register(Box::new(ComparativeProcessor::new(brand.clone())));
        registry.register(Box::new(BrandDifferenceProcessor::new(brand)));
        registry.register(Box::new(DemographicProcessor));
        registry.register(Box::new(CorrelationProcessor));
        registry.register(Box::new(OutlierProcessor));
        registry.register(Box::new(SpatialClustersProcessor));
        registry.register(Box::new(AnomalyProcessor));
        registry.register(Box::new(ClusterAnalysisProcessor));
        registry.register(Box::new(SegmentProfilingProcessor));
        registry.register(Box::new(CustomerProfileProcessor));
        registry.register(Box::new(ModelSelectionProcessor));

        for scored in table_driven() {
            registry.register(Box::new(scored));
        }
        registry
    }

    pub fn register(&mut self, processor: Box<dyn EndpointProcessor>) {
        self.by_id
            .insert(processor.processor_id().to_string(), processor);
    }

    pub fn get(&self, processor_id: &str) -> Result<&dyn EndpointProcessor, ProcessorError> {
        self.by_id
            .get(processor_id)
            .map(Box::as_ref)
            .ok_or_else(|| ProcessorError::UnknownProcessor(processor_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// The endpoints whose shaping is entirely table-driven.
fn table_driven() -> Vec<ScoredProcessor> {
    vec![
        ScoredProcessor::new(
            "scenario_analysis",
            "/scenario-analysis",
            "scenario_analysis_score",
            &["resilience", "scenario", "impact", "income", "share"],
            "scenario resilience",
        ),
        ScoredProcessor::new(
            "sensitivity_analysis",
            "/sensitivity-analysis",
            "sensitivity_analysis_score",
            &["sensitivity", "elasticity", "input", "delta"],
            "input sensitivity",
        ),
        ScoredProcessor::new(
            "feature_importance_ranking",
            "/feature-importance-ranking",
            "feature_importance_ranking_score",
            &["importance", "feature", "shap", "weight"],
            "feature importance",
        ),
        ScoredProcessor::new(
            "feature_interactions",
            "/feature-interactions",
            "feature_interactions_score",
            &["interaction", "feature", "pair", "synergy"],
            "feature interaction strength",
        ),
        ScoredProcessor::new(
            "model_performance",
            "/model-performance",
            "model_performance_score",
            &["r2", "rmse", "mae", "accuracy", "performance", "error"],
            "local model performance",
        ),
        ScoredProcessor::new(
            "algorithm_comparison",
            "/algorithm-comparison",
            "algorithm_comparison_score",
            &["algorithm", "model", "winner", "margin"],
            "algorithm comparison margin",
        ),
        ScoredProcessor::new(
            "ensemble_analysis",
            "/ensemble-analysis",
            "ensemble_analysis_score",
            &["ensemble", "component", "weight", "variance"],
            "ensemble prediction strength",
        ),
        ScoredProcessor::new(
            "dimensionality_insights",
            "/dimensionality-insights",
            "dimensionality_insights_score",
            &["component", "loading", "variance", "dimension"],
            "dimensional structure",
        ),
        ScoredProcessor::new(
            "consensus_analysis",
            "/consensus-analysis",
            "consensus_analysis_score",
            &["consensus", "agreement", "variance", "model"],
            "cross-model consensus",
        ),
        ScoredProcessor::new(
            "trend_analysis",
            "/trend-analysis",
            "trend_analysis_score",
            &["trend", "growth", "slope", "momentum", "yoy"],
            "performance trend",
        ),
        ScoredProcessor::new(
            "predictive_modeling",
            "/predictive-modeling",
            "predictive_modeling_score",
            &["predicted", "forecast", "horizon", "confidence"],
            "predicted performance",
        ),
        ScoredProcessor::new(
            "analyze",
            "/analyze",
            "analyze_score",
            &["income", "population", "share", "value"],
            "overall analysis score",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProcessorRegistry {
        ProcessorRegistry::with_defaults(Arc::new(BrandResolver::with_defaults()))
    }

    #[test]
    fn registry_covers_all_catalog_processors() {
        let registry = registry();
        assert_eq!(registry.len(), 25);
        for descriptor in authority::default_catalog() {
            let processor = registry
                .get(&descriptor.processor_id)
                .unwrap_or_else(|_| panic!("missing processor {}", descriptor.processor_id));
            assert_eq!(processor.endpoint(), descriptor.id);
            assert_eq!(
                processor.score_field(),
                descriptor.score_field,
                "score-field contract broken for {}",
                descriptor.id
            );
        }
    }

    #[test]
    fn unknown_processor_is_an_error() {
        let registry = registry();
        assert!(matches!(
            registry.get("nonexistent"),
            Err(ProcessorError::UnknownProcessor(_))
        ));
    }
}
