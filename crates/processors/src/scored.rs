//! Table-driven processor for endpoints whose shaping is the common
//! pipeline plus a distinctive context subset and summary focus.

use crate::common::{shape, top_list, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

/// Generic scored-endpoint processor configured per endpoint.
pub struct ScoredProcessor {
    processor_id: String,
    endpoint: String,
    score_field: String,
    context_fields: Vec<String>,
    /// Short phrase describing what the score measures, used in prose.
    focus: String,
}

impl ScoredProcessor {
    pub fn new(
        processor_id: impl Into<String>,
        endpoint: impl Into<String>,
        score_field: impl Into<String>,
        context_fields: &[&str],
        focus: impl Into<String>,
    ) -> Self {
        Self {
            processor_id: processor_id.into(),
            endpoint: endpoint.into(),
            score_field: score_field.into(),
            context_fields: context_fields.iter().map(|s| s.to_string()).collect(),
            focus: focus.into(),
        }
    }
}

impl EndpointProcessor for ScoredProcessor {
    fn processor_id(&self) -> &str {
        &self.processor_id
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn score_field(&self) -> &str {
        &self.score_field
    }

    fn process(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<ProcessedResult, ProcessorError> {
        let context_refs: Vec<&str> = self.context_fields.iter().map(String::as_str).collect();
        let spec = ShapeSpec {
            endpoint: &self.endpoint,
            score_field: &self.score_field,
            context_fields: &context_refs,
            cap: ScoreCap::None,
        };
        let focus = &self.focus;
        shape(raw, opts, &spec, |_, _| {}, |records, stats| {
            format!(
                "Ranked {} areas by {focus}. Leaders: {}. Mean {:.1}, range {:.1} to {:.1}.",
                stats.count,
                top_list(records, 3),
                stats.mean,
                stats.min,
                stats.max
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn raw(scores: &[(&str, f64)]) -> RawEndpointData {
        RawEndpointData::new(
            scores
                .iter()
                .map(|(id, score)| {
                    let mut record = Map::new();
                    record.insert("ID".into(), json!(id));
                    record.insert("scenario_analysis_score".into(), json!(score));
                    record.insert("resilience_index".into(), json!(score * 2.0));
                    record
                })
                .collect::<Vec<Map<String, Value>>>(),
        )
    }

    fn processor() -> ScoredProcessor {
        ScoredProcessor::new(
            "scenario_analysis",
            "/scenario-analysis",
            "scenario_analysis_score",
            &["resilience"],
            "scenario resilience",
        )
    }

    #[test]
    fn processes_and_ranks() {
        let result = processor()
            .process(&raw(&[("a", 2.0), ("b", 8.0)]), &ProcessOptions::default())
            .unwrap();
        assert_eq!(result.kind, "/scenario-analysis");
        assert_eq!(result.records[0].area_id, "b");
        assert_eq!(result.records[0].rank, 1);
        assert_eq!(result.target_variable, "scenario_analysis_score");
        assert!(result.summary.contains("scenario resilience"));
    }

    #[test]
    fn context_whitelist_filters_properties() {
        let result = processor()
            .process(&raw(&[("a", 2.0)]), &ProcessOptions::default())
            .unwrap();
        assert!(result.records[0].properties.contains_key("resilience_index"));
    }

    #[test]
    fn validate_uses_score_field() {
        let processor = processor();
        assert!(processor.validate(&raw(&[("a", 1.0)])).is_ok());
        let bad = RawEndpointData {
            success: false,
            results: vec![],
        };
        assert!(processor.validate(&bad).is_err());
    }
}
