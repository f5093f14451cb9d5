//! Segment profiling: a portrait of each customer segment per geography.

use crate::common::{shape, top_list, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "segment_profiling_score";

const CONTEXT_FIELDS: &[&str] = &[
    "segment",
    "persona",
    "behavior",
    "lifestyle",
    "income",
    "age",
    "spending",
];

pub struct SegmentProfilingProcessor;

impl EndpointProcessor for SegmentProfilingProcessor {
    fn processor_id(&self) -> &str {
        "segment_profiling"
    }

    fn endpoint(&self) -> &str {
        "/segment-profiling"
    }

    fn score_field(&self) -> &str {
        SCORE_FIELD
    }

    fn process(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<ProcessedResult, ProcessorError> {
        let spec = ShapeSpec {
            endpoint: self.endpoint(),
            score_field: SCORE_FIELD,
            context_fields: CONTEXT_FIELDS,
            cap: ScoreCap::None,
        };
        shape(raw, opts, &spec, |_, _| {}, |records, stats| {
            format!(
                "Segment strength across {} areas: most distinctive profiles in {}. \
                 Segment labels, behavior, and lifestyle fields are retained per area \
                 (mean {:.1}).",
                stats.count,
                top_list(records, 5),
                stats.mean
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn segment_context_retained() {
        let mut record = Map::new();
        record.insert("ID".into(), json!("a"));
        record.insert(SCORE_FIELD.into(), json!(7.0));
        record.insert("segment_label".into(), json!("young professionals"));
        record.insert("spending_index".into(), json!(112));

        let raw = RawEndpointData::new(vec![record]);
        let result = SegmentProfilingProcessor
            .process(&raw, &ProcessOptions::default())
            .unwrap();
        let properties = &result.records[0].properties;
        assert!(properties.contains_key("segment_label"));
        assert!(properties.contains_key("spending_index"));
    }
}
