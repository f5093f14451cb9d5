//! Anomaly insights: explanation-oriented view of unusual areas,
//! retaining z-scores and neighborhood statistics.

use serde_json::{Number, Value};

use crate::common::{shape, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "anomaly_insights_score";

const CONTEXT_FIELDS: &[&str] = &[
    "z_score",
    "zscore",
    "neighborhood",
    "local_mean",
    "local_std",
    "anomaly_type",
    "deviation",
];

pub struct AnomalyProcessor;

impl EndpointProcessor for AnomalyProcessor {
    fn processor_id(&self) -> &str {
        "anomaly_insights"
    }

    fn endpoint(&self) -> &str {
        "/anomaly-insights"
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
        let mut result = shape(raw, opts, &spec, |_, _| {}, |_, _| String::new())?;

        let stats = result.statistics.clone();
        for record in &mut result.records {
            if record.properties.contains_key("z_score") {
                continue; // upstream already explained this one
            }
            let z = if stats.std == 0.0 {
                0.0
            } else {
                (record.value - stats.mean) / stats.std
            };
            if let Some(number) = Number::from_f64(z) {
                record.properties.insert("z_score".into(), Value::Number(number));
            }
        }

        if !result.records.is_empty() {
            let flagged = result
                .records
                .iter()
                .filter(|r| {
                    r.properties
                        .get("z_score")
                        .and_then(Value::as_f64)
                        .map(|z| z.abs() > 2.0)
                        .unwrap_or(false)
                })
                .count();
            result.summary = format!(
                "Anomaly scan over {} areas flagged {flagged} with |z| above 2; each \
                 record keeps its z-score and neighborhood statistics for explanation.",
                stats.count
            );
        }
        Ok(result)
    }
}
