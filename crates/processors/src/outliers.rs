//! Outlier detection: z-scores attached to every record.

use serde_json::{Number, Value};

use crate::common::{shape, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "outlier_detection_score";

const CONTEXT_FIELDS: &[&str] = &["income", "population", "share", "deviation"];

/// |z| beyond this counts as an outlier in the summary.
const OUTLIER_Z: f64 = 2.0;

pub struct OutlierProcessor;

impl EndpointProcessor for OutlierProcessor {
    fn processor_id(&self) -> &str {
        "outlier_detection"
    }

    fn endpoint(&self) -> &str {
        "/outlier-detection"
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

        // z-scores need the final statistics, so they attach after shaping.
        let stats = result.statistics.clone();
        let mut outliers = Vec::new();
        for record in &mut result.records {
            let z = if stats.std == 0.0 {
                0.0
            } else {
                (record.value - stats.mean) / stats.std
            };
            if let Some(number) = Number::from_f64(z) {
                record.properties.insert("z_score".into(), Value::Number(number));
            }
            if z.abs() > OUTLIER_Z {
                outliers.push(format!("{} (z={z:+.1})", record.area_name));
            }
        }

        if !result.records.is_empty() {
            result.summary = if outliers.is_empty() {
                format!(
                    "No area deviates more than {OUTLIER_Z:.0} standard deviations across \
                     {} areas; the distribution is tight (std {:.2}).",
                    stats.count, stats.std
                )
            } else {
                format!(
                    "{} statistical outliers among {} areas: {}.",
                    outliers.len(),
                    stats.count,
                    outliers.join(", ")
                )
            };
        }
        Ok(result)
    }
}
