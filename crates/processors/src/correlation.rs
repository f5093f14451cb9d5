//! Correlation analysis over a pair of candidate fields.

use serde_json::{Map, Value};

use crate::common::{first_numeric_field, numeric, shape, top_list, ScoreCap, ShapeSpec};
use crate::stats::ScoreStatistics;
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "correlation_analysis_score";

const CONTEXT_FIELDS: &[&str] = &["income", "age", "population", "share", "value"];

pub struct CorrelationProcessor;

impl CorrelationProcessor {
    /// The field pair: explicit options win, then the first two distinct
    /// numeric fields on the data.
    fn field_pair(
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Option<(String, String)> {
        if let Some(pair) = &opts.correlation_fields {
            return Some(pair.clone());
        }
        let record = raw.results.first()?;
        let (first, _) = first_numeric_field(record)?;
        let second = record
            .keys()
            .filter(|key| **key != first)
            .find(|key| {
                !key.ends_with("_score")
                    && numeric(record, key).is_some()
                    && crate::common::area_id(&single(record, key)).is_none()
            })
            .cloned()?;
        Some((first, second))
    }
}

fn single(record: &Map<String, Value>, key: &str) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(value) = record.get(key) {
        map.insert(key.to_string(), value.clone());
    }
    map
}

impl EndpointProcessor for CorrelationProcessor {
    fn processor_id(&self) -> &str {
        "correlation_analysis"
    }

    fn endpoint(&self) -> &str {
        "/correlation-analysis"
    }

    fn score_field(&self) -> &str {
        SCORE_FIELD
    }

    fn process(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<ProcessedResult, ProcessorError> {
        let pair = Self::field_pair(raw, opts);

        // Pre-compute z-scores for the pair so each record can carry its
        // co-deviation alongside the endpoint score.
        let co_deviation: Option<(String, String, ScoreStatistics, ScoreStatistics)> =
            pair.as_ref().map(|(a, b)| {
                let a_values: Vec<f64> =
                    raw.results.iter().filter_map(|r| numeric(r, a)).collect();
                let b_values: Vec<f64> =
                    raw.results.iter().filter_map(|r| numeric(r, b)).collect();
                (
                    a.clone(),
                    b.clone(),
                    ScoreStatistics::compute(&a_values),
                    ScoreStatistics::compute(&b_values),
                )
            });

        let spec = ShapeSpec {
            endpoint: self.endpoint(),
            score_field: SCORE_FIELD,
            context_fields: CONTEXT_FIELDS,
            cap: ScoreCap::None,
        };
        let pair_label = pair
            .as_ref()
            .map(|(a, b)| format!("{a} vs {b}"))
            .unwrap_or_else(|| "the endpoint's score".to_string());

        shape(
            raw,
            opts,
            &spec,
            |raw_record, record| {
                if let Some((a, b, a_stats, b_stats)) = &co_deviation {
                    if let (Some(a_value), Some(b_value)) =
                        (numeric(raw_record, a), numeric(raw_record, b))
                    {
                        let a_z = z(a_value, a_stats);
                        let b_z = z(b_value, b_stats);
                        if let Some(number) = serde_json::Number::from_f64(a_z * b_z) {
                            record
                                .properties
                                .insert("co_deviation".into(), Value::Number(number));
                        }
                    }
                }
            },
            |records, stats| {
                format!(
                    "Correlation strength ({pair_label}) across {} areas: strongest in {}. \
                     Mean strength {:.2}.",
                    stats.count,
                    top_list(records, 5),
                    stats.mean
                )
            },
        )
    }
}

fn z(value: f64, stats: &ScoreStatistics) -> f64 {
    if stats.std == 0.0 {
        0.0
    } else {
        (value - stats.mean) / stats.std
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, score: f64, income: f64, share: f64) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("ID".into(), json!(id));
        record.insert(SCORE_FIELD.into(), json!(score));
        record.insert("median_income".into(), json!(income));
        record.insert("brand_share".into(), json!(share));
        record
    }

    #[test]
    fn explicit_field_pair_drives_co_deviation() {
        let raw = RawEndpointData::new(vec![
            record("a", 0.8, 50_000.0, 20.0),
            record("b", 0.3, 30_000.0, 10.0),
            record("c", 0.6, 40_000.0, 15.0),
        ]);
        let opts = ProcessOptions {
            correlation_fields: Some(("median_income".into(), "brand_share".into())),
            ..ProcessOptions::default()
        };
        let result = CorrelationProcessor.process(&raw, &opts).unwrap();
        assert!(result.summary.contains("median_income vs brand_share"));
        // Extremes co-deviate positively when the fields move together.
        let a = result.records.iter().find(|r| r.area_id == "a").unwrap();
        assert!(a.properties.get("co_deviation").unwrap().as_f64().unwrap() > 0.0);
    }

    #[test]
    fn derives_pair_when_options_absent() {
        let raw = RawEndpointData::new(vec![record("a", 0.8, 50_000.0, 20.0)]);
        let result = CorrelationProcessor
            .process(&raw, &ProcessOptions::default())
            .unwrap();
        assert_eq!(result.records.len(), 1);
        assert!(result.summary.contains("vs"));
    }
}
