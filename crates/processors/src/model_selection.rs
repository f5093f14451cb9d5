//! Model selection: categorical algorithm recommendation per area.
//!
//! The canonical field `algorithm_category` is categorical in the raw
//! data. Ranking and rendering need numbers, so categories are mapped to
//! stable 1-based codes (sorted label order) and the original label is
//! kept in `properties` for narration.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::common::{area_id, area_name, numeric, retain_properties, sort_and_rank};
use crate::stats::ScoreStatistics;
use crate::types::{ProcessedRecord, ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "algorithm_category";

const CONTEXT_FIELDS: &[&str] = &["confidence", "model", "algorithm", "performance"];

pub struct ModelSelectionProcessor;

fn category_of(record: &Map<String, Value>) -> Option<String> {
    match record.get(SCORE_FIELD) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl EndpointProcessor for ModelSelectionProcessor {
    fn processor_id(&self) -> &str {
        "model_selection"
    }

    fn endpoint(&self) -> &str {
        "/model-selection"
    }

    fn score_field(&self) -> &str {
        SCORE_FIELD
    }

    fn validate(&self, raw: &RawEndpointData) -> Result<(), ProcessorError> {
        if !raw.success {
            return Err(ProcessorError::ValidationFailed(
                "raw endpoint data did not report success".into(),
            ));
        }
        if !raw.results.is_empty()
            && !raw
                .results
                .iter()
                .take(20)
                .any(|record| category_of(record).is_some())
        {
            return Err(ProcessorError::ValidationFailed(
                "algorithm_category missing from sampled records".into(),
            ));
        }
        Ok(())
    }

    fn process(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<ProcessedResult, ProcessorError> {
        self.validate(raw)?;

        // Stable label → code mapping over the whole payload.
        let mut labels: Vec<String> = raw.results.iter().filter_map(category_of).collect();
        labels.sort();
        labels.dedup();
        let codes: BTreeMap<&str, f64> = labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.as_str(), (index + 1) as f64))
            .collect();

        let mut records = Vec::with_capacity(raw.results.len());
        let mut skipped = 0usize;
        for raw_record in &raw.results {
            let Some(id) = area_id(raw_record) else {
                skipped += 1;
                continue;
            };
            let Some(label) = category_of(raw_record) else {
                skipped += 1;
                continue;
            };
            let code = codes[label.as_str()];
            let name = area_name(raw_record, &id, opts);
            let mut record = ProcessedRecord::new(id, name, code, SCORE_FIELD);
            record.properties = retain_properties(raw_record, CONTEXT_FIELDS, SCORE_FIELD);
            record
                .properties
                .insert("algorithm_category_label".into(), json!(label));
            if let Some(confidence) = numeric(raw_record, "selection_confidence") {
                record
                    .properties
                    .insert("selection_confidence".into(), json!(confidence));
            }
            records.push(record);
        }

        sort_and_rank(&mut records);
        let scores: Vec<f64> = records.iter().map(|r| r.value).collect();
        let statistics = ScoreStatistics::compute(&scores);

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in &records {
            if let Some(Value::String(label)) =
                record.properties.get("algorithm_category_label")
            {
                *counts.entry(label.clone()).or_insert(0) += 1;
            }
        }
        let summary = if records.is_empty() {
            "No matching areas were found for this analysis.".to_string()
        } else {
            let distribution = counts
                .iter()
                .map(|(label, count)| format!("{label}: {count} areas"))
                .collect::<Vec<_>>()
                .join("; ");
            format!(
                "Recommended algorithm families across {} areas - {distribution}.",
                records.len()
            )
        };

        Ok(ProcessedResult {
            kind: self.endpoint().to_string(),
            records,
            target_variable: SCORE_FIELD.to_string(),
            statistics,
            summary,
            skipped_records: skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, category: &str) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("ID".into(), json!(id));
        record.insert(SCORE_FIELD.into(), json!(category));
        record.insert("selection_confidence".into(), json!(0.9));
        record
    }

    #[test]
    fn categories_coded_stably_and_labels_kept() {
        let raw = RawEndpointData::new(vec![
            record("a", "gradient_boosting"),
            record("b", "random_forest"),
            record("c", "gradient_boosting"),
        ]);
        let result = ModelSelectionProcessor
            .process(&raw, &ProcessOptions::default())
            .unwrap();
        // Sorted labels: gradient_boosting=1, random_forest=2.
        let b = result.records.iter().find(|r| r.area_id == "b").unwrap();
        assert_eq!(b.value, 2.0);
        assert_eq!(
            b.properties.get("algorithm_category_label"),
            Some(&json!("random_forest"))
        );
        assert!(result.summary.contains("gradient_boosting: 2 areas"));
    }

    #[test]
    fn every_record_has_finite_canonical_number() {
        let raw = RawEndpointData::new(vec![record("a", "xgboost")]);
        let result = ModelSelectionProcessor
            .process(&raw, &ProcessOptions::default())
            .unwrap();
        for rec in &result.records {
            assert!(rec.canonical_score().unwrap().is_finite());
        }
    }

    #[test]
    fn missing_categories_fail_validation() {
        let mut plain = Map::new();
        plain.insert("ID".into(), json!("a"));
        plain.insert("other".into(), json!(1.0));
        let raw = RawEndpointData::new(vec![plain]);
        assert!(ModelSelectionProcessor.validate(&raw).is_err());
    }
}
