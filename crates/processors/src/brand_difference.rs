//! Brand difference: target share minus a chosen competitor's share,
//! signed, with a balanced band around zero.

use std::sync::Arc;

use brand::{BrandResolver, BrandSpec};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::common::{area_id, area_name, numeric, retain_properties, sort_and_rank};
use crate::stats::ScoreStatistics;
use crate::types::{ProcessedRecord, ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "brand_difference_score";

/// |difference| below this is a balanced market.
const BALANCED_BAND: f64 = 2.0;

const CONTEXT_FIELDS: &[&str] = &["share", "income", "population"];

pub struct BrandDifferenceProcessor {
    brand: Arc<BrandResolver>,
}

impl BrandDifferenceProcessor {
    pub fn new(brand: Arc<BrandResolver>) -> Self {
        Self { brand }
    }

    /// Pick the two brands to difference: query mentions win, then the
    /// first configured competitor whose field appears in the data, then
    /// the first two brand-share-looking fields on the record.
    fn choose_pair(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<(BrandSpec, BrandSpec), ProcessorError> {
        let target = self.brand.target().clone();

        if let Some(query) = &opts.query {
            let mentioned = self.brand.mentioned_brands(query);
            let competitor = mentioned
                .iter()
                .find(|spec| spec.field != target.field)
                .map(|spec| (*spec).clone());
            if let Some(competitor) = competitor {
                return Ok((target, competitor));
            }
        }

        let sample = raw.results.first();
        if let Some(record) = sample {
            for competitor in self.brand.competitors() {
                if record.contains_key(&competitor.field) {
                    return Ok((target, competitor.clone()));
                }
            }
            // Fall back to the first two share-like fields on the record.
            let share_fields: Vec<&String> = record
                .keys()
                .filter(|key| key.to_lowercase().contains("share"))
                .collect();
            if share_fields.len() >= 2 {
                return Ok((
                    BrandSpec::new(share_fields[0].clone(), prettify(share_fields[0])),
                    BrandSpec::new(share_fields[1].clone(), prettify(share_fields[1])),
                ));
            }
        }

        Err(ProcessorError::ValidationFailed(
            "no competitor brand fields found for difference analysis".into(),
        ))
    }
}

fn prettify(field: &str) -> String {
    field
        .trim_end_matches("_market_share")
        .trim_end_matches("_share")
        .replace('_', " ")
}

fn position(difference: f64) -> &'static str {
    if difference.abs() < BALANCED_BAND {
        "balanced"
    } else if difference > 0.0 {
        "brand1_leading"
    } else {
        "brand2_leading"
    }
}

impl EndpointProcessor for BrandDifferenceProcessor {
    fn processor_id(&self) -> &str {
        "brand_difference"
    }

    fn endpoint(&self) -> &str {
        "/brand-difference"
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
        Ok(())
    }

    fn process(
        &self,
        raw: &RawEndpointData,
        opts: &ProcessOptions,
    ) -> Result<ProcessedResult, ProcessorError> {
        self.validate(raw)?;
        if raw.results.is_empty() {
            return Ok(ProcessedResult {
                kind: self.endpoint().to_string(),
                records: Vec::new(),
                target_variable: SCORE_FIELD.to_string(),
                statistics: ScoreStatistics::default(),
                summary: "No matching areas were found for this analysis.".into(),
                skipped_records: 0,
            });
        }

        let (brand_a, brand_b) = self.choose_pair(raw, opts)?;

        let mut records = Vec::with_capacity(raw.results.len());
        let mut skipped = 0usize;
        for raw_record in &raw.results {
            let Some(id) = area_id(raw_record) else {
                skipped += 1;
                continue;
            };
            let a_share = numeric(raw_record, &brand_a.field);
            let b_share = numeric(raw_record, &brand_b.field);
            if a_share.is_none() && b_share.is_none() {
                skipped += 1;
                warn!(area_id = %id, "record skipped: neither brand share present");
                continue;
            }
            let a_share = a_share.unwrap_or(0.0);
            let b_share = b_share.unwrap_or(0.0);
            let difference = a_share - b_share;

            let name = area_name(raw_record, &id, opts);
            let mut record = ProcessedRecord::new(id, name, difference, SCORE_FIELD);
            record.properties = retain_properties(raw_record, CONTEXT_FIELDS, SCORE_FIELD);
            record
                .properties
                .insert("position".into(), json!(position(difference)));
            record.brand_a_name = Some(brand_a.name.clone());
            record.brand_b_name = Some(brand_b.name.clone());
            record.brand_dominance = Some(difference);
            records.push(record);
        }

        sort_and_rank(&mut records);
        let scores: Vec<f64> = records.iter().map(|r| r.value).collect();
        let statistics = ScoreStatistics::compute(&scores);

        let summary = if records.is_empty() {
            "No matching areas were found for this analysis.".to_string()
        } else {
            summarize(&records, &brand_a, &brand_b)
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

fn summarize(records: &[ProcessedRecord], brand_a: &BrandSpec, brand_b: &BrandSpec) -> String {
    let a_markets: Vec<&ProcessedRecord> = records
        .iter()
        .filter(|r| r.value >= BALANCED_BAND)
        .take(3)
        .collect();
    let b_markets: Vec<&ProcessedRecord> = records
        .iter()
        .rev()
        .filter(|r| r.value <= -BALANCED_BAND)
        .take(3)
        .collect();
    let balanced = records
        .iter()
        .filter(|r| r.value.abs() < BALANCED_BAND)
        .count();

    let mut parts = Vec::new();
    if !a_markets.is_empty() {
        parts.push(format!(
            "{} leads in {}",
            brand_a.name,
            a_markets
                .iter()
                .map(|r| format!("{} (+{:.1})", r.area_name, r.value))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !b_markets.is_empty() {
        parts.push(format!(
            "{} leads in {}",
            brand_b.name,
            b_markets
                .iter()
                .map(|r| format!("{} ({:.1})", r.area_name, r.value))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    parts.push(format!("{balanced} balanced markets within ±{BALANCED_BAND:.0}%"));
    parts.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use brand::BrandConfig;

    fn record(id: &str, hr_block: f64, turbotax: f64) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("ID".into(), json!(id));
        record.insert("hr_block_market_share".into(), json!(hr_block));
        record.insert("turbotax_market_share".into(), json!(turbotax));
        record
    }

    fn processor() -> BrandDifferenceProcessor {
        BrandDifferenceProcessor::new(Arc::new(BrandResolver::with_defaults()))
    }

    fn opts_with_query(query: &str) -> ProcessOptions {
        ProcessOptions {
            query: Some(query.to_string()),
            ..ProcessOptions::default()
        }
    }

    #[test]
    fn difference_is_target_minus_competitor() {
        let raw = RawEndpointData::new(vec![record("a", 30.0, 22.5)]);
        let result = processor()
            .process(
                &raw,
                &opts_with_query("market share difference between H&R Block and TurboTax"),
            )
            .unwrap();
        let rec = &result.records[0];
        assert_eq!(rec.value, 7.5);
        assert_eq!(rec.brand_a_name.as_deref(), Some("H&R Block"));
        assert_eq!(rec.brand_b_name.as_deref(), Some("TurboTax"));
        assert_eq!(rec.brand_dominance, Some(7.5));
    }

    #[test]
    fn balanced_band_categorizes() {
        let raw = RawEndpointData::new(vec![
            record("lead", 30.0, 20.0),
            record("tied", 21.0, 20.0),
            record("trail", 10.0, 25.0),
        ]);
        let result = processor().process(&raw, &ProcessOptions::default()).unwrap();
        let by_id = |id: &str| {
            result
                .records
                .iter()
                .find(|r| r.area_id == id)
                .unwrap()
                .properties
                .get("position")
                .unwrap()
                .clone()
        };
        assert_eq!(by_id("lead"), json!("brand1_leading"));
        assert_eq!(by_id("tied"), json!("balanced"));
        assert_eq!(by_id("trail"), json!("brand2_leading"));
    }

    #[test]
    fn swapping_brands_inverts_sign() {
        let raw = RawEndpointData::new(vec![record("a", 30.0, 22.5), record("b", 10.0, 18.0)]);

        let forward = processor().process(&raw, &ProcessOptions::default()).unwrap();

        let swapped_config = BrandConfig {
            target: BrandSpec::new("turbotax_market_share", "TurboTax"),
            competitors: vec![BrandSpec::new("hr_block_market_share", "H&R Block")],
            industry: "tax preparation services".into(),
        };
        let swapped = BrandDifferenceProcessor::new(Arc::new(BrandResolver::new(swapped_config)))
            .process(&raw, &ProcessOptions::default())
            .unwrap();

        for record in &forward.records {
            let mirror = swapped
                .records
                .iter()
                .find(|r| r.area_id == record.area_id)
                .unwrap();
            assert_eq!(record.value, -mirror.value);
        }
    }

    #[test]
    fn summary_covers_both_sides_and_balanced() {
        let raw = RawEndpointData::new(vec![
            record("lead", 30.0, 20.0),
            record("tied", 21.0, 20.0),
            record("trail", 10.0, 25.0),
        ]);
        let result = processor().process(&raw, &ProcessOptions::default()).unwrap();
        assert!(result.summary.contains("H&R Block leads"));
        assert!(result.summary.contains("TurboTax leads"));
        assert!(result.summary.contains("1 balanced"));
    }

    #[test]
    fn missing_both_shares_skips_record() {
        let mut empty = Map::new();
        empty.insert("ID".into(), json!("void"));
        let raw = RawEndpointData::new(vec![empty, record("a", 30.0, 20.0)]);
        let result = processor().process(&raw, &ProcessOptions::default()).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped_records, 1);
    }
}
