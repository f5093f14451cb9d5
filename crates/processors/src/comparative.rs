//! Comparative analysis: two entities or two regions side by side.

use std::collections::BTreeMap;
use std::sync::Arc;

use brand::BrandResolver;
use serde_json::{Number, Value};

use crate::common::{numeric, shape, ScoreCap, ShapeSpec};
use crate::types::{ProcessedRecord, ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "comparative_analysis_score";

const CONTEXT_FIELDS: &[&str] = &["share", "income", "population", "usage"];

pub struct ComparativeProcessor {
    brand: Arc<BrandResolver>,
}

impl ComparativeProcessor {
    pub fn new(brand: Arc<BrandResolver>) -> Self {
        Self { brand }
    }
}

impl EndpointProcessor for ComparativeProcessor {
    fn processor_id(&self) -> &str {
        "comparative_analysis"
    }

    fn endpoint(&self) -> &str {
        "/comparative-analysis"
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
        let target = self.brand.target().clone();
        let competitor = self.brand.competitors().first().cloned();
        shape(
            raw,
            opts,
            &spec,
            |raw_record, record| {
                let a_share = numeric(raw_record, &target.field);
                let b_share = competitor
                    .as_ref()
                    .and_then(|c| numeric(raw_record, &c.field));
                if let (Some(a), Some(b)) = (a_share, b_share) {
                    record.brand_a_name = Some(target.name.clone());
                    record.brand_b_name =
                        competitor.as_ref().map(|c| c.name.clone());
                    record.brand_dominance = Some(a - b);
                    insert_number(record, "brand_a_share", a);
                    insert_number(record, "brand_b_share", b);
                }
            },
            |records, stats| {
                let groups = group_by_region(records);
                let grouped = groups
                    .iter()
                    .map(|(region, (count, mean))| {
                        format!("{region}: {count} areas averaging {mean:.1}")
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                format!(
                    "Comparison across {} areas (mean {:.1}). By region - {grouped}.",
                    stats.count, stats.mean
                )
            },
        )
    }
}

fn insert_number(record: &mut ProcessedRecord, key: &str, value: f64) {
    if let Some(number) = Number::from_f64(value) {
        record.properties.insert(key.into(), Value::Number(number));
    }
}

/// Group areas by the city in `"33101 (Miami)"`-style names, falling back
/// to the three-digit ZIP prefix.
fn group_by_region(records: &[ProcessedRecord]) -> BTreeMap<String, (usize, f64)> {
    let mut sums: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for record in records {
        let region = region_of(record);
        let entry = sums.entry(region).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.value;
    }
    sums.into_iter()
        .map(|(region, (count, sum))| (region, (count, sum / count as f64)))
        .collect()
}

fn region_of(record: &ProcessedRecord) -> String {
    if let Some(open) = record.area_name.find('(') {
        if let Some(close) = record.area_name.rfind(')') {
            if close > open + 1 {
                return record.area_name[open + 1..close].to_string();
            }
        }
    }
    if record.area_id.len() >= 3 && record.area_id.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{}xx", &record.area_id[..3]);
    }
    record.area_name.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn record(id: &str, score: f64, a: f64, b: f64) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("ID".into(), json!(id));
        record.insert(SCORE_FIELD.into(), json!(score));
        record.insert("hr_block_market_share".into(), json!(a));
        record.insert("turbotax_market_share".into(), json!(b));
        record
    }

    fn processor() -> ComparativeProcessor {
        ComparativeProcessor::new(Arc::new(BrandResolver::with_defaults()))
    }

    #[test]
    fn brand_shares_and_dominance_surfaced() {
        let raw = RawEndpointData::new(vec![record("33101", 6.0, 25.0, 18.0)]);
        let result = processor().process(&raw, &ProcessOptions::default()).unwrap();
        let rec = &result.records[0];
        assert_eq!(rec.brand_dominance, Some(7.0));
        assert_eq!(
            rec.properties.get("brand_a_share").and_then(Value::as_f64),
            Some(25.0)
        );
        assert_eq!(
            rec.properties.get("brand_b_share").and_then(Value::as_f64),
            Some(18.0)
        );
    }

    #[test]
    fn summary_groups_by_zip_prefix_without_city() {
        let raw = RawEndpointData::new(vec![
            record("33101", 6.0, 25.0, 18.0),
            record("33125", 4.0, 20.0, 19.0),
            record("32601", 8.0, 28.0, 15.0),
        ]);
        let result = processor().process(&raw, &ProcessOptions::default()).unwrap();
        assert!(result.summary.contains("331xx"));
        assert!(result.summary.contains("326xx"));
    }

    #[test]
    fn summary_groups_by_city_with_lookup() {
        let opts = ProcessOptions {
            city_lookup: Some(Arc::new(georef::StaticGeoReference::florida_fixture())),
            ..ProcessOptions::default()
        };
        let raw = RawEndpointData::new(vec![
            record("33101", 6.0, 25.0, 18.0),
            record("32601", 8.0, 28.0, 15.0),
        ]);
        let result = processor().process(&raw, &opts).unwrap();
        assert!(result.summary.contains("Miami"));
        assert!(result.summary.contains("Gainesville"));
    }

    #[test]
    fn missing_brand_fields_keep_record_without_dominance() {
        let mut plain = Map::new();
        plain.insert("ID".into(), json!("x"));
        plain.insert(SCORE_FIELD.into(), json!(5.0));
        let raw = RawEndpointData::new(vec![plain]);
        let result = processor().process(&raw, &ProcessOptions::default()).unwrap();
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].brand_dominance.is_none());
    }
}
