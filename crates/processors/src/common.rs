//! Shared shaping policies: field alias normalization, score extraction
//! with documented fallbacks, sanity capping, ranking, and context
//! retention. Every processor funnels through [`shape`].

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::stats::ScoreStatistics;
use crate::types::{ProcessedRecord, ProcessedResult, RawEndpointData};
use crate::{ProcessOptions, ProcessorError};

/// Area identifier aliases, tried in order.
pub const AREA_ID_ALIASES: &[&str] = &["ID", "id", "area_id", "OBJECTID", "GEOID", "FID"];

/// Area display-name aliases, tried in order.
pub const AREA_NAME_ALIASES: &[&str] =
    &["DESCRIPTION", "value_DESCRIPTION", "NAME", "name", "city"];

/// Generic score fallback, tried after the endpoint's own field.
pub const GENERIC_SCORE_FALLBACK: &str = "thematic_value";

/// Fields never copied into `properties`.
const RESERVED_FIELDS: &[&str] = &[
    "ID",
    "id",
    "area_id",
    "OBJECTID",
    "GEOID",
    "FID",
    "DESCRIPTION",
    "value_DESCRIPTION",
    "NAME",
    "name",
    "city",
    "value",
];

/// Where the canonical score actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreSource {
    Primary,
    Thematic,
    FirstNumeric(String),
}

/// Per-endpoint capping rule applied when the sanity check trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCap {
    /// Leave scores untouched.
    None,
    /// Scores on a 1-10 scale accidentally populated with 0-100
    /// percentages are divided by ten.
    DivideBy10IfPercent,
}

/// How a processor shapes its endpoint's records.
pub struct ShapeSpec<'a> {
    pub endpoint: &'a str,
    pub score_field: &'a str,
    /// Case-insensitive substrings selecting which raw fields survive into
    /// `properties`.
    pub context_fields: &'a [&'a str],
    pub cap: ScoreCap,
}

pub fn area_id(record: &Map<String, Value>) -> Option<String> {
    for alias in AREA_ID_ALIASES {
        match record.get(*alias) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Resolve the display name, augmenting bare ZIP identifiers with the city
/// when the lookup knows it: `33101` → `33101 (Miami)`.
pub fn area_name(record: &Map<String, Value>, area_id: &str, opts: &ProcessOptions) -> String {
    for alias in AREA_NAME_ALIASES {
        if let Some(Value::String(s)) = record.get(*alias) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    if looks_like_zip(area_id) {
        if let Some(lookup) = &opts.city_lookup {
            if let Some(city) = lookup.city_for_zip(area_id) {
                return format!("{area_id} ({city})");
            }
        }
    }
    area_id.to_string()
}

fn looks_like_zip(area_id: &str) -> bool {
    area_id.len() == 5 && area_id.bytes().all(|b| b.is_ascii_digit())
}

pub fn numeric(record: &Map<String, Value>, field: &str) -> Option<f64> {
    record
        .get(field)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

/// Numeric read with the percentage-field preference: when both `X` and
/// `X_P` exist, the percentage variant wins.
pub fn preferred_numeric(record: &Map<String, Value>, field: &str) -> Option<f64> {
    let percent_field = format!("{field}_P");
    numeric(record, &percent_field).or_else(|| numeric(record, field))
}

/// First numeric field on the record that is not an area alias, preferring
/// `*_P` variants over their base fields.
pub fn first_numeric_field(record: &Map<String, Value>) -> Option<(String, f64)> {
    for (key, value) in record {
        if RESERVED_FIELDS.contains(&key.as_str()) || key.ends_with("_score") {
            continue;
        }
        if let Some(number) = value.as_f64().filter(|v| v.is_finite()) {
            let percent_variant = format!("{key}_P");
            if let Some(percent) = numeric(record, &percent_variant) {
                return Some((percent_variant, percent));
            }
            return Some((key.clone(), number));
        }
    }
    None
}

/// Validate the raw payload and pick the usable score source.
///
/// `success` must be set and the endpoint's score field must be present on
/// at least 5% of the sampled records; failing that, the documented
/// substitutes are tried, and only when nothing numeric exists at all is
/// the endpoint's data rejected.
pub fn validate_scores(
    raw: &RawEndpointData,
    score_field: &str,
) -> Result<(ScoreSource, Option<String>), ProcessorError> {
    if !raw.success {
        return Err(ProcessorError::ValidationFailed(
            "raw endpoint data did not report success".into(),
        ));
    }
    if raw.results.is_empty() {
        // Intentionally-empty results are valid; the caller produces the
        // "no matching areas" result.
        return Ok((ScoreSource::Primary, None));
    }

    let sample: Vec<&Map<String, Value>> = raw.results.iter().take(20).collect();
    let with_primary = sample
        .iter()
        .filter(|record| numeric(record, score_field).is_some())
        .count();
    if with_primary * 20 >= sample.len() {
        // >= 5% of the sample carries the canonical field.
        return Ok((ScoreSource::Primary, None));
    }

    let with_thematic = sample
        .iter()
        .filter(|record| numeric(record, GENERIC_SCORE_FALLBACK).is_some())
        .count();
    if with_thematic * 20 >= sample.len() && with_thematic > 0 {
        return Ok((
            ScoreSource::Thematic,
            Some(format!(
                "Score field {score_field} missing; fell back to {GENERIC_SCORE_FALLBACK}"
            )),
        ));
    }

    if let Some((field, _)) = sample.iter().find_map(|record| first_numeric_field(record)) {
        return Ok((
            ScoreSource::FirstNumeric(field.clone()),
            Some(format!(
                "Score field {score_field} missing; fell back to first numeric field {field}"
            )),
        ));
    }

    Err(ProcessorError::ValidationFailed(format!(
        "score field {score_field} missing on {}% of sampled records and no numeric substitute found",
        100 * (sample.len() - with_primary) / sample.len().max(1)
    )))
}

pub fn extract_score(
    record: &Map<String, Value>,
    score_field: &str,
    source: &ScoreSource,
) -> Option<f64> {
    match source {
        ScoreSource::Primary => preferred_numeric(record, score_field)
            .or_else(|| numeric(record, GENERIC_SCORE_FALLBACK))
            .or_else(|| first_numeric_field(record).map(|(_, v)| v)),
        ScoreSource::Thematic => numeric(record, GENERIC_SCORE_FALLBACK),
        ScoreSource::FirstNumeric(field) => {
            numeric(record, field).or_else(|| first_numeric_field(record).map(|(_, v)| v))
        }
    }
}

/// Copy whitelisted context fields, excluding area aliases and anything
/// that would shadow the canonical score under a different name.
pub fn retain_properties(
    record: &Map<String, Value>,
    context_fields: &[&str],
    score_field: &str,
) -> Map<String, Value> {
    let mut properties = Map::new();
    for (key, value) in record {
        if RESERVED_FIELDS.contains(&key.as_str()) || key == score_field {
            continue;
        }
        // Other endpoints' canonical scores would shadow this one under a
        // different alias; z-scores are analytic context, not canonical.
        if (key.ends_with("_score") && key != "z_score") || key == GENERIC_SCORE_FALLBACK {
            continue;
        }
        let lowered = key.to_lowercase();
        if context_fields
            .iter()
            .any(|needle| lowered.contains(&needle.to_lowercase()))
        {
            properties.insert(key.clone(), value.clone());
        }
    }
    properties
}

/// Sort descending by value with the deterministic area-id tie-break and
/// assign dense 1-based ranks.
pub fn sort_and_rank(records: &mut [ProcessedRecord]) {
    records.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.area_id.cmp(&b.area_id))
    });
    for (index, record) in records.iter_mut().enumerate() {
        record.rank = (index + 1) as u32;
    }
}

/// Apply the per-endpoint capping rule when the sanity check trips: any
/// score beyond 10x the IQR-anchored ceiling.
pub fn apply_sanity_cap(records: &mut Vec<ProcessedRecord>, spec: &ShapeSpec<'_>) -> bool {
    if spec.cap == ScoreCap::None || records.is_empty() {
        return false;
    }
    let scores: Vec<f64> = records.iter().map(|r| r.value).collect();
    let stats = ScoreStatistics::compute(&scores);
    let ceiling = stats.expected_ceiling();
    let tripped = match spec.cap {
        ScoreCap::DivideBy10IfPercent => {
            // A 1-10 scale populated with 0-100 percentages.
            stats.max > 10.0 || (ceiling > 0.0 && stats.max > 10.0 * ceiling)
        }
        ScoreCap::None => false,
    };
    if !tripped {
        return false;
    }
    warn!(
        endpoint = spec.endpoint,
        max = stats.max,
        "score sanity check tripped; applying capping rule"
    );
    for record in records.iter_mut() {
        if record.value > 10.0 {
            let capped = record.value / 10.0;
            record.set_canonical(spec.score_field, capped);
        }
    }
    true
}

/// The shared shaping pipeline. `enrich` runs per record before ranking;
/// `summarize` sees the ranked records and statistics.
pub fn shape<E, S>(
    raw: &RawEndpointData,
    opts: &ProcessOptions,
    spec: &ShapeSpec<'_>,
    mut enrich: E,
    summarize: S,
) -> Result<ProcessedResult, ProcessorError>
where
    E: FnMut(&Map<String, Value>, &mut ProcessedRecord),
    S: FnOnce(&[ProcessedRecord], &ScoreStatistics) -> String,
{
    let (source, note) = validate_scores(raw, spec.score_field)?;
    if let Some(note) = &note {
        debug!(endpoint = spec.endpoint, note = %note, "score_fallback");
    }

    let mut records = Vec::with_capacity(raw.results.len());
    let mut skipped = 0usize;
    for raw_record in &raw.results {
        let Some(id) = area_id(raw_record) else {
            skipped += 1;
            warn!(endpoint = spec.endpoint, "record skipped: no area identifier");
            continue;
        };
        let Some(score) = extract_score(raw_record, spec.score_field, &source) else {
            skipped += 1;
            warn!(endpoint = spec.endpoint, area_id = %id, "record skipped: no usable score");
            continue;
        };

        let name = area_name(raw_record, &id, opts);
        let mut record = ProcessedRecord::new(id, name, score, spec.score_field);
        record.properties = retain_properties(raw_record, spec.context_fields, spec.score_field);
        enrich(raw_record, &mut record);
        records.push(record);
    }

    apply_sanity_cap(&mut records, spec);
    sort_and_rank(&mut records);

    let scores: Vec<f64> = records.iter().map(|r| r.value).collect();
    let statistics = ScoreStatistics::compute(&scores);
    let summary = if records.is_empty() {
        "No matching areas were found for this analysis.".to_string()
    } else {
        summarize(&records, &statistics)
    };

    Ok(ProcessedResult {
        kind: spec.endpoint.to_string(),
        records,
        target_variable: spec.score_field.to_string(),
        statistics,
        summary,
        skipped_records: skipped,
    })
}

/// "33101 (Miami): 8.2" list fragment for summaries.
pub fn top_list(records: &[ProcessedRecord], n: usize) -> String {
    records
        .iter()
        .take(n)
        .map(|r| format!("{} ({:.1})", r.area_name, r.value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn spec<'a>() -> ShapeSpec<'a> {
        ShapeSpec {
            endpoint: "/analyze",
            score_field: "analyze_score",
            context_fields: &["income"],
            cap: ScoreCap::None,
        }
    }

    #[test]
    fn area_id_tries_aliases_in_order() {
        let rec = record(&[("OBJECTID", json!(17)), ("GEOID", json!("12086"))]);
        assert_eq!(area_id(&rec), Some("17".into()));
        let rec = record(&[("GEOID", json!("12086"))]);
        assert_eq!(area_id(&rec), Some("12086".into()));
        assert_eq!(area_id(&record(&[])), None);
    }

    #[test]
    fn area_name_prefers_description_then_zip_augmentation() {
        let rec = record(&[("DESCRIPTION", json!("Little Havana"))]);
        assert_eq!(
            area_name(&rec, "33135", &ProcessOptions::default()),
            "Little Havana"
        );

        let opts = ProcessOptions {
            city_lookup: Some(std::sync::Arc::new(
                georef::StaticGeoReference::florida_fixture(),
            )),
            ..ProcessOptions::default()
        };
        assert_eq!(area_name(&record(&[]), "33101", &opts), "33101 (Miami)");
        assert_eq!(area_name(&record(&[]), "99999", &opts), "99999");
    }

    #[test]
    fn percentage_field_preferred() {
        let rec = record(&[("visits_B", json!(1200)), ("visits_B_P", json!(34.5))]);
        assert_eq!(preferred_numeric(&rec, "visits_B"), Some(34.5));
        assert_eq!(first_numeric_field(&rec), Some(("visits_B_P".into(), 34.5)));
    }

    #[test]
    fn validate_rejects_unsuccessful_payload() {
        let raw = RawEndpointData {
            success: false,
            results: vec![record(&[("analyze_score", json!(1.0))])],
        };
        assert!(matches!(
            validate_scores(&raw, "analyze_score"),
            Err(ProcessorError::ValidationFailed(_))
        ));
    }

    #[test]
    fn validate_falls_back_to_thematic_with_note() {
        let raw = RawEndpointData::new(vec![
            record(&[("ID", json!("1")), ("thematic_value", json!(5.0))]),
            record(&[("ID", json!("2")), ("thematic_value", json!(6.0))]),
        ]);
        let (source, note) = validate_scores(&raw, "analyze_score").unwrap();
        assert_eq!(source, ScoreSource::Thematic);
        assert!(note.unwrap().contains("thematic_value"));
    }

    #[test]
    fn validate_fatal_when_nothing_numeric() {
        let raw = RawEndpointData::new(vec![record(&[
            ("ID", json!("1")),
            ("label", json!("text only")),
        ])]);
        assert!(validate_scores(&raw, "analyze_score").is_err());
    }

    #[test]
    fn shape_ranks_dense_with_area_id_tiebreak() {
        let raw = RawEndpointData::new(vec![
            record(&[("ID", json!("b")), ("analyze_score", json!(5.0))]),
            record(&[("ID", json!("a")), ("analyze_score", json!(5.0))]),
            record(&[("ID", json!("c")), ("analyze_score", json!(9.0))]),
        ]);
        let result = shape(&raw, &ProcessOptions::default(), &spec(), |_, _| {}, |_, _| {
            "ok".into()
        })
        .unwrap();
        let order: Vec<(&str, u32)> = result
            .records
            .iter()
            .map(|r| (r.area_id.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("c", 1), ("a", 2), ("b", 3)]);
    }

    #[test]
    fn shape_skips_bad_records_with_count() {
        let raw = RawEndpointData::new(vec![
            record(&[("analyze_score", json!(5.0))]), // no id
            record(&[("ID", json!("x")), ("note", json!("no score"))]),
            record(&[("ID", json!("y")), ("analyze_score", json!(2.0))]),
        ]);
        let result = shape(&raw, &ProcessOptions::default(), &spec(), |_, _| {}, |_, _| {
            "ok".into()
        })
        .unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped_records, 1);
    }

    #[test]
    fn shape_empty_results_produce_no_matching_areas() {
        let raw = RawEndpointData::new(vec![]);
        let result = shape(&raw, &ProcessOptions::default(), &spec(), |_, _| {}, |_, _| {
            unreachable!("summarizer must not run for empty records")
        })
        .unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.statistics.count, 0);
        assert!(result.summary.contains("No matching areas"));
    }

    #[test]
    fn properties_never_shadow_scores() {
        let raw = RawEndpointData::new(vec![record(&[
            ("ID", json!("1")),
            ("analyze_score", json!(5.0)),
            ("income_median", json!(61000)),
            ("strategic_analysis_score", json!(7.0)),
            ("thematic_value", json!(5.5)),
        ])]);
        let result = shape(&raw, &ProcessOptions::default(), &spec(), |_, _| {}, |_, _| {
            "ok".into()
        })
        .unwrap();
        let record = &result.records[0];
        assert!(record.properties.contains_key("income_median"));
        assert!(!record.properties.contains_key("strategic_analysis_score"));
        assert!(!record.properties.contains_key("thematic_value"));
        assert!(!record.properties.contains_key("analyze_score"));
    }

    #[test]
    fn sanity_cap_divides_percent_scale() {
        let mut records = vec![
            ProcessedRecord::new("a".into(), "a".into(), 85.0, "competitive_analysis_score"),
            ProcessedRecord::new("b".into(), "b".into(), 42.0, "competitive_analysis_score"),
            ProcessedRecord::new("c".into(), "c".into(), 7.0, "competitive_analysis_score"),
        ];
        let spec = ShapeSpec {
            endpoint: "/competitive-analysis",
            score_field: "competitive_analysis_score",
            context_fields: &[],
            cap: ScoreCap::DivideBy10IfPercent,
        };
        assert!(apply_sanity_cap(&mut records, &spec));
        assert_eq!(records[0].value, 8.5);
        assert_eq!(records[1].value, 4.2);
        // Values already on the 1-10 scale stay put.
        assert_eq!(records[2].value, 7.0);
    }

    #[test]
    fn shape_is_idempotent() {
        let raw = RawEndpointData::new(vec![
            record(&[("ID", json!("1")), ("analyze_score", json!(3.0))]),
            record(&[("ID", json!("2")), ("analyze_score", json!(8.0))]),
        ]);
        let a = shape(&raw, &ProcessOptions::default(), &spec(), |_, _| {}, |r, _| {
            top_list(r, 2)
        })
        .unwrap();
        let b = shape(&raw, &ProcessOptions::default(), &spec(), |_, _| {}, |r, _| {
            top_list(r, 2)
        })
        .unwrap();
        assert_eq!(a, b);
    }
}
