//! Layer 3 - context enhancement.
//!
//! Derives a dataset descriptor (field name → categorical tags) from the
//! request's dataset context and boosts candidates whose required field
//! categories the dataset actually covers. The descriptor is cached per
//! dataset fingerprint; deriving it is pure string work but datasets repeat
//! across requests.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use fxhash::hash64;
use lru::LruCache;
use once_cell::sync::Lazy;
use serde_json::Value;

use authority::{EndpointDescriptor, FieldTag};

use crate::types::DatasetContext;
use crate::vocabulary::CandidateScore;

/// Hard cap on the Layer-3 confidence boost.
pub const MAX_COVERAGE_BOOST: f64 = 0.2;

const DESCRIPTOR_CACHE_CAPACITY: usize = 128;

static DESCRIPTOR_CACHE: Lazy<Mutex<LruCache<u64, Arc<DatasetDescriptor>>>> = Lazy::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(DESCRIPTOR_CACHE_CAPACITY).expect("capacity is non-zero"),
    ))
});

/// Tags present in the dataset, derived from field names and the sample
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetDescriptor {
    pub tags: HashSet<FieldTag>,
    pub field_count: usize,
}

impl DatasetDescriptor {
    /// Fraction of the endpoint's required tags present in the dataset.
    pub fn coverage_for(&self, descriptor: &EndpointDescriptor) -> f64 {
        if descriptor.required_tags.is_empty() {
            return 1.0;
        }
        let present = descriptor
            .required_tags
            .iter()
            .filter(|tag| self.tags.contains(tag))
            .count();
        present as f64 / descriptor.required_tags.len() as f64
    }
}

fn tag_field(name: &str, sample: Option<&Value>) -> Vec<FieldTag> {
    let lowered = name.to_lowercase();
    let mut tags = Vec::new();

    const DEMOGRAPHIC_HINTS: &[&str] = &[
        "income", "age", "population", "household", "education", "median", "diversity",
        "employment", "family", "gen_",
    ];
    const BRAND_HINTS: &[&str] = &["share", "brand", "_mp", "market_share"];
    const TEMPORAL_HINTS: &[&str] = &["date", "year", "month", "quarter", "_ts", "time", "trend"];
    const GEOGRAPHIC_HINTS: &[&str] = &[
        "zip", "geoid", "county", "city", "state", "metro", "lat", "lon", "area", "region",
        "objectid", "fid", "description",
    ];

    if DEMOGRAPHIC_HINTS.iter().any(|hint| lowered.contains(hint)) {
        tags.push(FieldTag::Demographic);
    }
    if BRAND_HINTS.iter().any(|hint| lowered.contains(hint)) {
        tags.push(FieldTag::Brand);
    }
    if TEMPORAL_HINTS.iter().any(|hint| lowered.contains(hint)) {
        tags.push(FieldTag::Temporal);
    }
    if GEOGRAPHIC_HINTS.iter().any(|hint| lowered.contains(hint)) {
        tags.push(FieldTag::Geographic);
    }
    match sample {
        Some(Value::Number(_)) => tags.push(FieldTag::Numeric),
        None => {
            // Without a sample record, score-like names count as numeric.
            if lowered.contains("score")
                || lowered.contains("value")
                || lowered.contains("index")
                || lowered.ends_with("_p")
                || tags.contains(&FieldTag::Demographic)
                || tags.contains(&FieldTag::Brand)
            {
                tags.push(FieldTag::Numeric);
            }
        }
        _ => {}
    }
    tags
}

fn fingerprint(context: &DatasetContext) -> u64 {
    let mut digest = String::new();
    for field in &context.available_fields {
        digest.push_str(field);
        digest.push('\u{1f}');
    }
    hash64(digest.as_bytes())
}

/// Derive (or fetch from cache) the dataset descriptor.
pub fn describe_dataset(context: &DatasetContext) -> Arc<DatasetDescriptor> {
    let key = fingerprint(context);
    if let Ok(mut cache) = DESCRIPTOR_CACHE.lock() {
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
    }

    let mut tags = HashSet::new();
    for field in &context.available_fields {
        let sample = context
            .sample_record
            .as_ref()
            .and_then(|record| record.get(field));
        tags.extend(tag_field(field, sample));
    }
    let descriptor = Arc::new(DatasetDescriptor {
        tags,
        field_count: context.available_fields.len(),
    });

    if let Ok(mut cache) = DESCRIPTOR_CACHE.lock() {
        cache.put(key, descriptor.clone());
    }
    descriptor
}

/// Apply the coverage boost to every candidate in place. Returns the
/// coverage of the top candidate for the reasoning trace.
pub fn apply_coverage(
    candidates: &mut [CandidateScore],
    dataset: &DatasetDescriptor,
    descriptors: &[Arc<EndpointDescriptor>],
) -> f64 {
    let top_id = candidates
        .first()
        .map(|c| c.endpoint.clone())
        .unwrap_or_default();
    let mut top_coverage = 0.0;
    for candidate in candidates.iter_mut() {
        let Some(descriptor) = descriptors.iter().find(|d| d.id == candidate.endpoint) else {
            continue;
        };
        let coverage = dataset.coverage_for(descriptor);
        if candidate.endpoint == top_id {
            top_coverage = coverage;
        }
        candidate.confidence =
            (candidate.confidence + MAX_COVERAGE_BOOST * coverage).clamp(0.0, 1.0);
    }
    // Boosts can reorder candidates.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.endpoint.len().cmp(&b.endpoint.len()))
            .then_with(|| a.endpoint.cmp(&b.endpoint))
    });
    top_coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(fields: &[&str]) -> DatasetContext {
        DatasetContext {
            available_fields: fields.iter().map(|f| f.to_string()).collect(),
            sample_record: None,
        }
    }

    #[test]
    fn demographic_fields_tagged() {
        let descriptor = describe_dataset(&context(&[
            "median_income",
            "age_25_34_p",
            "hr_block_market_share",
            "zip",
        ]));
        assert!(descriptor.tags.contains(&FieldTag::Demographic));
        assert!(descriptor.tags.contains(&FieldTag::Brand));
        assert!(descriptor.tags.contains(&FieldTag::Geographic));
        assert!(descriptor.tags.contains(&FieldTag::Numeric));
    }

    #[test]
    fn sample_record_drives_numeric_tag() {
        let mut ctx = context(&["opaque_field"]);
        let mut record = serde_json::Map::new();
        record.insert("opaque_field".into(), json!(3.2));
        ctx.sample_record = Some(record);
        let descriptor = describe_dataset(&ctx);
        assert!(descriptor.tags.contains(&FieldTag::Numeric));
    }

    #[test]
    fn descriptor_cached_per_fingerprint() {
        let ctx = context(&["unique_cache_probe_field_a", "unique_cache_probe_field_b"]);
        let first = describe_dataset(&ctx);
        let second = describe_dataset(&ctx);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn full_coverage_for_endpoint_without_requirements() {
        let descriptor = DatasetDescriptor::default();
        let endpoint = authority::default_catalog()
            .into_iter()
            .find(|d| d.id == "/analyze")
            .map(|mut d| {
                d.required_tags.clear();
                d
            })
            .unwrap();
        assert_eq!(descriptor.coverage_for(&endpoint), 1.0);
    }

    #[test]
    fn partial_coverage_is_fractional() {
        let dataset = describe_dataset(&context(&["median_income"]));
        let endpoint = authority::default_catalog()
            .into_iter()
            .find(|d| d.id == "/strategic-analysis")
            .unwrap();
        // Strategic requires Numeric + Demographic; income gives both.
        assert_eq!(dataset.coverage_for(&endpoint), 1.0);

        let sparse = describe_dataset(&context(&["random_text_column"]));
        assert_eq!(sparse.coverage_for(&endpoint), 0.0);
    }
}
