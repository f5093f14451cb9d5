//! Cross-endpoint invariants: every processor in the registry, fed
//! synthetic data for its endpoint, must produce records that satisfy the
//! canonical-score, ranking, shadowing, renderer-agreement, and payload
//! size contracts.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use authority::ConfigAuthority;
use brand::BrandResolver;
use payload::{optimize, PayloadConfig};
use processors::{ProcessOptions, ProcessorRegistry, RawEndpointData};
use renderer::build_renderer;

const RECORDS: usize = 30;

/// Synthetic raw data carrying the endpoint's own score field plus the
/// context fields the various processor families look for.
fn synthetic_data(score_field: &str) -> RawEndpointData {
    let categories = ["gradient_boosting", "random_forest", "xgboost"];
    let results = (0..RECORDS)
        .map(|i| {
            let mut record = Map::new();
            record.insert("ID".into(), json!(format!("{:05}", 33000 + i)));
            if score_field == "algorithm_category" {
                record.insert(score_field.into(), json!(categories[i % 3]));
                record.insert("selection_confidence".into(), json!(0.5 + (i % 5) as f64 / 10.0));
            } else {
                record.insert(score_field.into(), json!(1.0 + (i % 17) as f64 * 0.5));
            }
            record.insert("median_income".into(), json!(38_000 + (i as i64) * 321));
            record.insert("hr_block_market_share".into(), json!(12.0 + (i % 25) as f64));
            record.insert("turbotax_market_share".into(), json!(15.0 + (i % 19) as f64));
            record.insert("cluster_id".into(), json!((i % 4) as i64));
            record.insert("centroid_distance".into(), json!((i % 7) as f64 / 10.0));
            record
        })
        .collect();
    RawEndpointData::new(results)
}

#[test]
fn every_endpoint_satisfies_the_score_contract() {
    let authority = ConfigAuthority::with_defaults();
    let registry = ProcessorRegistry::with_defaults(Arc::new(BrandResolver::with_defaults()));
    let payload_cfg = PayloadConfig::default();
    let opts = ProcessOptions {
        query: Some("contract check".into()),
        ..ProcessOptions::default()
    };

    for descriptor in authority.descriptors() {
        let raw = synthetic_data(&descriptor.score_field);
        let processor = registry
            .get(&descriptor.processor_id)
            .unwrap_or_else(|_| panic!("missing processor for {}", descriptor.id));

        let result = processor
            .process(&raw, &opts)
            .unwrap_or_else(|err| panic!("{} failed: {err}", descriptor.id));

        assert_eq!(result.kind, descriptor.id);
        assert_eq!(result.target_variable, descriptor.score_field);
        assert!(!result.records.is_empty(), "{}", descriptor.id);

        // Rank consistency: sorted descending, dense 1..N, area-id ties.
        for (index, record) in result.records.iter().enumerate() {
            assert_eq!(record.rank as usize, index + 1, "{}", descriptor.id);
        }
        for window in result.records.windows(2) {
            assert!(
                window[0].value > window[1].value
                    || (window[0].value == window[1].value
                        && window[0].area_id < window[1].area_id),
                "{} ordering broken",
                descriptor.id
            );
        }

        for record in &result.records {
            // Canonical field presence: finite, equal to `value`, exactly
            // one entry under the endpoint's canonical name.
            assert_eq!(
                record.canonical_field(),
                Some(descriptor.score_field.as_str()),
                "{}",
                descriptor.id
            );
            let score = record.canonical_score().unwrap();
            assert!(score.is_finite());
            assert_eq!(score, record.value);

            // No shadowing: the canonical score never reappears in
            // properties under another score alias.
            for key in record.properties.keys() {
                assert!(
                    !(key.ends_with("_score") && key != "z_score"),
                    "{} leaks {key} into properties",
                    descriptor.id
                );
            }
            assert!(!record.properties.contains_key("value"));
        }

        // Renderer/record agreement on the authority's target variable.
        let score_config = authority.score_config(&descriptor.id).unwrap();
        let spec = build_renderer(&result, &score_config.target_variable, &score_config.renderer)
            .unwrap_or_else(|err| panic!("{} renderer: {err}", descriptor.id));
        assert_eq!(spec.field, score_config.target_variable);
        assert_eq!(spec.kind, "class_breaks");
        assert!(!spec.breaks.is_empty());
        for record in &result.records {
            let value = record
                .canonical
                .get(&spec.field)
                .and_then(Value::as_f64)
                .unwrap_or_else(|| panic!("{} record lacks {}", descriptor.id, spec.field));
            assert!(value.is_finite());
        }

        // Payload stays within the hard ceiling for every family.
        let summary = optimize(&result, descriptor.family, &payload_cfg)
            .unwrap_or_else(|err| panic!("{} payload: {err}", descriptor.id));
        assert!(summary.serialized_size() <= payload_cfg.hard_ceiling);
        assert_eq!(summary.total_records, result.records.len());
        assert!(!summary.directive.is_empty());
    }
}

#[test]
fn single_record_collapses_cleanly_everywhere() {
    let authority = ConfigAuthority::with_defaults();
    let registry = ProcessorRegistry::with_defaults(Arc::new(BrandResolver::with_defaults()));

    for descriptor in authority.descriptors() {
        let mut raw = synthetic_data(&descriptor.score_field);
        raw.results.truncate(1);

        let result = registry
            .get(&descriptor.processor_id)
            .unwrap()
            .process(&raw, &ProcessOptions::default())
            .unwrap_or_else(|err| panic!("{}: {err}", descriptor.id));

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].rank, 1);
        assert_eq!(result.statistics.count, 1);
        assert_eq!(result.statistics.std, 0.0);

        let score_config = authority.score_config(&descriptor.id).unwrap();
        let spec =
            build_renderer(&result, &score_config.target_variable, &score_config.renderer)
                .unwrap();
        // Single unique value: one class spanning [min, max].
        assert_eq!(spec.breaks.len(), 1);
        assert_eq!(spec.breaks[0].min, spec.breaks[0].max);
    }
}
