//! Determinism and idempotence guarantees: identical inputs produce
//! identical routing decisions, processor outputs, and reloaded catalogs.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use authority::{default_catalog, ConfigAuthority};
use brand::BrandResolver;
use processors::{EndpointProcessor, ProcessOptions, ProcessorRegistry, RawEndpointData};
use router::{HybridRouter, RouterConfig};

fn hybrid_router() -> HybridRouter {
    HybridRouter::new(
        Arc::new(ConfigAuthority::with_defaults()),
        Arc::new(BrandResolver::with_defaults()),
        None,
        RouterConfig::default(),
    )
}

#[tokio::test]
async fn router_decisions_are_deterministic() {
    let router = hybrid_router();
    let queries = [
        "Show me the top strategic markets for expansion",
        "Which markets are statistical outliers or unusual areas?",
        "analysis of markets",
        "Paint me a picture of segment behavior",
    ];
    for query in queries {
        let a = router.route(query, None, Duration::from_millis(100)).await;
        let b = router.route(query, None, Duration::from_millis(100)).await;
        assert_eq!(a.endpoint, b.endpoint, "{query}");
        assert_eq!(a.confidence, b.confidence, "{query}");
        assert_eq!(a.user_response, b.user_response, "{query}");
        assert_eq!(a.alternatives, b.alternatives, "{query}");
        assert_eq!(a.reasoning, b.reasoning, "{query}");
    }
}

#[tokio::test]
async fn two_router_instances_agree() {
    let first = hybrid_router();
    let second = hybrid_router();
    let query = "Compare H&R Block usage between Alachua County and Miami-Dade County";
    let a = first.route(query, None, Duration::from_millis(100)).await;
    let b = second.route(query, None, Duration::from_millis(100)).await;
    assert_eq!(a.endpoint, b.endpoint);
    assert_eq!(a.confidence, b.confidence);
}

#[test]
fn processors_are_idempotent() {
    let registry = ProcessorRegistry::with_defaults(Arc::new(BrandResolver::with_defaults()));
    let raw = RawEndpointData::new(
        (0..25)
            .map(|i| {
                let mut record = serde_json::Map::new();
                record.insert("ID".into(), json!(format!("{:05}", 33100 + i)));
                record.insert(
                    "strategic_analysis_score".into(),
                    json!(1.0 + (i % 7) as f64),
                );
                record.insert("median_income".into(), json!(50_000 + i * 100));
                record
            })
            .collect(),
    );

    let processor = registry.get("strategic_analysis").unwrap();
    let opts = ProcessOptions::default();
    let a = processor.process(&raw, &opts).unwrap();
    let b = processor.process(&raw, &opts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn configuration_reload_is_idempotent() {
    let authority = ConfigAuthority::with_defaults();
    let before: Vec<_> = authority
        .descriptors()
        .iter()
        .map(|d| (**d).clone())
        .collect();
    let fingerprint_before = authority.catalog_fingerprint();
    let endpoints_before = authority.list_endpoints();

    for _ in 0..3 {
        authority.reload(default_catalog()).unwrap();
    }

    let after: Vec<_> = authority
        .descriptors()
        .iter()
        .map(|d| (**d).clone())
        .collect();
    assert_eq!(before, after);
    assert_eq!(fingerprint_before, authority.catalog_fingerprint());
    assert_eq!(endpoints_before, authority.list_endpoints());
}

#[test]
fn ranking_ties_break_by_area_id() {
    let registry = ProcessorRegistry::with_defaults(Arc::new(BrandResolver::with_defaults()));
    let raw = RawEndpointData::new(
        ["zeta", "alpha", "mid"]
            .iter()
            .map(|id| {
                let mut record = serde_json::Map::new();
                record.insert("ID".into(), json!(id));
                record.insert("analyze_score".into(), json!(5.0));
                record
            })
            .collect(),
    );
    let result = registry
        .get("analyze")
        .unwrap()
        .process(&raw, &ProcessOptions::default())
        .unwrap();
    let order: Vec<&str> = result.records.iter().map(|r| r.area_id.as_str()).collect();
    assert_eq!(order, vec!["alpha", "mid", "zeta"]);
    assert_eq!(
        result.records.iter().map(|r| r.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}
