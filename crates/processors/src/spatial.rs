//! Spatial clusters: cluster membership and centroid distance per area.

use std::collections::BTreeMap;

use crate::common::{shape, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "spatial_clusters_score";

const CONTEXT_FIELDS: &[&str] = &["cluster", "centroid", "distance", "region"];

pub struct SpatialClustersProcessor;

impl EndpointProcessor for SpatialClustersProcessor {
    fn processor_id(&self) -> &str {
        "spatial_clusters"
    }

    fn endpoint(&self) -> &str {
        "/spatial-clusters"
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

        if !result.records.is_empty() {
            let mut cluster_sizes: BTreeMap<String, usize> = BTreeMap::new();
            for record in &result.records {
                let cluster = record
                    .properties
                    .get("cluster_id")
                    .map(value_label)
                    .unwrap_or_else(|| "unassigned".to_string());
                *cluster_sizes.entry(cluster).or_insert(0) += 1;
            }
            let breakdown = cluster_sizes
                .iter()
                .map(|(cluster, size)| format!("cluster {cluster}: {size} areas"))
                .collect::<Vec<_>>()
                .join("; ");
            result.summary = format!(
                "{} spatial clusters over {} areas - {breakdown}. Cluster id and \
                 centroid distance are retained per area.",
                cluster_sizes.len(),
                result.statistics.count
            );
        }
        Ok(result)
    }
}

fn value_label(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
