//! Cluster analysis: behavioral grouping by metric similarity.

use std::collections::BTreeMap;

use crate::common::{shape, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "cluster_analysis_score";

const CONTEXT_FIELDS: &[&str] = &["cluster", "centroid", "similarity", "distance"];

pub struct ClusterAnalysisProcessor;

impl EndpointProcessor for ClusterAnalysisProcessor {
    fn processor_id(&self) -> &str {
        "cluster_analysis"
    }

    fn endpoint(&self) -> &str {
        "/cluster-analysis"
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
            let mut by_cluster: BTreeMap<String, (usize, f64)> = BTreeMap::new();
            for record in &result.records {
                let cluster = record
                    .properties
                    .get("cluster_id")
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "unassigned".into());
                let entry = by_cluster.entry(cluster).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += record.value;
            }
            let portrait = by_cluster
                .iter()
                .map(|(cluster, (size, sum))| {
                    format!("{cluster} ({size} areas, avg {:.1})", sum / *size as f64)
                })
                .collect::<Vec<_>>()
                .join("; ");
            result.summary = format!(
                "Behavioral clusters across {} areas: {portrait}. Cluster id and \
                 centroid distance retained per area.",
                result.statistics.count
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn clusters_summarized_with_averages() {
        let mut a = Map::new();
        a.insert("ID".into(), json!("a"));
        a.insert(SCORE_FIELD.into(), json!(6.0));
        a.insert("cluster_id".into(), json!("urban-core"));
        let mut b = Map::new();
        b.insert("ID".into(), json!("b"));
        b.insert(SCORE_FIELD.into(), json!(4.0));
        b.insert("cluster_id".into(), json!("urban-core"));

        let raw = RawEndpointData::new(vec![a, b]);
        let result = ClusterAnalysisProcessor
            .process(&raw, &ProcessOptions::default())
            .unwrap();
        assert!(result.summary.contains("urban-core (2 areas, avg 5.0)"));
    }
}
