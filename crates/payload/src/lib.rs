//! Geoquery Payload Optimizer
//!
//! Replaces per-feature enumeration with a bounded, analysis-aware summary
//! the narrating LLM can actually use: a statistical foundation, the
//! analytically interesting extremes, optional regional clusters and
//! outliers, and a directive telling the model what to emphasize.
//!
//! The optimizer owns the outbound size contract: the serialized summary
//! never exceeds the hard ceiling (50 KB), whatever the caller asked for,
//! and a failure in summary construction degrades to a minimal safe
//! summary - never back to full enumeration once the force threshold has
//! fired.

mod profile;

pub use profile::{directive_for, profile_for, AnalysisProfile, OutlierMode};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use authority::EndpointFamily;
use processors::{ProcessedRecord, ProcessedResult, ScoreStatistics};

/// Size and triggering knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// Target serialized size for an optimized summary.
    pub byte_budget: usize,
    /// Absolute outbound ceiling; never exceeded.
    pub hard_ceiling: usize,
    /// Record count at which optimization is forced.
    pub force_threshold: usize,
    /// Estimated full-enumeration size at which optimization is forced.
    pub size_threshold: usize,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            byte_budget: 20 * 1024,
            hard_ceiling: 50 * 1024,
            force_threshold: 200,
            size_threshold: 50 * 1024,
        }
    }
}

/// Maximum context fields carried per summarized area.
const MAX_EXTRAS: usize = 3;
/// |z| beyond which a record is an outlier.
const OUTLIER_Z: f64 = 2.0;

#[derive(Debug, Error)]
pub enum PayloadError {
    /// Even the minimal safe summary could not fit the hard ceiling.
    #[error("payload exceeds hard ceiling even after truncation: {size} bytes")]
    Oversize { size: usize },
}

/// One area in the top/bottom blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub area_id: String,
    pub area_name: String,
    pub value: f64,
    pub rank: u32,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialClusterSummary {
    pub region: String,
    pub size: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub area_id: String,
    pub area_name: String,
    pub value: f64,
    pub z: f64,
}

/// The bounded summary sent to the LLM instead of full enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadSummary {
    pub statistics: ScoreStatistics,
    pub top: Vec<AreaSummary>,
    pub bottom: Vec<AreaSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_clusters: Option<Vec<SpatialClusterSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers: Option<Vec<OutlierSummary>>,
    pub directive: String,
    pub total_records: usize,
    /// False when the orchestrator passed the full set through instead.
    pub optimized: bool,
}

impl PayloadSummary {
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

/// Whether the optimizer must run for this result.
pub fn should_optimize(result: &ProcessedResult, cfg: &PayloadConfig) -> bool {
    result.records.len() >= cfg.force_threshold
        || estimated_full_size(result) > cfg.size_threshold
}

/// Cheap estimate of the full-enumeration size: first record's serialized
/// size times the record count.
pub fn estimated_full_size(result: &ProcessedResult) -> usize {
    let Some(first) = result.records.first() else {
        return 2;
    };
    let per_record = serde_json::to_vec(first).map(|v| v.len()).unwrap_or(256);
    per_record * result.records.len()
}

/// Build the bounded summary. Always succeeds with something ≤ the hard
/// ceiling; internal failures degrade to the minimal safe summary.
pub fn optimize(
    result: &ProcessedResult,
    family: EndpointFamily,
    cfg: &PayloadConfig,
) -> Result<PayloadSummary, PayloadError> {
    let profile = profile_for(family);
    let mut summary = build_summary(result, family, &profile);

    let mut size = summary.serialized_size();
    if size <= cfg.byte_budget {
        return Ok(summary);
    }
    debug!(size, budget = cfg.byte_budget, "payload over budget; truncating");

    // Degrade gracefully: drop extras, then shave the lists.
    for area in summary.top.iter_mut().chain(summary.bottom.iter_mut()) {
        area.extras.clear();
    }
    size = summary.serialized_size();
    while size > cfg.byte_budget
        && (summary.top.len() > 3
            || summary.bottom.len() > 1
            || summary.outliers.as_ref().map(Vec::len).unwrap_or(0) > 3)
    {
        if summary.top.len() > 3 {
            summary.top.pop();
        }
        if summary.bottom.len() > 1 {
            summary.bottom.pop();
        }
        if let Some(outliers) = &mut summary.outliers {
            if outliers.len() > 3 {
                outliers.pop();
            }
        }
        size = summary.serialized_size();
    }

    if size > cfg.hard_ceiling {
        warn!(size, "payload still oversize; falling back to minimal summary");
        summary = minimal_summary(result, family);
        size = summary.serialized_size();
        if size > cfg.hard_ceiling {
            return Err(PayloadError::Oversize { size });
        }
    }
    Ok(summary)
}

/// Statistics plus top 3 - the smallest payload that still answers the
/// question.
pub fn minimal_summary(result: &ProcessedResult, family: EndpointFamily) -> PayloadSummary {
    PayloadSummary {
        statistics: result.statistics.clone(),
        top: result.records.iter().take(3).map(|r| area_summary(r, 0)).collect(),
        bottom: Vec::new(),
        spatial_clusters: None,
        outliers: None,
        directive: directive_for(family).to_string(),
        total_records: result.records.len(),
        optimized: true,
    }
}

fn build_summary(
    result: &ProcessedResult,
    family: EndpointFamily,
    profile: &AnalysisProfile,
) -> PayloadSummary {
    let records = &result.records;

    let top: Vec<AreaSummary> = records
        .iter()
        .take(profile.top)
        .map(|r| area_summary(r, MAX_EXTRAS))
        .collect();
    let bottom: Vec<AreaSummary> = records
        .iter()
        .rev()
        .take(profile.bottom.min(records.len().saturating_sub(profile.top)))
        .map(|r| area_summary(r, MAX_EXTRAS))
        .collect();

    let spatial_clusters = profile
        .spatial_clusters
        .then(|| regional_clusters(records))
        .filter(|clusters| !clusters.is_empty());

    let outliers = match profile.outliers {
        OutlierMode::None => None,
        OutlierMode::All => Some(find_outliers(records, &result.statistics)),
    };

    PayloadSummary {
        statistics: result.statistics.clone(),
        top,
        bottom,
        spatial_clusters,
        outliers,
        directive: directive_for(family).to_string(),
        total_records: records.len(),
        optimized: true,
    }
}

fn area_summary(record: &ProcessedRecord, max_extras: usize) -> AreaSummary {
    let mut extras = Map::new();
    for (key, value) in record.properties.iter().take(max_extras) {
        extras.insert(key.clone(), value.clone());
    }
    AreaSummary {
        area_id: record.area_id.clone(),
        area_name: record.area_name.clone(),
        value: record.value,
        rank: record.rank,
        extras,
    }
}

/// Group by the three-digit ZIP prefix (or the leading token of the area
/// id) into regional clusters with size and mean score.
fn regional_clusters(records: &[ProcessedRecord]) -> Vec<SpatialClusterSummary> {
    let mut sums: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for record in records {
        let region = if record.area_id.len() >= 3
            && record.area_id.bytes().all(|b| b.is_ascii_digit())
        {
            format!("{}xx", &record.area_id[..3])
        } else {
            record
                .area_id
                .split(|c: char| !c.is_alphanumeric())
                .next()
                .unwrap_or("other")
                .to_string()
        };
        let entry = sums.entry(region).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.value;
    }
    let mut clusters: Vec<SpatialClusterSummary> = sums
        .into_iter()
        .map(|(region, (size, sum))| SpatialClusterSummary {
            region,
            size,
            mean: sum / size as f64,
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.region.cmp(&b.region))
    });
    clusters.truncate(10);
    clusters
}

fn find_outliers(records: &[ProcessedRecord], stats: &ScoreStatistics) -> Vec<OutlierSummary> {
    if stats.std == 0.0 {
        return Vec::new();
    }
    records
        .iter()
        .filter_map(|record| {
            let z = (record.value - stats.mean) / stats.std;
            (z.abs() > OUTLIER_Z).then(|| OutlierSummary {
                area_id: record.area_id.clone(),
                area_name: record.area_name.clone(),
                value: record.value,
                z,
            })
        })
        .collect()
}
