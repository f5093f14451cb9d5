use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::stats::ScoreStatistics;

/// Pre-computed endpoint file contents: a success flag and an ordered
/// sequence of open records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEndpointData {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<Map<String, Value>>,
}

impl RawEndpointData {
    pub fn new(results: Vec<Map<String, Value>>) -> Self {
        Self {
            success: true,
            results,
        }
    }
}

/// One normalized, ranked area record.
///
/// The canonical score appears twice by contract: as `value` and under the
/// endpoint's canonical field name (carried in `canonical`, which
/// serializes flattened at the top level so the renderer and popup find it
/// by name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub area_id: String,
    pub area_name: String,
    pub value: f64,
    /// Dense 1-based rank by descending value, ties broken by area id.
    pub rank: u32,
    #[serde(flatten)]
    pub canonical: Map<String, Value>,
    /// Retained context fields; never shadows `value` or the canonical
    /// score under another alias.
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_a_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_b_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_dominance: Option<f64>,
}

impl ProcessedRecord {
    pub fn new(area_id: String, area_name: String, value: f64, canonical_field: &str) -> Self {
        let mut record = Self {
            area_id,
            area_name,
            value,
            rank: 0,
            canonical: Map::new(),
            properties: Map::new(),
            brand_a_name: None,
            brand_b_name: None,
            brand_dominance: None,
        };
        record.set_canonical(canonical_field, value);
        record
    }

    /// Replace the canonical entry, leaving exactly one. Used both by
    /// processors and by the orchestrator's authority override.
    pub fn set_canonical(&mut self, field: &str, value: f64) {
        self.canonical.clear();
        let number = Number::from_f64(value).unwrap_or_else(|| Number::from(0));
        self.canonical.insert(field.to_string(), Value::Number(number));
        self.value = value;
    }

    /// The single canonical field name on this record.
    pub fn canonical_field(&self) -> Option<&str> {
        self.canonical.keys().next().map(String::as_str)
    }

    pub fn canonical_score(&self) -> Option<f64> {
        self.canonical.values().next().and_then(Value::as_f64)
    }
}

/// A processor's complete output for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// Endpoint identifier, e.g. `/strategic-analysis`.
    #[serde(rename = "type")]
    pub kind: String,
    pub records: Vec<ProcessedRecord>,
    /// Canonical score field name; overwritten by the Configuration
    /// Authority before rendering.
    pub target_variable: String,
    pub statistics: ScoreStatistics,
    pub summary: String,
    /// Count of raw records skipped for per-record failures.
    #[serde(default)]
    pub skipped_records: usize,
}
