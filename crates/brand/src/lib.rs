//! Geoquery Brand Resolver
//!
//! Maps a project-configured target brand and its competitors onto whatever
//! field names the current dataset happens to use, so processors never
//! hard-code brand columns. Detection works on open records (JSON maps):
//! a configured brand whose field is absent is reported with a null value,
//! never fabricated as zero.
//!
//! Brand display names surface verbatim in downstream prose; the resolver
//! never invents brands that are not configured.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One brand: the dataset field carrying its share and the display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSpec {
    pub field: String,
    pub name: String,
}

impl BrandSpec {
    pub fn new(field: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
        }
    }
}

/// Project-level brand configuration: a single target plus ordered
/// competitors and an industry label for prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandConfig {
    pub target: BrandSpec,
    pub competitors: Vec<BrandSpec>,
    pub industry: String,
}

impl Default for BrandConfig {
    /// Tax-preparation vertical used by the seed scenarios.
    fn default() -> Self {
        Self {
            target: BrandSpec::new("hr_block_market_share", "H&R Block"),
            competitors: vec![
                BrandSpec::new("turbotax_market_share", "TurboTax"),
                BrandSpec::new("freetaxusa_market_share", "FreeTaxUSA"),
                BrandSpec::new("taxact_market_share", "TaxAct"),
            ],
            industry: "tax preparation services".into(),
        }
    }
}

/// A brand field found (or known-missing) on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedBrand {
    pub field: String,
    pub brand_name: String,
    /// `None` when the configured field is absent on this record.
    pub value: Option<f64>,
    pub is_target: bool,
}

/// Errors surfaced by the resolver.
#[derive(Debug, Clone, Error)]
pub enum BrandError {
    #[error("brand detection requires a record; got null input")]
    NullRecord,
}

const MARKET_GAP_FLOOR: f64 = 5.0;
const MARKET_GAP_CEILING: f64 = 95.0;

/// Resolves configured brands against arbitrary record shapes.
#[derive(Debug, Clone)]
pub struct BrandResolver {
    config: BrandConfig,
}

impl BrandResolver {
    pub fn new(config: BrandConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(BrandConfig::default())
    }

    pub fn config(&self) -> &BrandConfig {
        &self.config
    }

    pub fn target_brand_name(&self) -> &str {
        &self.config.target.name
    }

    pub fn target(&self) -> &BrandSpec {
        &self.config.target
    }

    /// Configured competitors in configuration order.
    pub fn competitors(&self) -> &[BrandSpec] {
        &self.config.competitors
    }

    pub fn industry(&self) -> &str {
        &self.config.industry
    }

    /// Detect every configured brand on a record, target first, then
    /// competitors in configuration order. Missing fields are reported with
    /// a null value rather than dropped, so callers can tell "not measured"
    /// from "zero share".
    pub fn detect_brand_fields(
        &self,
        record: Option<&Map<String, Value>>,
    ) -> Result<Vec<DetectedBrand>, BrandError> {
        let record = record.ok_or(BrandError::NullRecord)?;
        let mut detected = Vec::with_capacity(1 + self.config.competitors.len());
        detected.push(self.detect_one(record, &self.config.target, true));
        for competitor in &self.config.competitors {
            detected.push(self.detect_one(record, competitor, false));
        }
        Ok(detected)
    }

    fn detect_one(&self, record: &Map<String, Value>, spec: &BrandSpec, is_target: bool) -> DetectedBrand {
        DetectedBrand {
            field: spec.field.clone(),
            brand_name: spec.name.clone(),
            value: numeric_field(record, &spec.field),
            is_target,
        }
    }

    /// Unclaimed market percentage: `100 − (target + Σ competitors)`, with a
    /// missing share contributing zero. Clamped to [5, 95] so absent or
    /// over-100 share data cannot produce a pathological gap.
    pub fn market_gap(&self, record: Option<&Map<String, Value>>) -> Result<f64, BrandError> {
        let detected = self.detect_brand_fields(record)?;
        let claimed: f64 = detected.iter().filter_map(|brand| brand.value).sum();
        Ok((100.0 - claimed).clamp(MARKET_GAP_FLOOR, MARKET_GAP_CEILING))
    }

    /// Brands whose display name appears in the query text, target first.
    /// Matching is case-insensitive on the full display name.
    pub fn mentioned_brands(&self, query: &str) -> Vec<&BrandSpec> {
        let lowered = query.to_lowercase();
        let mut mentioned = Vec::new();
        if lowered.contains(&self.config.target.name.to_lowercase()) {
            mentioned.push(&self.config.target);
        }
        for competitor in &self.config.competitors {
            if lowered.contains(&competitor.name.to_lowercase()) {
                mentioned.push(competitor);
            }
        }
        mentioned
    }
}

fn numeric_field(record: &Map<String, Value>, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64).filter(|v| v.is_finite())
}
