//! YAML project configuration.
//!
//! A single file configures every stage: router thresholds, semantic model
//! assets, payload budgets, brand configuration, and per-endpoint
//! overrides on top of the built-in catalog. Loaded at startup and
//! re-applied atomically on reload.
//!
//! ```yaml
//! version: "1.0"
//! name: "tax-services"
//!
//! router:
//!   route_threshold: 0.55
//!   clarify_floor: 0.35
//!   verification_threshold: 0.75
//!
//! semantic:
//!   mode: "onnx"
//!   model_name: "bge-small-en-v1.5"
//!   model_path: "./models/bge-small-en-v1.5/onnx/model.onnx"
//!   tokenizer_path: "./models/bge-small-en-v1.5/tokenizer.json"
//!
//! payload:
//!   byte_budget: 20480
//!   force_threshold: 200
//!
//! brand:
//!   target: { field: "hr_block_market_share", name: "H&R Block" }
//!   competitors:
//!     - { field: "turbotax_market_share", name: "TurboTax" }
//!   industry: "tax preparation services"
//!
//! endpoints:
//!   - id: "/strategic-analysis"
//!     confidence_threshold: 0.6
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use authority::{default_catalog, EndpointDescriptor};
use brand::BrandConfig;
use payload::PayloadConfig;
use router::{RouterConfig, Thresholds};
use semantic::SemanticConfig;

/// Errors raised while loading the project configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeoqueryConfig {
    /// Configuration format version.
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub router: RouterYamlConfig,

    #[serde(default)]
    pub semantic: SemanticYamlConfig,

    #[serde(default)]
    pub payload: PayloadYamlConfig,

    #[serde(default)]
    pub brand: Option<BrandConfig>,

    /// Per-endpoint overrides applied on top of the built-in catalog.
    #[serde(default)]
    pub endpoints: Vec<EndpointOverride>,

    #[serde(default)]
    pub georef: GeoRefYamlConfig,

    #[serde(default)]
    pub data: DataYamlConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RouterYamlConfig {
    pub route_threshold: f64,
    pub clarify_floor: f64,
    pub verification_threshold: f64,
    pub semantic_floor: f64,
    pub keyword_floor: f64,
    /// Disable the semantic layer entirely.
    pub semantic_enabled: bool,
}

impl Default for RouterYamlConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        let router = RouterConfig::default();
        Self {
            route_threshold: thresholds.route,
            clarify_floor: thresholds.clarify_floor,
            verification_threshold: router.verification_threshold,
            semantic_floor: router.semantic_floor,
            keyword_floor: router.keyword_floor,
            semantic_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SemanticYamlConfig {
    pub mode: String,
    pub model_name: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub init_timeout_ms: u64,
    pub request_budget_ms: u64,
}

impl Default for SemanticYamlConfig {
    fn default() -> Self {
        let cfg = SemanticConfig::default();
        Self {
            mode: cfg.mode,
            model_name: cfg.model_name,
            model_path: cfg.model_path,
            tokenizer_path: cfg.tokenizer_path,
            cache_dir: cfg.cache_dir,
            init_timeout_ms: cfg.init_timeout_ms,
            request_budget_ms: cfg.request_budget_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PayloadYamlConfig {
    pub byte_budget: usize,
    pub hard_ceiling: usize,
    pub force_threshold: usize,
    pub size_threshold: usize,
}

impl Default for PayloadYamlConfig {
    fn default() -> Self {
        let cfg = PayloadConfig::default();
        Self {
            byte_budget: cfg.byte_budget,
            hard_ceiling: cfg.hard_ceiling,
            force_threshold: cfg.force_threshold,
            size_threshold: cfg.size_threshold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeoRefYamlConfig {
    /// Remote reference service base URL; `None` keeps the static table.
    pub base_url: Option<String>,
    #[serde(default = "GeoRefYamlConfig::default_deadline_ms")]
    pub lookup_deadline_ms: u64,
}

impl GeoRefYamlConfig {
    fn default_deadline_ms() -> u64 {
        500
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataYamlConfig {
    pub load_deadline_ms: u64,
    pub retry_delay_ms: u64,
}

impl Default for DataYamlConfig {
    fn default() -> Self {
        Self {
            load_deadline_ms: 5_000,
            retry_delay_ms: 150,
        }
    }
}

/// Override of a single catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointOverride {
    pub id: String,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub score_field: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GeoqueryConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(0.0..=1.0).contains(&self.router.route_threshold) {
            return Err(ConfigLoadError::Validation(
                "router.route_threshold must be within [0, 1]".into(),
            ));
        }
        if self.router.clarify_floor > self.router.route_threshold {
            return Err(ConfigLoadError::Validation(
                "router.clarify_floor must not exceed router.route_threshold".into(),
            ));
        }
        if self.payload.byte_budget > self.payload.hard_ceiling {
            return Err(ConfigLoadError::Validation(
                "payload.byte_budget must not exceed payload.hard_ceiling".into(),
            ));
        }
        if self.payload.hard_ceiling == 0 || self.payload.force_threshold == 0 {
            return Err(ConfigLoadError::Validation(
                "payload budgets must be non-zero".into(),
            ));
        }
        let mut seen = HashMap::new();
        for endpoint in &self.endpoints {
            if seen.insert(&endpoint.id, ()).is_some() {
                return Err(ConfigLoadError::Validation(format!(
                    "duplicate endpoint override: {}",
                    endpoint.id
                )));
            }
        }
        Ok(())
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            thresholds: Thresholds {
                route: self.router.route_threshold,
                clarify_floor: self.router.clarify_floor,
            },
            verification_threshold: self.router.verification_threshold,
            semantic_floor: self.router.semantic_floor,
            keyword_floor: self.router.keyword_floor,
        }
    }

    pub fn semantic_config(&self) -> SemanticConfig {
        SemanticConfig {
            mode: self.semantic.mode.clone(),
            model_name: self.semantic.model_name.clone(),
            model_path: self.semantic.model_path.clone(),
            tokenizer_path: self.semantic.tokenizer_path.clone(),
            cache_dir: self.semantic.cache_dir.clone(),
            init_timeout_ms: self.semantic.init_timeout_ms,
            request_budget_ms: self.semantic.request_budget_ms,
            ..SemanticConfig::default()
        }
    }

    pub fn payload_config(&self) -> PayloadConfig {
        PayloadConfig {
            byte_budget: self.payload.byte_budget,
            hard_ceiling: self.payload.hard_ceiling,
            force_threshold: self.payload.force_threshold,
            size_threshold: self.payload.size_threshold,
        }
    }

    pub fn brand_config(&self) -> BrandConfig {
        self.brand.clone().unwrap_or_default()
    }

    /// The built-in catalog with this project's overrides applied.
    pub fn catalog(&self) -> Vec<EndpointDescriptor> {
        let mut catalog = default_catalog();
        for patch in &self.endpoints {
            if let Some(descriptor) = catalog.iter_mut().find(|d| d.id == patch.id) {
                if let Some(threshold) = patch.confidence_threshold {
                    descriptor.confidence_threshold = Some(threshold);
                }
                if let Some(score_field) = &patch.score_field {
                    descriptor.score_field = score_field.clone();
                }
                if let Some(description) = &patch.description {
                    descriptor.description = description.clone();
                }
            }
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GeoqueryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.router.route_threshold, 0.55);
        assert_eq!(config.payload.byte_budget, 20 * 1024);
        assert_eq!(config.data.load_deadline_ms, 5_000);
    }

    #[test]
    fn yaml_round_trip_with_overrides() {
        let yaml = r#"
version: "1.0"
name: "tax-services"
router:
  route_threshold: 0.6
  clarify_floor: 0.4
  verification_threshold: 0.8
  semantic_floor: 0.5
  keyword_floor: 1.5
  semantic_enabled: true
semantic:
  mode: "stub"
  model_name: "hashed-bow"
  model_path: "./model.onnx"
  tokenizer_path: "./tokenizer.json"
  cache_dir: null
  init_timeout_ms: 2000
  request_budget_ms: 100
payload:
  byte_budget: 10240
  hard_ceiling: 51200
  force_threshold: 100
  size_threshold: 51200
brand:
  target: { field: "hr_block_market_share", name: "H&R Block" }
  competitors:
    - { field: "turbotax_market_share", name: "TurboTax" }
  industry: "tax preparation services"
endpoints:
  - id: "/strategic-analysis"
    confidence_threshold: 0.65
"#;
        let config = GeoqueryConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.router.route_threshold, 0.6);
        assert_eq!(config.payload.force_threshold, 100);

        let catalog = config.catalog();
        let strategic = catalog.iter().find(|d| d.id == "/strategic-analysis").unwrap();
        assert_eq!(strategic.confidence_threshold, Some(0.65));
        // Untouched entries keep their defaults.
        assert_eq!(catalog.len(), 25);
    }

    #[test]
    fn invalid_thresholds_rejected() {
        let yaml = r#"
router:
  route_threshold: 0.3
  clarify_floor: 0.5
  verification_threshold: 0.75
  semantic_floor: 0.5
  keyword_floor: 1.0
  semantic_enabled: true
"#;
        let err = GeoqueryConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }

    #[test]
    fn duplicate_endpoint_overrides_rejected() {
        let mut config = GeoqueryConfig::default();
        config.endpoints = vec![
            EndpointOverride {
                id: "/analyze".into(),
                ..EndpointOverride::default()
            },
            EndpointOverride {
                id: "/analyze".into(),
                ..EndpointOverride::default()
            },
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn conversions_carry_values_through() {
        let config = GeoqueryConfig::default();
        let router = config.router_config();
        assert_eq!(router.thresholds.route, 0.55);
        let payload = config.payload_config();
        assert_eq!(payload.hard_ceiling, 50 * 1024);
        let semantic = config.semantic_config();
        assert_eq!(semantic.embedding_dim, 384);
    }
}
