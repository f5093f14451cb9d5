//! Strategic analysis: market-expansion ranking.

use std::sync::Arc;

use brand::BrandResolver;
use serde_json::{Number, Value};

use crate::common::{shape, top_list, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "strategic_analysis_score";

/// Market-expansion demographics retained for the LLM's focus.
const CONTEXT_FIELDS: &[&str] = &[
    "income",
    "purchasing",
    "spending",
    "diversity",
    "opportunity",
    "population",
    "growth",
    "market_gap",
    "share",
];

pub struct StrategicProcessor {
    brand: Arc<BrandResolver>,
}

impl StrategicProcessor {
    pub fn new(brand: Arc<BrandResolver>) -> Self {
        Self { brand }
    }
}

impl EndpointProcessor for StrategicProcessor {
    fn processor_id(&self) -> &str {
        "strategic_analysis"
    }

    fn endpoint(&self) -> &str {
        "/strategic-analysis"
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
        let brand = self.brand.clone();
        let target = brand.target_brand_name().to_string();
        shape(
            raw,
            opts,
            &spec,
            |raw_record, record| {
                // Unclaimed market share strengthens the expansion story.
                if let Ok(gap) = brand.market_gap(Some(raw_record)) {
                    if let Some(number) = Number::from_f64(gap) {
                        record
                            .properties
                            .insert("market_gap".into(), Value::Number(number));
                    }
                }
            },
            |records, stats| {
                format!(
                    "Top strategic expansion targets for {target}: {}. \
                     {} areas scored; mean {:.1}, top quartile above {:.1}.",
                    top_list(records, 5),
                    stats.count,
                    stats.mean,
                    stats.p75
                )
            },
        )
    }
}
