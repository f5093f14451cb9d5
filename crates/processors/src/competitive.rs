//! Competitive analysis: 1-10 advantage scale, never raw market share.

use std::sync::Arc;

use brand::BrandResolver;
use serde_json::{Number, Value};

use crate::common::{shape, top_list, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "competitive_analysis_score";

/// Brand shares and demographics stay in `properties`; the LLM-facing
/// `value` must remain the 1-10 advantage score.
const CONTEXT_FIELDS: &[&str] = &["share", "income", "population", "market_gap", "expenditure"];

pub struct CompetitiveProcessor {
    brand: Arc<BrandResolver>,
}

impl CompetitiveProcessor {
    pub fn new(brand: Arc<BrandResolver>) -> Self {
        Self { brand }
    }
}

impl EndpointProcessor for CompetitiveProcessor {
    fn processor_id(&self) -> &str {
        "competitive_analysis"
    }

    fn endpoint(&self) -> &str {
        "/competitive-analysis"
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
            // Upstream jobs have shipped this field as 0-100 market share;
            // the divide-by-ten rule restores the 1-10 advantage scale.
            cap: ScoreCap::DivideBy10IfPercent,
        };
        let brand = self.brand.clone();
        let target = brand.target_brand_name().to_string();
        let competitor_names: Vec<String> = brand
            .competitors()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        shape(
            raw,
            opts,
            &spec,
            |raw_record, record| {
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
                    "Competitive advantage for {target} against {}: strongest in {}. \
                     Scores run 1-10; mean {:.1}.",
                    competitor_names.join(", "),
                    top_list(records, 5),
                    stats.mean
                )
            },
        )
    }
}
