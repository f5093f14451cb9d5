//! Customer profile: purchase propensity per area.
//!
//! One of the documented canonical-name exceptions: the score field is
//! `purchase_propensity`, carried by the catalog rather than special-cased
//! downstream.

use crate::common::{shape, top_list, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "purchase_propensity";

const CONTEXT_FIELDS: &[&str] = &[
    "propensity",
    "purchase",
    "income",
    "age",
    "household",
    "lifestyle",
    "loyalty",
];

pub struct CustomerProfileProcessor;

impl EndpointProcessor for CustomerProfileProcessor {
    fn processor_id(&self) -> &str {
        "customer_profile"
    }

    fn endpoint(&self) -> &str {
        "/customer-profile"
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
        shape(raw, opts, &spec, |_, _| {}, |records, stats| {
            format!(
                "Purchase propensity across {} areas: the most likely buyers live in {}. \
                 Mean propensity {:.1}; demographic context retained for persona \
                 narration.",
                stats.count,
                top_list(records, 5),
                stats.mean
            )
        })
    }
}
