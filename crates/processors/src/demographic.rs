//! Demographic insights: broad context retention by design.

use crate::common::{shape, top_list, ScoreCap, ShapeSpec};
use crate::types::{ProcessedResult, RawEndpointData};
use crate::{EndpointProcessor, ProcessOptions, ProcessorError};

const SCORE_FIELD: &str = "demographic_insights_score";

/// Deliberately wide: demographic questions need the full picture, not a
/// curated "target" subset.
const CONTEXT_FIELDS: &[&str] = &[
    "age",
    "income",
    "education",
    "household",
    "population",
    "family",
    "diversity",
    "employment",
    "median",
    "gen_",
    "married",
    "children",
    "owner",
    "renter",
];

pub struct DemographicProcessor;

impl EndpointProcessor for DemographicProcessor {
    fn processor_id(&self) -> &str {
        "demographic_insights"
    }

    fn endpoint(&self) -> &str {
        "/demographic-insights"
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
                "Demographic alignment across {} areas: strongest fits are {}. \
                 Median score {:.1}; the retained fields cover age, income, \
                 education, and household composition per area.",
                stats.count,
                top_list(records, 5),
                stats.median
            )
        })
    }
}
