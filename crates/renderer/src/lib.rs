//! Geoquery Renderer Spec Builder
//!
//! Produces a quartile class-break renderer over the canonical score of a
//! processed result. The `field` must match the Configuration Authority's
//! target variable exactly - it is the same name every record carries at
//! its top level, which is what keeps the map symbology, the popup, and
//! the LLM narration in agreement.

mod palette;

pub use palette::{class_colors, Rgba, DEFAULT_SYMBOL_COLOR};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use authority::{PaletteFamily, RendererDefaults};
use processors::ProcessedResult;

/// Wire schema: one class interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBreak {
    pub min: f64,
    pub max: f64,
    pub color: Rgba,
    pub label: String,
}

/// Wire schema: the class-break renderer spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererSpec {
    /// Always `"class_breaks"`.
    pub kind: String,
    /// Canonical score field name; exists on every record.
    pub field: String,
    pub breaks: Vec<ClassBreak>,
    pub default_symbol: DefaultSymbol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSymbol {
    pub color: Rgba,
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// A record is missing the renderer field or carries a non-finite
    /// value there; the renderer/record agreement invariant is broken.
    #[error("record {area_id} lacks a finite value for renderer field {field}")]
    FieldMissing { area_id: String, field: String },
}

/// Build the renderer spec for a processed result.
///
/// `field` comes from the Configuration Authority. Empty results produce a
/// spec with no classes and only the neutral default symbol; a single
/// unique value produces one class spanning `[min, max]`.
pub fn build_renderer(
    result: &ProcessedResult,
    field: &str,
    defaults: &RendererDefaults,
) -> Result<RendererSpec, RenderError> {
    let mut values = Vec::with_capacity(result.records.len());
    for record in &result.records {
        let value = record
            .canonical
            .get(field)
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| RenderError::FieldMissing {
                area_id: record.area_id.clone(),
                field: field.to_string(),
            })?;
        values.push(value);
    }

    Ok(RendererSpec {
        kind: "class_breaks".into(),
        field: field.to_string(),
        breaks: quartile_breaks(&values, defaults),
        default_symbol: DefaultSymbol {
            color: DEFAULT_SYMBOL_COLOR,
        },
    })
}

fn quartile_breaks(values: &[f64], defaults: &RendererDefaults) -> Vec<ClassBreak> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let classes = defaults.classes.max(1);
    let colors = class_colors(defaults.palette, classes);

    if (max - min).abs() < f64::EPSILON {
        // Single unique value: one class spanning [min, max].
        return vec![ClassBreak {
            min,
            max,
            color: colors[colors.len() / 2],
            label: format!("{:.1}", round1(min)),
        }];
    }

    let edges = break_edges(&sorted, min, max, classes, defaults.palette);
    let mut breaks = Vec::with_capacity(classes);
    for (index, window) in edges.windows(2).enumerate() {
        let (lower, upper) = (window[0], window[1]);
        breaks.push(ClassBreak {
            min: lower,
            max: upper,
            color: colors[index.min(colors.len() - 1)],
            label: format!("{:.1} – {:.1}", round1(lower), round1(upper)),
        });
    }
    breaks
}

/// Quartile edges for sequential palettes; symmetric edges around zero for
/// diverging palettes so the neutral class sits on the zero crossing.
fn break_edges(
    sorted: &[f64],
    min: f64,
    max: f64,
    classes: usize,
    palette: PaletteFamily,
) -> Vec<f64> {
    match palette {
        PaletteFamily::Diverging if min < 0.0 && max > 0.0 && classes >= 2 => {
            // Each side scales independently so the zero crossing is always
            // an edge, whatever the sign balance of the data.
            let below = classes / 2;
            let above = classes - below;
            let mut edges = Vec::with_capacity(classes + 1);
            for i in 0..=below {
                if i == below {
                    edges.push(0.0);
                } else {
                    edges.push(min * (1.0 - i as f64 / below as f64));
                }
            }
            for j in 1..=above {
                edges.push(max * (j as f64 / above as f64));
            }
            edges
        }
        _ => {
            let mut edges = Vec::with_capacity(classes + 1);
            edges.push(min);
            for i in 1..classes {
                edges.push(quantile(sorted, i as f64 / classes as f64));
            }
            edges.push(max);
            edges
        }
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = position - lower as f64;
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
