//! Score statistics shared by every processor and the payload optimizer.

use serde::{Deserialize, Serialize};

/// Summary statistics over the canonical score. All zeros for an empty
/// record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub std: f64,
}

impl ScoreStatistics {
    /// Compute statistics over the finite values in `scores`.
    pub fn compute(scores: &[f64]) -> Self {
        let mut finite: Vec<f64> = scores.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }
        finite.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = finite.len();
        let min = finite[0];
        let max = finite[count - 1];
        let mean = finite.iter().sum::<f64>() / count as f64;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Self {
            count,
            min,
            max,
            mean,
            median: quantile(&finite, 0.5),
            p25: quantile(&finite, 0.25),
            p75: quantile(&finite, 0.75),
            std: variance.sqrt(),
        }
    }

    /// Inter-quartile-anchored ceiling used by the score sanity check.
    pub fn expected_ceiling(&self) -> f64 {
        let iqr = self.p75 - self.p25;
        self.p75 + 1.5 * iqr
    }
}

/// Linear-interpolated quantile over an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
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
