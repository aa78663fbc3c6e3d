//! Partial dependence results

use crate::dataset::FeatureValue;
use crate::error::{EffectError, Result};
use crate::grid::GridSpec;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Result of a partial dependence computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectCurve {
    /// Grid the feature(s) were swept over
    pub grid: GridSpec,
    /// Mean prediction at each grid point (row-major for pair grids)
    pub values: Vec<f64>,
    /// Population standard deviation of the per-row predictions at each grid point
    pub std: Vec<f64>,
}

impl EffectCurve {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature names the curve was computed for
    pub fn features(&self) -> Vec<&str> {
        self.grid.features()
    }

    /// (grid value, mean prediction) pairs; `None` for pair grids
    pub fn points(&self) -> Option<Vec<(FeatureValue, f64)>> {
        match &self.grid {
            GridSpec::Single(grid) => Some(
                grid.values()
                    .iter()
                    .cloned()
                    .zip(self.values.iter().copied())
                    .collect(),
            ),
            GridSpec::Pair(_) => None,
        }
    }

    /// Mean prediction at an exact grid value; single-feature curves only
    pub fn value_at(&self, value: &FeatureValue) -> Option<f64> {
        match &self.grid {
            GridSpec::Single(grid) => grid.position(value).map(|idx| self.values[idx]),
            GridSpec::Pair(_) => None,
        }
    }

    /// Values reshaped to (first.len(), second.len()); `None` for single-feature curves
    pub fn as_matrix(&self) -> Option<Array2<f64>> {
        match &self.grid {
            GridSpec::Single(_) => None,
            GridSpec::Pair(pair) => Array2::from_shape_vec(pair.shape(), self.values.clone()).ok(),
        }
    }

    /// Average spread of individual predictions around the curve
    pub fn heterogeneity(&self) -> f64 {
        if self.std.is_empty() {
            return 0.0;
        }
        self.std.iter().sum::<f64>() / self.std.len() as f64
    }

    /// Friedman's H² interaction statistic for a two-feature curve
    ///
    /// `first` and `second` must be the one-feature curves computed on the
    /// two axes of this curve's pair grid. Each curve is mean-centered; the
    /// result is the share of the pair curve's variance not explained by the
    /// sum of the two one-feature curves. A flat pair curve yields 0.
    pub fn interaction_strength(&self, first: &EffectCurve, second: &EffectCurve) -> Result<f64> {
        let pair = match &self.grid {
            GridSpec::Pair(pair) => pair,
            GridSpec::Single(grid) => {
                return Err(EffectError::InvalidInput(format!(
                    "Interaction strength needs a two-feature curve, got '{}' alone",
                    grid.feature()
                )))
            }
        };

        let (n1, n2) = pair.shape();
        let axes_match = matches!(&first.grid, GridSpec::Single(g) if g == pair.first())
            && matches!(&second.grid, GridSpec::Single(g) if g == pair.second());
        if !axes_match {
            return Err(EffectError::InvalidInput(
                "One-feature curves must be computed on the pair grid's axes".to_string(),
            ));
        }

        let pair_mean = mean(&self.values);
        let first_mean = mean(&first.values);
        let second_mean = mean(&second.values);

        let mut ss_residual = 0.0;
        let mut ss_total = 0.0;
        for i in 0..n1 {
            for j in 0..n2 {
                let joint = self.values[i * n2 + j] - pair_mean;
                let additive = (first.values[i] - first_mean) + (second.values[j] - second_mean);
                ss_residual += (joint - additive).powi(2);
                ss_total += joint.powi(2);
            }
        }

        if ss_total > 0.0 {
            Ok(ss_residual / ss_total)
        } else {
            Ok(0.0)
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean and population standard deviation of one prediction batch
pub(crate) fn mean_std(predictions: &[f64]) -> (f64, f64) {
    let mu = mean(predictions);
    let variance =
        predictions.iter().map(|p| (p - mu).powi(2)).sum::<f64>() / predictions.len() as f64;
    (mu, variance.sqrt())
}
