//! Sweep grids for partial dependence
//!
//! Grids are a pure function of the dataset's observed values:
//! - Continuous features: distinct observed values (default), or `k` evenly
//!   spaced points between the observed min/max or two percentiles
//! - Categorical features: distinct labels in first-seen order
//! - Feature pairs: the Cartesian product of the two 1D grids

mod spec;

pub use spec::{FeatureGrid, GridSpec, PairGrid};

use crate::dataset::{Dataset, FeatureKind, FeatureValue};
use crate::error::{EffectError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of points for fixed-resolution grids
pub const DEFAULT_RESOLUTION: usize = 20;

/// Pair grids above this many points trigger a warning
pub const PAIR_GRID_WARN_POINTS: usize = 2500;

/// How continuous features are discretized
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStrategy {
    /// Every distinct observed value
    #[default]
    Distinct,
    /// `resolution` evenly spaced points from the observed min to max
    Uniform { resolution: usize },
    /// `resolution` evenly spaced points between two percentiles (0-100)
    Percentile {
        resolution: usize,
        lower: f64,
        upper: f64,
    },
}

/// Builds deterministic grids from a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridBuilder {
    strategy: GridStrategy,
}

impl GridBuilder {
    /// Grid builder using distinct observed values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy
    pub fn with_strategy(mut self, strategy: GridStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use `resolution` evenly spaced points between min and max
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.strategy = GridStrategy::Uniform { resolution };
        self
    }

    /// Use `resolution` evenly spaced points between two percentiles
    pub fn with_percentile_range(mut self, resolution: usize, lower: f64, upper: f64) -> Self {
        self.strategy = GridStrategy::Percentile {
            resolution,
            lower,
            upper,
        };
        self
    }

    pub fn strategy(&self) -> GridStrategy {
        self.strategy
    }

    /// Check strategy parameters
    pub fn validate(&self) -> Result<()> {
        match self.strategy {
            GridStrategy::Distinct => Ok(()),
            GridStrategy::Uniform { resolution } => validate_resolution(resolution),
            GridStrategy::Percentile {
                resolution,
                lower,
                upper,
            } => {
                validate_resolution(resolution)?;
                if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper
                {
                    return Err(EffectError::InvalidParameter {
                        name: "percentile_range".to_string(),
                        value: format!("({}, {})", lower, upper),
                        reason: "must satisfy 0 <= lower < upper <= 100".to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Grid for a single feature
    pub fn build(&self, data: &Dataset, feature: &str) -> Result<FeatureGrid> {
        self.validate()?;
        let descriptor = data.descriptor(feature)?;
        let column = data.column(feature)?;

        if column.is_empty() {
            return Err(EffectError::InsufficientData {
                feature: feature.to_string(),
                reason: "no observed values".to_string(),
            });
        }

        let values: Vec<FeatureValue> = match descriptor.kind {
            FeatureKind::Categorical => {
                let mut seen: HashSet<Arc<str>> = HashSet::new();
                column
                    .iter()
                    .filter(|v| match v {
                        FeatureValue::Categorical(label) => seen.insert(Arc::clone(label)),
                        FeatureValue::Numeric(_) => false,
                    })
                    .collect()
            }
            FeatureKind::Continuous => {
                let observed = column.numeric_values().ok_or_else(|| {
                    EffectError::DataError(format!("Column '{}' is not numeric", feature))
                })?;
                let points = self.continuous_points(&observed);
                let mut clipped: Vec<f64> = points.into_iter().map(|v| descriptor.clip(v)).collect();
                clipped.dedup();
                clipped.into_iter().map(FeatureValue::Numeric).collect()
            }
        };

        let grid = FeatureGrid::new(feature.to_string(), descriptor.kind, values);
        debug!(
            feature = feature,
            kind = %descriptor.kind,
            grid_points = grid.len(),
            "Built feature grid"
        );
        Ok(grid)
    }

    /// Cartesian grid for two features
    pub fn build_pair(&self, data: &Dataset, first: &str, second: &str) -> Result<PairGrid> {
        if first == second {
            return Err(EffectError::InvalidInput(format!(
                "Pair grid needs two distinct features, got '{}' twice",
                first
            )));
        }
        let grid = PairGrid::new(self.build(data, first)?, self.build(data, second)?);

        let both_continuous = grid.first().kind() == FeatureKind::Continuous
            && grid.second().kind() == FeatureKind::Continuous;
        if both_continuous && grid.len() > PAIR_GRID_WARN_POINTS {
            warn!(
                first = first,
                second = second,
                grid_points = grid.len(),
                "Pair grid grows quadratically; consider a fixed grid resolution"
            );
        }
        Ok(grid)
    }

    /// Grid for one or two features
    pub fn build_spec<S: AsRef<str>>(&self, data: &Dataset, features: &[S]) -> Result<GridSpec> {
        match features {
            [only] => Ok(GridSpec::Single(self.build(data, only.as_ref())?)),
            [first, second] => Ok(GridSpec::Pair(self.build_pair(
                data,
                first.as_ref(),
                second.as_ref(),
            )?)),
            _ => Err(EffectError::InvalidInput(format!(
                "Expected 1 or 2 features, got {}",
                features.len()
            ))),
        }
    }

    fn continuous_points(&self, observed: &[f64]) -> Vec<f64> {
        let mut sorted = observed.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut distinct = sorted.clone();
        distinct.dedup();

        match self.strategy {
            GridStrategy::Distinct => distinct,
            GridStrategy::Uniform { resolution } => {
                if distinct.len() <= resolution {
                    distinct
                } else {
                    linspace(sorted[0], sorted[sorted.len() - 1], resolution)
                }
            }
            GridStrategy::Percentile {
                resolution,
                lower,
                upper,
            } => {
                if distinct.len() <= resolution {
                    distinct
                } else {
                    let lo = percentile(&sorted, lower);
                    let hi = percentile(&sorted, upper);
                    let mut points = linspace(lo, hi, resolution);
                    points.dedup();
                    points
                }
            }
        }
    }
}

fn validate_resolution(resolution: usize) -> Result<()> {
    if resolution < 2 {
        return Err(EffectError::InvalidParameter {
            name: "grid_resolution".to_string(),
            value: resolution.to_string(),
            reason: "must be at least 2".to_string(),
        });
    }
    Ok(())
}

/// `n` evenly spaced points from `lo` to `hi` inclusive
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    let mut points: Vec<f64> = (0..n).map(|i| lo + i as f64 * step).collect();
    // Endpoint exactly at the observed maximum despite rounding
    points[n - 1] = hi;
    points
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    let frac = rank - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * frac
}
