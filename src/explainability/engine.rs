//! Effect engine: marginalization by simulation
//!
//! For every grid point the engine overrides the target column(s) of the whole
//! dataset, asks the model for one full-sized batch of predictions, and either
//! averages them (PDP) or keeps them per row (ICE). Grid points are
//! independent, so they are dispatched as parallel tasks that each fill their
//! own output slot.

use super::ice::EffectSurface;
use super::pdp::{mean_std, EffectCurve};
use crate::config::EffectConfig;
use crate::dataset::{Dataset, FeatureValue};
use crate::error::{EffectError, Result};
use crate::grid::{FeatureGrid, GridBuilder, GridSpec};
use crate::model::{check_predictions, ModelAdapter};
use crate::utils::{try_parallel_map, CancellationToken, ParallelConfig, WorkerPool};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

/// Output of [`EffectEngine::run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectReport {
    /// Partial dependence over the configured feature(s)
    pub pdp: EffectCurve,
    /// ICE curves on the same grid (single-feature runs only)
    pub ice: Option<EffectSurface>,
}

/// Computes PDP and ICE for any [`ModelAdapter`]
///
/// The engine holds configuration only; every call builds fresh grids and
/// results.
#[derive(Debug, Clone, Default)]
pub struct EffectEngine {
    grid_builder: GridBuilder,
    pool: WorkerPool,
    center_tolerance: Option<f64>,
    cancel: Option<CancellationToken>,
}

impl EffectEngine {
    /// Engine with distinct-value grids on the global thread pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine configured from an [`EffectConfig`]
    pub fn from_config(config: &EffectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid_builder: config.grid_builder(),
            pool: WorkerPool::new(&config.parallel_config())?,
            center_tolerance: config.center_tolerance,
            cancel: None,
        })
    }

    /// Set the grid builder
    pub fn with_grid_builder(mut self, grid_builder: GridBuilder) -> Self {
        self.grid_builder = grid_builder;
        self
    }

    /// Set parallel execution settings
    ///
    /// A dedicated pool is built here once and reused by every computation.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Result<Self> {
        self.pool = WorkerPool::new(&parallel)?;
        Ok(self)
    }

    /// Allow ICE centers to snap to a numeric grid value within `tolerance`
    pub fn with_center_tolerance(mut self, tolerance: f64) -> Self {
        self.center_tolerance = Some(tolerance);
        self
    }

    /// Attach a cancellation token checked before each grid-point task
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn grid_builder(&self) -> &GridBuilder {
        &self.grid_builder
    }

    /// Partial dependence for one or two features
    pub fn compute_pdp<M, S>(&self, data: &Dataset, model: &M, features: &[S]) -> Result<EffectCurve>
    where
        M: ModelAdapter + ?Sized,
        S: AsRef<str>,
    {
        let grid = self.grid_builder.build_spec(data, features)?;
        self.compute_pdp_on_grid(data, model, grid)
    }

    /// Partial dependence over an already materialized grid
    pub fn compute_pdp_on_grid<M>(&self, data: &Dataset, model: &M, grid: GridSpec) -> Result<EffectCurve>
    where
        M: ModelAdapter + ?Sized,
    {
        match &grid {
            GridSpec::Single(g) => validate_grid(data, g)?,
            GridSpec::Pair(pair) => {
                validate_grid(data, pair.first())?;
                validate_grid(data, pair.second())?;
            }
        }

        let start = Instant::now();
        debug!(
            features = ?grid.features(),
            grid_points = grid.len(),
            rows = data.row_count(),
            "Computing partial dependence"
        );

        let stats = self.sweep(
            data,
            model,
            grid.len(),
            |idx| grid.overrides(idx),
            |predictions| mean_std(&predictions),
        )?;
        let (values, std) = stats.into_iter().unzip();

        info!(
            features = ?grid.features(),
            grid_points = grid.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Partial dependence complete"
        );

        Ok(EffectCurve { grid, values, std })
    }

    /// One single-feature partial dependence curve per feature
    ///
    /// All features and grids are validated before any prediction is made.
    pub fn compute_pdp_batch<M, S>(&self, data: &Dataset, model: &M, features: &[S]) -> Result<Vec<EffectCurve>>
    where
        M: ModelAdapter + ?Sized,
        S: AsRef<str>,
    {
        let grids = features
            .iter()
            .map(|f| self.grid_builder.build(data, f.as_ref()))
            .collect::<Result<Vec<FeatureGrid>>>()?;

        grids
            .into_iter()
            .map(|grid| self.compute_pdp_on_grid(data, model, GridSpec::Single(grid)))
            .collect()
    }

    /// ICE curves for one feature, optionally centered at a grid value
    pub fn compute_ice<M>(
        &self,
        data: &Dataset,
        model: &M,
        feature: &str,
        center_at: Option<&FeatureValue>,
    ) -> Result<EffectSurface>
    where
        M: ModelAdapter + ?Sized,
    {
        let grid = self.grid_builder.build(data, feature)?;
        self.compute_ice_on_grid(data, model, grid, center_at)
    }

    /// ICE curves over an already materialized grid
    pub fn compute_ice_on_grid<M>(
        &self,
        data: &Dataset,
        model: &M,
        grid: FeatureGrid,
        center_at: Option<&FeatureValue>,
    ) -> Result<EffectSurface>
    where
        M: ModelAdapter + ?Sized,
    {
        validate_grid(data, &grid)?;
        let anchor = center_at
            .map(|value| grid.locate(value, self.center_tolerance))
            .transpose()?;

        let start = Instant::now();
        debug!(
            feature = grid.feature(),
            grid_points = grid.len(),
            rows = data.row_count(),
            anchor = ?anchor,
            "Computing ICE curves"
        );

        let columns = self.sweep(
            data,
            model,
            grid.len(),
            |idx| vec![(grid.feature(), grid.values()[idx].clone())],
            |predictions| predictions,
        )?;

        let n_rows = data.row_count();
        let predictions = Array2::from_shape_fn((n_rows, columns.len()), |(r, g)| columns[g][r]);

        info!(
            feature = grid.feature(),
            grid_points = grid.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ICE complete"
        );

        Ok(EffectSurface::new(grid, predictions, anchor))
    }

    /// PDP and ICE for one feature from a single sweep over one grid
    ///
    /// The PDP is the column mean of the ICE matrix, so both share the same x-axis.
    pub fn compute_pdp_and_ice<M>(
        &self,
        data: &Dataset,
        model: &M,
        feature: &str,
        center_at: Option<&FeatureValue>,
    ) -> Result<(EffectCurve, EffectSurface)>
    where
        M: ModelAdapter + ?Sized,
    {
        let surface = self.compute_ice(data, model, feature, center_at)?;
        Ok((surface.to_pdp(), surface))
    }

    /// Friedman's H² for a feature pair (see [`EffectCurve::interaction_strength`])
    pub fn interaction_strength<M>(&self, data: &Dataset, model: &M, first: &str, second: &str) -> Result<f64>
    where
        M: ModelAdapter + ?Sized,
    {
        let pair = self.grid_builder.build_pair(data, first, second)?;
        let first_grid = GridSpec::Single(pair.first().clone());
        let second_grid = GridSpec::Single(pair.second().clone());

        let joint = self.compute_pdp_on_grid(data, model, GridSpec::Pair(pair))?;
        let first_curve = self.compute_pdp_on_grid(data, model, first_grid)?;
        let second_curve = self.compute_pdp_on_grid(data, model, second_grid)?;

        joint.interaction_strength(&first_curve, &second_curve)
    }

    /// Execute a configuration: PDP always, ICE as well for single-feature runs
    ///
    /// Grid, tolerance and thread settings come from the engine; build it with
    /// [`EffectEngine::from_config`] to honor those parts of `config`.
    pub fn run<M>(&self, data: &Dataset, model: &M, config: &EffectConfig) -> Result<EffectReport>
    where
        M: ModelAdapter + ?Sized,
    {
        config.validate()?;
        match config.features.as_slice() {
            [feature] => {
                let (pdp, ice) =
                    self.compute_pdp_and_ice(data, model, feature, config.center_at.as_ref())?;
                Ok(EffectReport {
                    pdp,
                    ice: Some(ice),
                })
            }
            features => Ok(EffectReport {
                pdp: self.compute_pdp(data, model, features)?,
                ice: None,
            }),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Override, predict and reduce once per grid point, in grid order
    fn sweep<'g, M, T, O, F>(
        &self,
        data: &Dataset,
        model: &M,
        n_points: usize,
        overrides: O,
        reduce: F,
    ) -> Result<Vec<T>>
    where
        M: ModelAdapter + ?Sized,
        T: Send,
        O: Fn(usize) -> Vec<(&'g str, FeatureValue)> + Send + Sync,
        F: Fn(Vec<f64>) -> T + Send + Sync,
    {
        let n_rows = data.row_count();

        try_parallel_map(n_points, &self.pool, |idx| {
            if self.is_cancelled() {
                return Err(EffectError::Cancelled);
            }

            let view = data.with_column_overrides(&overrides(idx))?;
            let predictions = model.predict(&view)?;

            if let Err(err) = check_predictions(&predictions, n_rows) {
                error!(grid_point = idx, error = %err, "Model broke the prediction contract");
                return Err(err);
            }

            Ok(reduce(predictions))
        })
    }
}

/// A grid is usable on `data` when it is non-empty, its feature exists there
/// with the same kind, and every value is a valid override for that feature
fn validate_grid(data: &Dataset, grid: &FeatureGrid) -> Result<()> {
    let descriptor = data.descriptor(grid.feature())?;
    if descriptor.kind != grid.kind() {
        return Err(EffectError::TypeMismatch {
            feature: grid.feature().to_string(),
            expected: descriptor.kind.to_string(),
            actual: grid.kind().to_string(),
        });
    }

    if grid.is_empty() {
        return Err(EffectError::InsufficientData {
            feature: grid.feature().to_string(),
            reason: "grid has no values".to_string(),
        });
    }

    for value in grid.values() {
        if value.kind() != grid.kind() {
            return Err(EffectError::TypeMismatch {
                feature: grid.feature().to_string(),
                expected: grid.kind().to_string(),
                actual: value.kind().to_string(),
            });
        }
        if let FeatureValue::Numeric(v) = value {
            if !v.is_finite() {
                return Err(EffectError::InvalidInput(format!(
                    "Grid value for '{}' must be finite, got {}",
                    grid.feature(),
                    v
                )));
            }
        }
    }
    Ok(())
}
