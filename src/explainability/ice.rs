//! Individual conditional expectation results

use super::pdp::{mean_std, EffectCurve};
use crate::dataset::FeatureValue;
use crate::error::Result;
use crate::grid::{FeatureGrid, GridSpec};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// One prediction curve per dataset row, all on the same grid
///
/// Only raw predictions are stored. When an anchor is set, [`EffectSurface::curve`]
/// and [`EffectSurface::curves`] return the centered view (c-ICE), in which
/// every curve is zero at the anchor grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSurface {
    grid: FeatureGrid,
    /// Raw predictions: shape (n_rows, n_grid_points)
    predictions: Array2<f64>,
    anchor: Option<usize>,
}

impl EffectSurface {
    pub(crate) fn new(grid: FeatureGrid, predictions: Array2<f64>, anchor: Option<usize>) -> Self {
        Self {
            grid,
            predictions,
            anchor,
        }
    }

    pub fn grid(&self) -> &FeatureGrid {
        &self.grid
    }

    pub fn feature(&self) -> &str {
        self.grid.feature()
    }

    /// Number of curves (dataset rows)
    pub fn n_rows(&self) -> usize {
        self.predictions.nrows()
    }

    /// Number of grid points per curve
    pub fn n_grid_points(&self) -> usize {
        self.predictions.ncols()
    }

    /// Uncentered predictions
    pub fn raw(&self) -> &Array2<f64> {
        &self.predictions
    }

    /// Grid index curves are centered at
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Grid value curves are centered at
    pub fn anchor_value(&self) -> Option<&FeatureValue> {
        self.anchor.map(|idx| &self.grid.values()[idx])
    }

    /// Curve for row `row`, centered when an anchor is set
    pub fn curve(&self, row: usize) -> Array1<f64> {
        let raw = self.predictions.row(row);
        match self.anchor {
            Some(a) => {
                let offset = raw[a];
                raw.mapv(|v| v - offset)
            }
            None => raw.to_owned(),
        }
    }

    /// All curves, centered when an anchor is set
    pub fn curves(&self) -> Array2<f64> {
        match self.anchor {
            Some(a) => {
                let offsets = self.predictions.column(a).insert_axis(Axis(1));
                &self.predictions - &offsets
            }
            None => self.predictions.clone(),
        }
    }

    /// Same surface centered at `value`
    ///
    /// `value` must be a grid value, or within `tolerance` of a numeric one.
    pub fn centered_at(&self, value: &FeatureValue, tolerance: Option<f64>) -> Result<Self> {
        let anchor = self.grid.locate(value, tolerance)?;
        Ok(Self {
            anchor: Some(anchor),
            ..self.clone()
        })
    }

    /// Same surface without centering
    pub fn uncentered(&self) -> Self {
        Self {
            anchor: None,
            ..self.clone()
        }
    }

    /// Average the raw curves into a partial dependence curve on the same grid
    pub fn to_pdp(&self) -> EffectCurve {
        let (values, std): (Vec<f64>, Vec<f64>) = self
            .predictions
            .columns()
            .into_iter()
            .map(|col| mean_std(&col.to_vec()))
            .unzip();

        EffectCurve {
            grid: GridSpec::Single(self.grid.clone()),
            values,
            std,
        }
    }
}
