//! Materialized grids

use crate::dataset::{FeatureKind, FeatureValue};
use crate::error::{EffectError, Result};
use serde::{Deserialize, Serialize};

/// Ordered, distinct sweep values for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGrid {
    feature: String,
    kind: FeatureKind,
    values: Vec<FeatureValue>,
}

impl FeatureGrid {
    pub(crate) fn new(feature: String, kind: FeatureKind, values: Vec<FeatureValue>) -> Self {
        Self {
            feature,
            kind,
            values,
        }
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of an exact grid value
    pub fn position(&self, value: &FeatureValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Resolve `value` to a grid index
    ///
    /// Exact matches always resolve. With a tolerance, a numeric value snaps to
    /// the nearest grid value no further than `tolerance` away.
    pub fn locate(&self, value: &FeatureValue, tolerance: Option<f64>) -> Result<usize> {
        if let Some(idx) = self.position(value) {
            return Ok(idx);
        }

        if let (Some(target), Some(tol)) = (value.as_f64(), tolerance) {
            let nearest = self
                .values
                .iter()
                .enumerate()
                .filter_map(|(idx, v)| v.as_f64().map(|g| (idx, (g - target).abs())))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((idx, distance)) = nearest {
                if distance <= tol {
                    return Ok(idx);
                }
            }
        }

        Err(EffectError::InvalidCenter {
            feature: self.feature.clone(),
            value: value.to_string(),
        })
    }
}

/// Cartesian product of two feature grids, row-major (`first` is the outer axis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairGrid {
    first: FeatureGrid,
    second: FeatureGrid,
}

impl PairGrid {
    pub(crate) fn new(first: FeatureGrid, second: FeatureGrid) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &FeatureGrid {
        &self.first
    }

    pub fn second(&self) -> &FeatureGrid {
        &self.second
    }

    /// Number of grid pairs
    pub fn len(&self) -> usize {
        self.first.len() * self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape as (first.len(), second.len())
    pub fn shape(&self) -> (usize, usize) {
        (self.first.len(), self.second.len())
    }

    /// Pair at flat index `idx`
    pub fn point(&self, idx: usize) -> (&FeatureValue, &FeatureValue) {
        let n2 = self.second.len();
        (&self.first.values[idx / n2], &self.second.values[idx % n2])
    }

    /// All pairs in row-major order
    pub fn points(&self) -> impl Iterator<Item = (&FeatureValue, &FeatureValue)> {
        self.first
            .values
            .iter()
            .flat_map(move |a| self.second.values.iter().map(move |b| (a, b)))
    }
}

/// Grid for a one- or two-feature effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpec {
    Single(FeatureGrid),
    Pair(PairGrid),
}

impl GridSpec {
    /// Number of grid points (or pairs)
    pub fn len(&self) -> usize {
        match self {
            GridSpec::Single(grid) => grid.len(),
            GridSpec::Pair(grid) => grid.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feature names covered by the grid
    pub fn features(&self) -> Vec<&str> {
        match self {
            GridSpec::Single(grid) => vec![grid.feature()],
            GridSpec::Pair(grid) => vec![grid.first().feature(), grid.second().feature()],
        }
    }

    /// Column overrides that realize grid point `idx`
    pub fn overrides(&self, idx: usize) -> Vec<(&str, FeatureValue)> {
        match self {
            GridSpec::Single(grid) => vec![(grid.feature(), grid.values()[idx].clone())],
            GridSpec::Pair(grid) => {
                let (a, b) = grid.point(idx);
                vec![
                    (grid.first().feature(), a.clone()),
                    (grid.second().feature(), b.clone()),
                ]
            }
        }
    }
}
