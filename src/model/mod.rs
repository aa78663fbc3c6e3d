//! Model adapters
//!
//! The effect engine sees a trained model only through [`ModelAdapter`]:
//! one batched, order-preserving, side-effect-free `predict` call.
//! - Closures over [`Dataset`] implement the trait directly
//! - [`MatrixModel`] wraps `Fn(&Array2<f64>) -> Result<Array1<f64>>` prediction functions
//! - [`FrameModel`] wraps models that consume polars DataFrames

use crate::dataset::Dataset;
use crate::error::{Result, Violation};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;

/// Uniform batched-prediction contract
///
/// Implementations must return exactly one finite prediction per input row,
/// in row order, and must be safe to call concurrently.
pub trait ModelAdapter: Send + Sync {
    fn predict(&self, rows: &Dataset) -> Result<Vec<f64>>;
}

impl<F> ModelAdapter for F
where
    F: Fn(&Dataset) -> Result<Vec<f64>> + Send + Sync,
{
    fn predict(&self, rows: &Dataset) -> Result<Vec<f64>> {
        self(rows)
    }
}

/// Verify a prediction batch against the model contract
pub fn check_predictions(predictions: &[f64], expected_rows: usize) -> Result<()> {
    if predictions.len() != expected_rows {
        return Err(Violation::LengthMismatch {
            expected: expected_rows,
            actual: predictions.len(),
        }
        .into());
    }
    if let Some((row, &value)) = predictions.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(Violation::NonFinite { row, value }.into());
    }
    Ok(())
}

/// Adapter for prediction functions over dense numeric matrices
///
/// Rows of the dataset become rows of the matrix; columns follow
/// `feature_order` when set, otherwise the dataset's own column order.
pub struct MatrixModel<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync,
{
    predict_fn: F,
    feature_order: Option<Vec<String>>,
}

impl<F> MatrixModel<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync,
{
    pub fn new(predict_fn: F) -> Self {
        Self {
            predict_fn,
            feature_order: None,
        }
    }

    /// Fix the column order the model was trained with
    pub fn with_feature_order(mut self, names: Vec<String>) -> Self {
        self.feature_order = Some(names);
        self
    }
}

impl<F> ModelAdapter for MatrixModel<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync,
{
    fn predict(&self, rows: &Dataset) -> Result<Vec<f64>> {
        let x = match &self.feature_order {
            Some(order) => rows.to_array2(order)?,
            None => rows.to_array2(rows.feature_names())?,
        };
        Ok((self.predict_fn)(&x)?.to_vec())
    }
}

/// Adapter for models that predict from a polars DataFrame
pub struct FrameModel<F>
where
    F: Fn(&DataFrame) -> Result<Vec<f64>> + Send + Sync,
{
    predict_fn: F,
}

impl<F> FrameModel<F>
where
    F: Fn(&DataFrame) -> Result<Vec<f64>> + Send + Sync,
{
    pub fn new(predict_fn: F) -> Self {
        Self { predict_fn }
    }
}

impl<F> ModelAdapter for FrameModel<F>
where
    F: Fn(&DataFrame) -> Result<Vec<f64>> + Send + Sync,
{
    fn predict(&self, rows: &Dataset) -> Result<Vec<f64>> {
        let df = rows.to_dataframe()?;
        (self.predict_fn)(&df)
    }
}
