//! Polars interop

use super::table::{Column, Dataset};
use super::value::FeatureValue;
use crate::error::{EffectError, Result};
use polars::prelude::{Column as FrameColumn, DataFrame, DataType};
use std::sync::Arc;

impl Dataset {
    /// Build a dataset from a fully preprocessed DataFrame
    ///
    /// String columns become categorical features; every other dtype is cast
    /// to `Float64` and becomes continuous. Nulls are rejected.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut names = Vec::with_capacity(df.width());
        let mut columns = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let name = col.name().to_string();
            if col.null_count() > 0 {
                return Err(EffectError::DataError(format!(
                    "Column '{}' contains {} null values",
                    name,
                    col.null_count()
                )));
            }

            let column = match col.dtype() {
                DataType::String => {
                    let labels: Vec<Arc<str>> = col
                        .str()?
                        .into_no_null_iter()
                        .map(Arc::<str>::from)
                        .collect();
                    Column::Categorical(labels.into())
                }
                _ => {
                    let cast = col.cast(&DataType::Float64)?;
                    let values: Vec<f64> = cast.f64()?.into_no_null_iter().collect();
                    Column::Numeric(values.into())
                }
            };

            names.push(name);
            columns.push(column);
        }

        Dataset::from_columns(names, columns)
    }

    /// Materialize the dataset (including any overridden columns) as a DataFrame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let frame_columns: Vec<FrameColumn> = self
            .feature_names()
            .iter()
            .zip(self.columns().iter())
            .map(|(name, column)| match column {
                Column::Numeric(values) => FrameColumn::new(name.as_str().into(), values.to_vec()),
                Column::Categorical(labels) => {
                    let labels: Vec<&str> = labels.iter().map(|s| &**s).collect();
                    FrameColumn::new(name.as_str().into(), labels)
                }
                Column::Constant {
                    value: FeatureValue::Numeric(v),
                    len,
                } => FrameColumn::new(name.as_str().into(), vec![*v; *len]),
                Column::Constant {
                    value: FeatureValue::Categorical(label),
                    len,
                } => FrameColumn::new(name.as_str().into(), vec![&**label; *len]),
            })
            .collect();

        Ok(DataFrame::new(frame_columns)?)
    }
}
