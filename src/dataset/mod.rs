//! Dataset module
//!
//! Immutable, column-oriented feature tables that effect computations sweep over:
//! - Continuous and categorical features with typed values
//! - Cheap column overrides that share storage with the source table
//! - Conversion from and to polars DataFrames and ndarray matrices

mod convert;
mod table;
mod value;

pub use table::{Column, Dataset, DatasetBuilder, Row};
pub use value::{FeatureDescriptor, FeatureKind, FeatureValue};
