//! Kolosal Effects - model-agnostic feature-effect curves
//!
//! Computes Partial Dependence (PDP) and Individual Conditional Expectation
//! (ICE) for any trained model that exposes batched prediction. The model is
//! a black box: the engine only overrides feature columns and asks for
//! predictions.
//!
//! # Modules
//!
//! - [`dataset`] - Immutable feature tables with cheap column overrides
//! - [`grid`] - Deterministic sweep grids for one feature or a feature pair
//! - [`model`] - The [`ModelAdapter`](model::ModelAdapter) contract and adapters
//! - [`explainability`] - The effect engine and its PDP/ICE results
//! - [`config`] - Serializable run configuration
//! - [`utils`] - Parallel execution and cancellation
//!
//! # Example
//!
//! ```
//! use kolosal_effects::prelude::*;
//!
//! let data = Dataset::builder()
//!     .numeric("x", vec![1.0, 2.0, 2.0, 3.0])
//!     .build()?;
//!
//! let model = |rows: &Dataset| -> Result<Vec<f64>> {
//!     Ok(rows
//!         .column("x")?
//!         .iter()
//!         .filter_map(|v| v.as_f64())
//!         .map(|x| x + 10.0)
//!         .collect())
//! };
//!
//! let pdp = EffectEngine::new().compute_pdp(&data, &model, &["x"])?;
//! assert_eq!(pdp.values, vec![11.0, 12.0, 13.0]);
//! # Ok::<(), EffectError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod explainability;
pub mod grid;
pub mod model;
pub mod utils;

pub use error::{EffectError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EffectConfig;
    pub use crate::dataset::{Column, Dataset, DatasetBuilder, FeatureDescriptor, FeatureKind, FeatureValue};
    pub use crate::error::{EffectError, Result, Violation};
    pub use crate::explainability::{EffectCurve, EffectEngine, EffectReport, EffectSurface};
    pub use crate::grid::{FeatureGrid, GridBuilder, GridSpec, GridStrategy, PairGrid};
    pub use crate::model::{FrameModel, MatrixModel, ModelAdapter};
    pub use crate::utils::{CancellationToken, ParallelConfig};
}
