//! Model explainability module
//!
//! Provides model-agnostic feature-effect methods:
//! - Partial dependence (PDP) over one feature or a feature pair
//! - Individual conditional expectation (ICE), optionally centered (c-ICE)
//! - Friedman's H² interaction strength for feature pairs

mod engine;
mod ice;
mod pdp;

pub use engine::{EffectEngine, EffectReport};
pub use ice::EffectSurface;
pub use pdp::EffectCurve;
