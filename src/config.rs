//! Effect computation configuration

use crate::dataset::FeatureValue;
use crate::error::{EffectError, Result};
use crate::grid::{GridBuilder, DEFAULT_RESOLUTION};
use crate::utils::ParallelConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a PDP/ICE run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// One or two feature names
    pub features: Vec<String>,

    /// Fixed number of grid points for continuous features (None = distinct values)
    pub grid_resolution: Option<usize>,

    /// Percentile range (0-100) spanned by fixed-resolution grids
    pub percentile_range: Option<(f64, f64)>,

    /// Grid value ICE curves are centered at
    pub center_at: Option<FeatureValue>,

    /// Maximum distance for snapping `center_at` to the nearest numeric grid value
    pub center_tolerance: Option<f64>,

    /// Number of worker threads (None = global rayon pool)
    pub n_threads: Option<usize>,
}

impl EffectConfig {
    /// Create a configuration for the given features
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builder method to set grid resolution
    pub fn with_grid_resolution(mut self, resolution: usize) -> Self {
        self.grid_resolution = Some(resolution);
        self
    }

    /// Builder method to set the percentile range
    pub fn with_percentile_range(mut self, lower: f64, upper: f64) -> Self {
        self.percentile_range = Some((lower, upper));
        self
    }

    /// Builder method to center ICE curves
    pub fn with_center_at(mut self, value: impl Into<FeatureValue>) -> Self {
        self.center_at = Some(value.into());
        self
    }

    /// Builder method to allow snapping the center to a nearby grid value
    pub fn with_center_tolerance(mut self, tolerance: f64) -> Self {
        self.center_tolerance = Some(tolerance);
        self
    }

    /// Builder method to set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n);
        self
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Grid builder described by this configuration
    pub fn grid_builder(&self) -> GridBuilder {
        match (self.grid_resolution, self.percentile_range) {
            (resolution, Some((lower, upper))) => GridBuilder::new().with_percentile_range(
                resolution.unwrap_or(DEFAULT_RESOLUTION),
                lower,
                upper,
            ),
            (Some(resolution), None) => GridBuilder::new().with_resolution(resolution),
            (None, None) => GridBuilder::new(),
        }
    }

    /// Parallel execution settings
    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            n_threads: self.n_threads,
        }
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        match self.features.as_slice() {
            [_] => {}
            [a, b] if a != b => {}
            [a, _] => {
                return Err(EffectError::InvalidInput(format!(
                    "Feature '{}' listed twice",
                    a
                )))
            }
            other => {
                return Err(EffectError::InvalidParameter {
                    name: "features".to_string(),
                    value: format!("{:?}", other),
                    reason: "expected 1 or 2 feature names".to_string(),
                })
            }
        }

        if self.center_at.is_some() && self.features.len() != 1 {
            return Err(EffectError::InvalidParameter {
                name: "center_at".to_string(),
                value: format!("{:?}", self.center_at),
                reason: "ICE centering applies to single-feature runs only".to_string(),
            });
        }

        if let Some(tol) = self.center_tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(EffectError::InvalidParameter {
                    name: "center_tolerance".to_string(),
                    value: tol.to_string(),
                    reason: "must be finite and non-negative".to_string(),
                });
            }
        }

        if self.n_threads == Some(0) {
            return Err(EffectError::InvalidParameter {
                name: "n_threads".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.grid_builder().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridStrategy;

    #[test]
    fn test_json_roundtrip() {
        let json = r#"{
            "features": ["temp"],
            "grid_resolution": 25,
            "center_at": 0.1,
            "center_tolerance": 0.01
        }"#;
        let config = EffectConfig::from_json(json).unwrap();
        assert_eq!(config.features, vec!["temp".to_string()]);
        assert_eq!(config.center_at, Some(FeatureValue::Numeric(0.1)));
        assert_eq!(config.n_threads, None);

        let back = EffectConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_grid_builder_mapping() {
        assert_eq!(
            EffectConfig::new(["a"]).grid_builder().strategy(),
            GridStrategy::Distinct
        );
        assert_eq!(
            EffectConfig::new(["a"]).with_grid_resolution(30).grid_builder().strategy(),
            GridStrategy::Uniform { resolution: 30 }
        );
        assert_eq!(
            EffectConfig::new(["a"])
                .with_percentile_range(5.0, 95.0)
                .grid_builder()
                .strategy(),
            GridStrategy::Percentile {
                resolution: DEFAULT_RESOLUTION,
                lower: 5.0,
                upper: 95.0
            }
        );
    }

    #[test]
    fn test_validate() {
        assert!(EffectConfig::new(["a"]).validate().is_ok());
        assert!(EffectConfig::new(["a", "b"]).validate().is_ok());
        assert!(EffectConfig::new(Vec::<String>::new()).validate().is_err());
        assert!(EffectConfig::new(["a", "b", "c"]).validate().is_err());
        assert!(EffectConfig::new(["a", "a"]).validate().is_err());
        assert!(EffectConfig::new(["a", "b"]).with_center_at(1.0).validate().is_err());
        assert!(EffectConfig::new(["a"]).with_center_tolerance(-1.0).validate().is_err());
        assert!(EffectConfig::new(["a"]).with_threads(0).validate().is_err());
        assert!(EffectConfig::new(["a"]).with_grid_resolution(1).validate().is_err());
    }
}
