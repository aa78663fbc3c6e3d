//! Scalar feature values and feature descriptors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A single cell of a dataset: a number or a category label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(Arc<str>),
}

impl FeatureValue {
    /// Kind of feature this value belongs to
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Numeric(_) => FeatureKind::Continuous,
            FeatureValue::Categorical(_) => FeatureKind::Categorical,
        }
    }

    /// Numeric payload, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Categorical(_) => None,
        }
    }

    /// Category label, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Numeric(_) => None,
            FeatureValue::Categorical(label) => Some(label),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{}", v),
            FeatureValue::Categorical(label) => write!(f, "{}", label),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(label: &str) -> Self {
        FeatureValue::Categorical(Arc::from(label))
    }
}

impl From<String> for FeatureValue {
    fn from(label: String) -> Self {
        FeatureValue::Categorical(Arc::from(label))
    }
}

/// Feature type as seen by the grid builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Continuous,
    Categorical,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Continuous => write!(f, "continuous"),
            FeatureKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Description of one feature, derived from a dataset on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Feature name
    pub name: String,
    /// Continuous or categorical
    pub kind: FeatureKind,
    /// Declared (min, max) range used to clip generated grid values
    pub domain: Option<(f64, f64)>,
}

impl FeatureDescriptor {
    /// Clip a value into the declared domain, if one is set
    pub fn clip(&self, value: f64) -> f64 {
        match self.domain {
            Some((lo, hi)) => value.clamp(lo, hi),
            None => value,
        }
    }
}
