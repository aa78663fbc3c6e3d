//! Columnar dataset with shared storage

use super::value::{FeatureDescriptor, FeatureKind, FeatureValue};
use crate::error::{EffectError, Result};
use ndarray::Array2;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// One feature column
///
/// Storage is reference counted, so cloning a column (and therefore a
/// [`Dataset`]) never copies cell data. `Constant` is what
/// [`Dataset::with_column_override`] produces.
#[derive(Debug, Clone)]
pub enum Column {
    Numeric(Arc<[f64]>),
    Categorical(Arc<[Arc<str>]>),
    Constant { value: FeatureValue, len: usize },
}

impl Column {
    /// Number of cells
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Categorical(values) => values.len(),
            Column::Constant { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Column::Numeric(_) => FeatureKind::Continuous,
            Column::Categorical(_) => FeatureKind::Categorical,
            Column::Constant { value, .. } => value.kind(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Column::Constant { .. })
    }

    /// Value at `index`, or `None` when out of range
    pub fn get(&self, index: usize) -> Option<FeatureValue> {
        if index >= self.len() {
            return None;
        }
        Some(self.value_at(index))
    }

    /// Iterate over all values in row order
    pub fn iter(&self) -> impl Iterator<Item = FeatureValue> + '_ {
        (0..self.len()).map(move |i| self.value_at(i))
    }

    /// Numeric view of the column; `None` for categorical columns
    pub fn numeric_values(&self) -> Option<Cow<'_, [f64]>> {
        match self {
            Column::Numeric(values) => Some(Cow::Borrowed(&values[..])),
            Column::Constant {
                value: FeatureValue::Numeric(v),
                len,
            } => Some(Cow::Owned(vec![*v; *len])),
            _ => None,
        }
    }

    fn value_at(&self, index: usize) -> FeatureValue {
        match self {
            Column::Numeric(values) => FeatureValue::Numeric(values[index]),
            Column::Categorical(values) => FeatureValue::Categorical(Arc::clone(&values[index])),
            Column::Constant { value, .. } => value.clone(),
        }
    }
}

/// A single row, as a mapping from feature name to value
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[String]>,
    values: Vec<FeatureValue>,
}

impl Row {
    /// Value for a feature name
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.values[idx])
    }

    /// Values in feature order
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// (name, value) pairs in feature order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Immutable table of feature rows
///
/// Every column has the same length and a single kind. Numeric cells are
/// always finite.
#[derive(Debug, Clone)]
pub struct Dataset {
    names: Arc<[String]>,
    index: Arc<HashMap<String, usize>>,
    columns: Vec<Column>,
    domains: Vec<Option<(f64, f64)>>,
    n_rows: usize,
}

impl Dataset {
    /// Create a builder
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    /// Assemble a dataset from named columns, validating the table invariants
    pub fn from_columns(names: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(EffectError::InvalidInput(format!(
                "{} feature names for {} columns",
                names.len(),
                columns.len()
            )));
        }

        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut index = HashMap::with_capacity(names.len());

        for (idx, (name, column)) in names.iter().zip(columns.iter()).enumerate() {
            if index.insert(name.clone(), idx).is_some() {
                return Err(EffectError::InvalidInput(format!(
                    "Duplicate feature name '{}'",
                    name
                )));
            }
            if column.len() != n_rows {
                return Err(EffectError::ShapeError {
                    expected: format!("{} rows in column '{}'", n_rows, name),
                    actual: format!("{} rows", column.len()),
                });
            }
            validate_finite(name, column)?;
        }

        Ok(Self {
            domains: vec![None; names.len()],
            names: names.into(),
            index: Arc::new(index),
            columns,
            n_rows,
        })
    }

    /// Assemble a dataset from row-major values
    ///
    /// The kind of each column is taken from the first row; later rows must agree.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<FeatureValue>>) -> Result<Self> {
        let n_features = names.len();
        let kinds: Vec<FeatureKind> = match rows.first() {
            Some(first) => first.iter().map(FeatureValue::kind).collect(),
            None => vec![FeatureKind::Continuous; n_features],
        };

        let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); n_features];
        let mut labels: Vec<Vec<Arc<str>>> = vec![Vec::new(); n_features];

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != n_features {
                return Err(EffectError::InvalidInput(format!(
                    "Row {} has {} values, expected {}",
                    row_idx,
                    row.len(),
                    n_features
                )));
            }
            for (col_idx, value) in row.into_iter().enumerate() {
                match (kinds[col_idx], value) {
                    (FeatureKind::Continuous, FeatureValue::Numeric(v)) => {
                        numeric[col_idx].push(v)
                    }
                    (FeatureKind::Categorical, FeatureValue::Categorical(label)) => {
                        labels[col_idx].push(label)
                    }
                    (expected, value) => {
                        return Err(EffectError::TypeMismatch {
                            feature: names[col_idx].clone(),
                            expected: expected.to_string(),
                            actual: value.kind().to_string(),
                        })
                    }
                }
            }
        }

        let columns = kinds
            .iter()
            .zip(numeric.into_iter().zip(labels))
            .map(|(kind, (nums, labs))| match kind {
                FeatureKind::Continuous => Column::Numeric(nums.into()),
                FeatureKind::Categorical => Column::Categorical(labs.into()),
            })
            .collect();

        Self::from_columns(names, columns)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.n_rows
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Feature names in column order
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Whether a feature exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a feature
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EffectError::FeatureNotFound(name.to_string()))
    }

    /// Column for a feature
    pub fn column(&self, name: &str) -> Result<&Column> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    /// All columns in feature order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Row `index` as a name → value mapping
    pub fn row(&self, index: usize) -> Result<Row> {
        if index >= self.n_rows {
            return Err(EffectError::IndexOutOfBounds {
                index,
                len: self.n_rows,
            });
        }
        Ok(Row {
            names: Arc::clone(&self.names),
            values: self.columns.iter().map(|c| c.value_at(index)).collect(),
        })
    }

    /// Descriptor for a feature
    pub fn descriptor(&self, name: &str) -> Result<FeatureDescriptor> {
        let idx = self.column_index(name)?;
        Ok(FeatureDescriptor {
            name: name.to_string(),
            kind: self.columns[idx].kind(),
            domain: self.domains[idx],
        })
    }

    /// Descriptors for every feature, in column order
    pub fn descriptors(&self) -> Vec<FeatureDescriptor> {
        self.names
            .iter()
            .zip(self.columns.iter().zip(self.domains.iter()))
            .map(|(name, (column, domain))| FeatureDescriptor {
                name: name.clone(),
                kind: column.kind(),
                domain: *domain,
            })
            .collect()
    }

    /// Declare the (min, max) range that grid values for `name` are clipped to
    pub fn with_domain(mut self, name: &str, min: f64, max: f64) -> Result<Self> {
        let idx = self.column_index(name)?;
        if self.columns[idx].kind() != FeatureKind::Continuous {
            return Err(EffectError::TypeMismatch {
                feature: name.to_string(),
                expected: FeatureKind::Continuous.to_string(),
                actual: FeatureKind::Categorical.to_string(),
            });
        }
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(EffectError::InvalidParameter {
                name: format!("domain[{}]", name),
                value: format!("({}, {})", min, max),
                reason: "bounds must be finite with min <= max".to_string(),
            });
        }
        self.domains[idx] = Some((min, max));
        Ok(self)
    }

    /// A view of this dataset where `name` holds `value` in every row
    ///
    /// All other columns share storage with `self`; `self` is not modified.
    pub fn with_column_override(&self, name: &str, value: impl Into<FeatureValue>) -> Result<Self> {
        self.with_column_overrides(&[(name, value.into())])
    }

    /// Like [`Dataset::with_column_override`] for several columns at once
    pub fn with_column_overrides(&self, overrides: &[(&str, FeatureValue)]) -> Result<Self> {
        let mut columns = self.columns.clone();

        for (name, value) in overrides {
            let idx = self.column_index(name)?;
            let kind = self.columns[idx].kind();
            if value.kind() != kind {
                return Err(EffectError::TypeMismatch {
                    feature: name.to_string(),
                    expected: kind.to_string(),
                    actual: value.kind().to_string(),
                });
            }
            if let FeatureValue::Numeric(v) = value {
                if !v.is_finite() {
                    return Err(EffectError::InvalidInput(format!(
                        "Override value for '{}' must be finite, got {}",
                        name, v
                    )));
                }
            }
            columns[idx] = Column::Constant {
                value: value.clone(),
                len: self.n_rows,
            };
        }

        Ok(Self {
            names: Arc::clone(&self.names),
            index: Arc::clone(&self.index),
            columns,
            domains: self.domains.clone(),
            n_rows: self.n_rows,
        })
    }

    /// Pack numeric features into a row-major `Array2<f64>`
    ///
    /// Columns appear in the order given by `features`.
    pub fn to_array2(&self, features: &[String]) -> Result<Array2<f64>> {
        let col_data: Vec<Cow<'_, [f64]>> = features
            .iter()
            .map(|name| {
                let column = self.column(name)?;
                column
                    .numeric_values()
                    .ok_or_else(|| EffectError::TypeMismatch {
                        feature: name.clone(),
                        expected: FeatureKind::Continuous.to_string(),
                        actual: column.kind().to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Array2::from_shape_fn(
            (self.n_rows, features.len()),
            |(r, c)| col_data[c][r],
        ))
    }
}

fn validate_finite(name: &str, column: &Column) -> Result<()> {
    let bad = match column {
        Column::Numeric(values) => values.iter().position(|v| !v.is_finite()),
        Column::Constant {
            value: FeatureValue::Numeric(v),
            ..
        } if !v.is_finite() => Some(0),
        _ => None,
    };
    match bad {
        Some(row) => Err(EffectError::InvalidInput(format!(
            "Non-finite value in feature '{}' at row {}",
            name, row
        ))),
        None => Ok(()),
    }
}

/// Incremental dataset construction
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    names: Vec<String>,
    columns: Vec<Column>,
    domains: Vec<(String, f64, f64)>,
}

impl DatasetBuilder {
    /// Add a continuous feature
    pub fn numeric(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        let values: Vec<f64> = values.into();
        self.names.push(name.into());
        self.columns.push(Column::Numeric(values.into()));
        self
    }

    /// Add a categorical feature
    pub fn categorical<S: AsRef<str>>(
        mut self,
        name: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        let labels: Vec<Arc<str>> = labels.into_iter().map(|s| Arc::from(s.as_ref())).collect();
        self.names.push(name.into());
        self.columns.push(Column::Categorical(labels.into()));
        self
    }

    /// Declare a clip domain for a continuous feature
    pub fn domain(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.domains.push((name.into(), min, max));
        self
    }

    pub fn build(self) -> Result<Dataset> {
        let mut dataset = Dataset::from_columns(self.names, self.columns)?;
        for (name, min, max) in self.domains {
            dataset = dataset.with_domain(&name, min, max)?;
        }
        Ok(dataset)
    }
}
