//! Plain records describing tunable parameters.
//!
//! These carry no optimizer state; they are what gets written to and read
//! from a tuning configuration file.

use serde::{Deserialize, Serialize};

/// Which flavour of parameter a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Real-valued, reported at the parameter's precision.
    Continuous,
    /// Whole numbers only; bounds are inclusive integers.
    Integer,
    /// Fixed at construction and excluded from search.
    Static,
}

impl Default for ParameterKind {
    fn default() -> Self {
        Self::Continuous
    }
}

/// Exported state of a parameter: bounds plus the caller-visible value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterData {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
    #[serde(default)]
    pub kind: ParameterKind,
}

/// Construction input for a parameter.
///
/// `value` seeds the starting point; when absent the start is drawn
/// uniformly from the bounds. For [`ParameterKind::Static`] the fixed value
/// is `value`, falling back to `min`, and both bounds collapse onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub kind: ParameterKind,
    /// Rounding granularity of the reported value (continuous only).
    #[serde(default)]
    pub precision: Option<f64>,
}

impl ParameterSpec {
    pub fn continuous(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            value: None,
            kind: ParameterKind::Continuous,
            precision: None,
        }
    }

    pub fn integer(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            kind: ParameterKind::Integer,
            ..Self::continuous(name, min, max)
        }
    }

    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            value: Some(value),
            kind: ParameterKind::Static,
            ..Self::continuous(name, value, value)
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = Some(precision);
        self
    }
}

impl From<ParameterData> for ParameterSpec {
    fn from(data: ParameterData) -> Self {
        Self {
            name: data.name,
            min: data.min,
            max: data.max,
            value: Some(data.value),
            kind: data.kind,
            precision: None,
        }
    }
}
