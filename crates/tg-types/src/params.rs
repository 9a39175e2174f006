//! Parameter values and set-valued parameter grids.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Vectorizer parameter names.
pub mod keys {
    pub const NGRAM_RANGE: &str = "ngram_range";
    pub const MAX_DF: &str = "max_df";
    pub const MIN_DF: &str = "min_df";
    pub const USE_IDF: &str = "use_idf";
    pub const NORM: &str = "norm";
    pub const SELECT_PERCENTILE: &str = "percentile";

    pub const CLASS_WEIGHT: &str = "class_weight";
    pub const ALPHA: &str = "alpha";
    pub const PENALTY: &str = "penalty";
    pub const MAX_FEATURES: &str = "max_features";
}

/// A single concrete hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent value, e.g. `norm = None` or `class_weight = None`.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Inclusive n-gram range `(min_n, max_n)`.
    Range(u32, u32),
}

impl ParamValue {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Range(lo, hi) => write!(f, "({lo}, {hi})"),
        }
    }
}

/// Mapping from parameter name to an ordered set of candidate values.
///
/// Keys iterate in sorted order so expansion is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    entries: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces any existing candidates for `name`.
    pub fn with(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.set(name, values);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, values: Vec<ParamValue>) {
        self.entries.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[ParamValue]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of `self` with every entry of `other` merged in (other wins).
    pub fn merged(&self, other: &ParamGrid) -> ParamGrid {
        let mut merged = self.clone();
        for (name, values) in other.iter() {
            merged.set(name, values.to_vec());
        }
        merged
    }

    /// Number of concrete combinations (`None` on overflow).
    pub fn combinations(&self) -> Option<usize> {
        let mut total: usize = 1;
        for values in self.entries.values() {
            total = total.checked_mul(values.len())?;
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_like_the_worker_expects() {
        assert_eq!(ParamValue::Range(1, 3).to_string(), "(1, 3)");
        assert_eq!(ParamValue::None.to_string(), "None");
        assert_eq!(ParamValue::text("l2").to_string(), "l2");
    }

    #[test]
    fn untagged_json_shapes() {
        let values = vec![
            ParamValue::None,
            ParamValue::Bool(false),
            ParamValue::Int(3),
            ParamValue::Float(0.7),
            ParamValue::text("balanced"),
            ParamValue::Range(2, 2),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,false,3,0.7,"balanced",[2,2]]"#);

        let back: Vec<ParamValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn merged_overrides_and_keeps_original() {
        let base = ParamGrid::new()
            .with(keys::USE_IDF, vec![ParamValue::Bool(true), ParamValue::Bool(false)])
            .with(keys::MIN_DF, vec![ParamValue::Int(3), ParamValue::Int(1)]);
        let overrides = ParamGrid::new().with(keys::USE_IDF, vec![ParamValue::Bool(false)]);

        let merged = base.merged(&overrides);
        assert_eq!(merged.get(keys::USE_IDF), Some(&[ParamValue::Bool(false)][..]));
        assert_eq!(merged.get(keys::MIN_DF).map(<[_]>::len), Some(2));
        assert_eq!(base.get(keys::USE_IDF).map(<[_]>::len), Some(2));
    }

    #[test]
    fn combinations_is_product_of_axis_sizes() {
        let grid = ParamGrid::new()
            .with("a", vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(3)])
            .with("b", vec![ParamValue::Bool(true), ParamValue::Bool(false)]);
        assert_eq!(grid.combinations(), Some(6));
        assert_eq!(ParamGrid::new().combinations(), Some(1));
    }
}
