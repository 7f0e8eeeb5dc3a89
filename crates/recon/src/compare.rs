//! Null-safe field-level differences between a matched pair.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::model::{Record, Side};
use crate::value::{Number, Value};

/// One entry of the field-alias table: a left field and the right field that
/// holds the same attribute.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldPair {
    /// Output name of the compared field; defaults to the left field name.
    #[serde(default)]
    pub name: Option<String>,
    pub left: String,
    pub right: String,
    /// Largest absolute difference still classified as a match.
    #[serde(default)]
    pub tolerance: f64,
}

impl FieldPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self { name: None, left: left.into(), right: right.into(), tolerance: 0.0 }
    }

    /// Same field name on both sides.
    pub fn same(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(field.clone(), field)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.left)
    }

    pub fn field(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Two present values that cannot be subtracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub field: String,
    pub left_type: &'static str,
    pub right_type: &'static str,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': cannot subtract {} from {}",
            self.field, self.right_type, self.left_type
        )
    }
}

impl std::error::Error for TypeMismatch {}

/// `left - right` for two values.
///
/// Either value missing → `Ok(None)`. Both present and numeric →
/// `Ok(Some(delta))`. Anything else is a [`TypeMismatch`].
pub fn difference(field: &str, left: &Value, right: &Value) -> Result<Option<Number>, TypeMismatch> {
    if left.is_missing() || right.is_missing() {
        return Ok(None);
    }
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => Ok(Some(l.sub(r))),
        _ => Err(TypeMismatch {
            field: field.to_string(),
            left_type: left.type_name(),
            right_type: right.type_name(),
        }),
    }
}

/// Differences for one pairing, plus any type mismatches met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub differences: IndexMap<String, Option<Number>>,
    pub mismatches: Vec<TypeMismatch>,
}

/// Compare every designated pair. A side that is entirely absent, or a field
/// that is absent from a side's record, leaves the entry `None`.
pub fn compare_pair(pairs: &[FieldPair], left: Option<&Record>, right: Option<&Record>) -> Comparison {
    let mut out = Comparison::default();
    for pair in pairs {
        let left_value = left.and_then(|r| r.get(&pair.left));
        let right_value = right.and_then(|r| r.get(&pair.right));
        let delta = match (left_value, right_value) {
            (Some(l), Some(r)) => difference(pair.name(), l, r).unwrap_or_else(|mismatch| {
                out.mismatches.push(mismatch);
                None
            }),
            _ => None,
        };
        out.differences.insert(pair.name().to_string(), delta);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(v: impl Into<Value>) -> Record {
        Record::from_pairs([("qty", v.into())])
    }

    #[test]
    fn present_numeric_values_subtract() {
        let pairs = [FieldPair::same("qty")];
        let out = compare_pair(&pairs, Some(&qty(10i64)), Some(&qty(7i64)));
        assert_eq!(out.differences["qty"], Some(Number::Integer(3)));
        assert!(out.mismatches.is_empty());
    }

    #[test]
    fn equal_values_give_zero_not_absent() {
        let pairs = [FieldPair::same("qty")];
        let out = compare_pair(&pairs, Some(&qty(10i64)), Some(&qty(10i64)));
        assert_eq!(out.differences["qty"], Some(Number::Integer(0)));
    }

    #[test]
    fn missing_value_gives_absent_not_zero() {
        let pairs = [FieldPair::same("qty")];
        let out = compare_pair(&pairs, Some(&qty(Value::Missing)), Some(&qty(7i64)));
        assert_eq!(out.differences["qty"], None);
        assert!(out.differences.contains_key("qty"));
    }

    #[test]
    fn absent_side_gives_absent() {
        let pairs = [FieldPair::same("qty")];
        let out = compare_pair(&pairs, Some(&qty(5i64)), None);
        assert_eq!(out.differences["qty"], None);
    }

    #[test]
    fn aliased_fields_and_output_name() {
        let pairs = [FieldPair::new("qty", "quantity").named("units")];
        let left = qty(4i64);
        let right = Record::from_pairs([("quantity", Value::Decimal(1.5))]);
        let out = compare_pair(&pairs, Some(&left), Some(&right));
        assert_eq!(out.differences["units"], Some(Number::Decimal(2.5)));
    }

    #[test]
    fn type_mismatch_is_reported_and_absent() {
        let pairs = [FieldPair::same("qty")];
        let out = compare_pair(&pairs, Some(&qty("ten")), Some(&qty(10i64)));
        assert_eq!(out.differences["qty"], None);
        assert_eq!(
            out.mismatches,
            vec![TypeMismatch { field: "qty".into(), left_type: "text", right_type: "integer" }]
        );
    }

    #[test]
    fn dates_are_not_numeric() {
        let d = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let err = difference("when", &Value::Date(d), &Value::Date(d)).unwrap_err();
        assert_eq!(err.left_type, "date");
    }
}
