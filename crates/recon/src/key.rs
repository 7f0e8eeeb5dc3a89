//! Canonical composite keys.

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{Key, Record, Side};
use crate::value::Value;

/// One key component: a canonical name plus the field name on each side.
///
/// Unknown fields are rejected: a top-level setting written after a
/// `[[key]]` table lands here in TOML and must not be silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyComponent {
    pub name: String,
    #[serde(default)]
    pub left: Option<String>,
    #[serde(default)]
    pub right: Option<String>,
}

impl KeyComponent {
    /// A component whose field has the same name on both sides.
    pub fn shared(name: impl Into<String>) -> Self {
        Self { name: name.into(), left: None, right: None }
    }

    pub fn aliased(
        name: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            left: Some(left.into()),
            right: Some(right.into()),
        }
    }

    pub fn field(&self, side: Side) -> &str {
        let alias = match side {
            Side::Left => self.left.as_deref(),
            Side::Right => self.right.as_deref(),
        };
        alias.unwrap_or(&self.name)
    }
}

/// Canonicalization applied to text key components before matching.
/// Non-text values pass through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTransform {
    #[default]
    None,
    /// Strip surrounding whitespace.
    Trim,
    /// Strip surrounding whitespace, then uppercase.
    Uppercase,
    /// Keep ASCII digits only.
    Digits,
}

impl KeyTransform {
    pub fn apply(self, value: &Value) -> Value {
        let Value::Text(raw) = value else {
            return value.clone();
        };
        match self {
            Self::None => value.clone(),
            Self::Trim => Value::Text(raw.trim().to_string()),
            Self::Uppercase => Value::Text(raw.trim().to_uppercase()),
            Self::Digits => Value::Text(raw.chars().filter(|c| c.is_ascii_digit()).collect()),
        }
    }
}

/// Ordered key specification shared by both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpec {
    pub components: Vec<KeyComponent>,
    pub transform: KeyTransform,
}

impl KeySpec {
    pub fn new(components: Vec<KeyComponent>) -> Self {
        Self { components, transform: KeyTransform::None }
    }

    /// Key made of fields named identically on both sides.
    pub fn shared<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::new(names.into_iter().map(KeyComponent::shared).collect())
    }

    pub fn with_transform(mut self, transform: KeyTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Extract the key tuple for `record`.
    ///
    /// A key field absent from the record's schema is a
    /// [`ReconError::MissingKeyField`]; a key field holding
    /// [`Value::Missing`] yields a missing slot in the tuple.
    pub fn key_for(&self, record: &Record, side: Side) -> Result<Key, ReconError> {
        self.components
            .iter()
            .map(|c| {
                let field = c.field(side);
                record
                    .get(field)
                    .map(|v| self.transform.apply(v))
                    .ok_or_else(|| ReconError::MissingKeyField {
                        side,
                        field: field.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Key)
    }

    /// Check that every key field is part of a set's column list.
    pub fn check_columns(&self, columns: &[String], side: Side) -> Result<(), ReconError> {
        for c in &self.components {
            let field = c.field(side);
            if !columns.iter().any(|col| col == field) {
                return Err(ReconError::MissingKeyField { side, field: field.to_string() });
            }
        }
        Ok(())
    }
}
