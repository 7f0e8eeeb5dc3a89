use std::fmt;

use crate::model::Side;

/// Fatal errors. Anything here aborts the run: the engine was configured
/// incorrectly or the input does not have the declared shape. Data-quality
/// problems are reported as [`crate::model::Diagnostic`]s instead.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty key, duplicate names, etc.).
    ConfigValidation(String),
    /// A designated key field is not part of a record's schema.
    MissingKeyField { side: Side, field: String },
    /// A field referenced by the configuration is not part of the schema.
    MissingField { side: Side, field: String },
    /// Both sides must be keyed with the same number of components.
    KeyArityMismatch { left: usize, right: usize },
    /// Aggregation grouping names a field that is not a key component.
    UnknownGroupField(String),
    /// A cell could not be parsed as its declared type.
    ValueParse { side: Side, row: usize, column: String, value: String },
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingKeyField { side, field } => {
                write!(f, "{side} side: key field '{field}' is not in the record schema")
            }
            Self::MissingField { side, field } => {
                write!(f, "{side} side: field '{field}' is not in the record schema")
            }
            Self::KeyArityMismatch { left, right } => {
                write!(f, "key arity mismatch: left has {left} component(s), right has {right}")
            }
            Self::UnknownGroupField(name) => {
                write!(f, "cannot group by '{name}': not a key component")
            }
            Self::ValueParse { side, row, column, value } => {
                write!(f, "{side} side, row {row}: cannot parse '{value}' in column '{column}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}
