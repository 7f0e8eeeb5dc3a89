use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::classify::IndeterminatePolicy;
use crate::compare::FieldPair;
use crate::dedup::{PreferOrder, TieBreak};
use crate::engine::ReconOptions;
use crate::error::ReconError;
use crate::key::{KeyComponent, KeySpec, KeyTransform};
use crate::value::ColumnType;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub left: SourceConfig,
    pub right: SourceConfig,
    pub key: Vec<KeyComponent>,
    #[serde(default)]
    pub key_transform: KeyTransform,
    #[serde(default)]
    pub tie_break: TieBreakConfig,
    #[serde(default)]
    pub no_comparable_fields: IndeterminatePolicy,
    #[serde(default)]
    pub compare: Vec<FieldPair>,
    #[serde(default)]
    pub aggregate: Vec<AggregateConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where one side's records come from and how its cells are read.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    /// Cells equal to one of these become missing values.
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Declared column types; undeclared columns are inferred.
    #[serde(default)]
    pub types: HashMap<String, ColumnType>,
    #[serde(default)]
    pub filter: Option<RowFilter>,
}

impl SourceConfig {
    /// A source with default reading rules.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            null_values: default_null_values(),
            delimiter: default_delimiter(),
            types: HashMap::new(),
            filter: None,
        }
    }
}

fn default_null_values() -> Vec<String> {
    vec![String::new()]
}

fn default_delimiter() -> char {
    ','
}

/// Keep only rows whose `column` holds one of `values`.
#[derive(Debug, Clone, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tie-break
// ---------------------------------------------------------------------------

/// `tie_break = "first"`, `"last"`, or `{ prefer = "field", order = "max" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TieBreakConfig {
    Policy(TieBreakPolicy),
    Prefer {
        prefer: String,
        #[serde(default)]
        order: PreferOrder,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    First,
    Last,
}

impl Default for TieBreakConfig {
    fn default() -> Self {
        Self::Policy(TieBreakPolicy::First)
    }
}

impl TieBreakConfig {
    pub fn to_tie_break(&self) -> TieBreak {
        match self {
            Self::Policy(TieBreakPolicy::First) => TieBreak::First,
            Self::Policy(TieBreakPolicy::Last) => TieBreak::Last,
            Self::Prefer { prefer, order } => TieBreak::Prefer {
                field: prefer.clone(),
                order: *order,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateConfig {
    pub name: String,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub grand_total: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub records_csv: Option<String>,
    #[serde(default)]
    pub aggregates_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn key_spec(&self) -> KeySpec {
        KeySpec::new(self.key.clone()).with_transform(self.key_transform)
    }

    pub fn options(&self) -> ReconOptions {
        ReconOptions {
            key_spec: self.key_spec(),
            field_pairs: self.compare.clone(),
            tie_break: self.tie_break.to_tie_break(),
            indeterminate: self.no_comparable_fields,
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let invalid = |msg: String| Err(ReconError::ConfigValidation(msg));

        if self.key.is_empty() {
            return invalid("at least one [[key]] component is required".into());
        }

        let mut key_names = HashSet::new();
        for component in &self.key {
            if component.name.is_empty() {
                return invalid("key component name cannot be empty".into());
            }
            if component.left.as_deref() == Some("") || component.right.as_deref() == Some("") {
                return invalid(format!("key '{}': field alias cannot be empty", component.name));
            }
            if !key_names.insert(component.name.as_str()) {
                return invalid(format!("duplicate key component '{}'", component.name));
            }
        }

        let mut compare_names = HashSet::new();
        for pair in &self.compare {
            if pair.left.is_empty() || pair.right.is_empty() {
                return invalid("compare: left and right field names are required".into());
            }
            if !pair.tolerance.is_finite() || pair.tolerance < 0.0 {
                return invalid(format!(
                    "compare '{}': tolerance must be a non-negative number",
                    pair.name()
                ));
            }
            if !compare_names.insert(pair.name()) {
                return invalid(format!("duplicate compared field '{}'", pair.name()));
            }
        }

        let mut aggregate_names = HashSet::new();
        for agg in &self.aggregate {
            if !aggregate_names.insert(agg.name.as_str()) {
                return invalid(format!("duplicate aggregate '{}'", agg.name));
            }
            if let Some(unknown) = agg.group_by.iter().find(|g| !key_names.contains(g.as_str())) {
                return invalid(format!(
                    "aggregate '{}': group_by '{unknown}' is not a key component",
                    agg.name
                ));
            }
        }

        if let TieBreakConfig::Prefer { prefer, .. } = &self.tie_break {
            if prefer.is_empty() {
                return invalid("tie_break.prefer cannot be empty".into());
            }
        }

        for (side, source) in [("left", &self.left), ("right", &self.right)] {
            if !source.delimiter.is_ascii() {
                return invalid(format!("{side}: delimiter must be a single ASCII character"));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
