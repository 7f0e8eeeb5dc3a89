use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::{Number, Value};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which input set a record or diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered mapping from field name to value.
///
/// A field that is not in the map is not part of this record's schema. A
/// field that is in the map with [`Value::Missing`] is part of the schema and
/// has no value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// `None` when the field is not part of the schema.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One input collection: a shared schema plus its records in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, records: Vec::new() }
    }

    /// Build a set whose schema is taken from the first record.
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns = records
            .first()
            .map(|r| r.field_names().map(String::from).collect())
            .unwrap_or_default();
        Self { columns, records }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Ordered tuple of key-component values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Key(pub Vec<Value>);

impl Key {
    pub fn components(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match v {
                Value::Missing => f.write_str("<missing>")?,
                Value::Text(s) => write!(f, "{s:?}")?,
                other => write!(f, "{other}")?,
            }
        }
        f.write_str(")")
    }
}

impl<V: Into<Value>> FromIterator<V> for Key {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Key(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Reconciled output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Match,
    Mismatch,
    LeftOnly,
    RightOnly,
    /// Both sides exist but no designated field could be compared.
    Indeterminate,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Match => "match",
            Status::Mismatch => "mismatch",
            Status::LeftOnly => "left_only",
            Status::RightOnly => "right_only",
            Status::Indeterminate => "indeterminate",
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Status::Match)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row per distinct key in the union of both deduplicated sets.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledRecord {
    pub key: Key,
    pub status: Status,
    pub left: Option<Record>,
    pub right: Option<Record>,
    /// Compared-field name → signed `left - right`, or `None` when either
    /// side has no value for it.
    pub differences: IndexMap<String, Option<Number>>,
}

impl ReconciledRecord {
    pub fn difference(&self, field: &str) -> Option<Number> {
        self.differences.get(field).copied().flatten()
    }

    pub fn side(&self, side: Side) -> Option<&Record> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal data-quality finding. Accumulated alongside a best-effort
/// result; never thrown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The deduplicator discarded the record at `discarded_index`; the record
    /// at `kept_index` represents the key. Indices are input positions.
    DuplicateKey {
        side: Side,
        key: Key,
        kept_index: usize,
        discarded_index: usize,
    },
    /// A compared field held values that cannot be subtracted.
    TypeMismatch {
        key: Key,
        field: String,
        left_type: &'static str,
        right_type: &'static str,
    },
    /// A compared field is not part of one side's schema.
    UnmatchedField { side: Side, field: String },
    /// Both sides present but nothing was comparable.
    IndeterminateStatus { key: Key },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::UnmatchedField { .. } => "unmatched_field",
            Self::IndeterminateStatus { .. } => "indeterminate_status",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { side, key, kept_index, discarded_index } => write!(
                f,
                "{side} key {key}: discarded duplicate at index {discarded_index} (kept index {kept_index})"
            ),
            Self::TypeMismatch { key, field, left_type, right_type } => write!(
                f,
                "key {key}: field '{field}' cannot compare {left_type} with {right_type}"
            ),
            Self::UnmatchedField { side, field } => {
                write!(f, "{side} side has no field '{field}'; differences left absent")
            }
            Self::IndeterminateStatus { key } => {
                write!(f, "key {key}: present on both sides but no field was comparable")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "match")]
    pub matched: usize,
    #[serde(rename = "mismatch")]
    pub mismatched: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub indeterminate: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Match => self.matched += 1,
            Status::Mismatch => self.mismatched += 1,
            Status::LeftOnly => self.left_only += 1,
            Status::RightOnly => self.right_only += 1,
            Status::Indeterminate => self.indeterminate += 1,
        }
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Match => self.matched,
            Status::Mismatch => self.mismatched,
            Status::LeftOnly => self.left_only,
            Status::RightOnly => self.right_only,
            Status::Indeterminate => self.indeterminate,
        }
    }

    pub fn total(&self) -> usize {
        self.matched + self.mismatched + self.left_only + self.right_only + self.indeterminate
    }

    /// Everything that is not a clean match.
    pub fn unreconciled(&self) -> usize {
        self.total() - self.matched
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub left_input: usize,
    pub right_input: usize,
    pub left_keys: usize,
    pub right_keys: usize,
    pub total_records: usize,
    pub status_counts: StatusCounts,
    pub duplicates_discarded: usize,
    pub type_mismatches: usize,
    pub unmatched_fields: usize,
    pub diagnostics: usize,
}

/// Per-field totals inside one aggregation group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTotals {
    pub field: String,
    pub left_sum: Option<Number>,
    pub right_sum: Option<Number>,
    /// Fold of per-record signed differences; `None` if no record had one.
    pub difference: Option<Number>,
    /// Records that contributed a difference.
    pub compared: usize,
    /// Values present on the left with nothing to compare against.
    pub left_only: Option<Number>,
    /// Values present on the right with nothing to compare against.
    pub right_only: Option<Number>,
    /// Σ|difference| + Σ|one-sided value|.
    pub absolute_gap: Number,
}

/// One group of an aggregation. An empty `group` is the grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub group: IndexMap<String, Value>,
    pub record_count: usize,
    pub status_counts: StatusCounts,
    pub fields: Vec<FieldTotals>,
}

impl AggregateRow {
    pub fn is_grand_total(&self) -> bool {
        self.group.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldTotals> {
        self.fields.iter().find(|f| f.field == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedAggregation {
    pub name: String,
    pub group_by: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub key_fields: Vec<String>,
}

/// Full result of a config-driven run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub records: Vec<ReconciledRecord>,
    pub aggregations: Vec<NamedAggregation>,
}

impl ReconResult {
    /// Pretty-printed JSON document of the whole result.
    pub fn to_json(&self) -> Result<String, crate::error::ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| crate::error::ReconError::Io(e.to_string()))
    }
}
