use serde::Serialize;

use crate::classify::{classify, IndeterminatePolicy};
use crate::compare::{compare_pair, FieldPair};
use crate::config::ReconConfig;
use crate::dedup::{dedup, Discard, TieBreak};
use crate::error::ReconError;
use crate::evidence::{compute_summary, InputCounts};
use crate::key::KeySpec;
use crate::model::{
    Diagnostic, Key, NamedAggregation, ReconMeta, ReconResult, ReconSummary, ReconciledRecord,
    RecordSet, Side, Status,
};
use crate::reconcile::pair;

pub use crate::aggregate::aggregate;

/// Everything a reconciliation run needs besides the two record sets.
#[derive(Debug, Clone, Default)]
pub struct ReconOptions {
    pub key_spec: KeySpec,
    pub field_pairs: Vec<FieldPair>,
    pub tie_break: TieBreak,
    pub indeterminate: IndeterminatePolicy,
}

impl ReconOptions {
    pub fn new(key_spec: KeySpec, field_pairs: Vec<FieldPair>) -> Self {
        Self {
            key_spec,
            field_pairs,
            ..Self::default()
        }
    }
}

/// Reconciled records plus everything reported while producing them.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub key_fields: Vec<String>,
    pub summary: ReconSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub records: Vec<ReconciledRecord>,
    #[serde(skip)]
    pub left_discards: Vec<Discard>,
    #[serde(skip)]
    pub right_discards: Vec<Discard>,
}

impl Reconciliation {
    /// Number of records the deduplicator dropped for `key` on `side`.
    pub fn discarded_count(&self, side: Side, key: &Key) -> usize {
        let discards = match side {
            Side::Left => &self.left_discards,
            Side::Right => &self.right_discards,
        };
        discards.iter().filter(|d| &d.key == key).count()
    }

    pub fn get(&self, key: &Key) -> Option<&ReconciledRecord> {
        self.records.iter().find(|r| &r.key == key)
    }

    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &ReconciledRecord> {
        self.records.iter().filter(move |r| r.status == status)
    }
}

/// Reconcile two record sets with the default tie-break (first record wins)
/// and indeterminate policy.
pub fn reconcile(
    left: RecordSet,
    right: RecordSet,
    key_spec: &KeySpec,
    field_pairs: &[FieldPair],
) -> Result<Reconciliation, ReconError> {
    reconcile_with(left, right, &ReconOptions::new(key_spec.clone(), field_pairs.to_vec()))
}

/// Deduplicate both sides, pair them by key, compare and classify.
///
/// Schema errors abort; duplicates, type mismatches, unmatched fields and
/// indeterminate statuses are returned as diagnostics.
pub fn reconcile_with(
    left: RecordSet,
    right: RecordSet,
    options: &ReconOptions,
) -> Result<Reconciliation, ReconError> {
    let key_spec = &options.key_spec;
    let pairs = options.field_pairs.as_slice();

    for (side, set) in [(Side::Left, &left), (Side::Right, &right)] {
        if !set.columns().is_empty() {
            key_spec.check_columns(set.columns(), side)?;
        }
    }

    let mut diagnostics = unmatched_fields(&left, &right, pairs);

    let mut counts = InputCounts {
        left_input: left.len(),
        right_input: right.len(),
        ..InputCounts::default()
    };

    let left = dedup(left, Side::Left, key_spec, &options.tie_break)?;
    let right = dedup(right, Side::Right, key_spec, &options.tie_break)?;
    counts.left_keys = left.len();
    counts.right_keys = right.len();

    diagnostics.extend(left.diagnostics());
    diagnostics.extend(right.diagnostics());
    let left_discards = left.discards().to_vec();
    let right_discards = right.discards().to_vec();

    let mut records = Vec::new();
    for pairing in pair(left, right)? {
        let comparison = compare_pair(pairs, pairing.left.as_ref(), pairing.right.as_ref());
        for mismatch in comparison.mismatches {
            log::warn!("key {}: {mismatch}", pairing.key);
            diagnostics.push(Diagnostic::TypeMismatch {
                key: pairing.key.clone(),
                field: mismatch.field,
                left_type: mismatch.left_type,
                right_type: mismatch.right_type,
            });
        }

        let status = classify(
            pairing.left.as_ref(),
            pairing.right.as_ref(),
            &comparison.differences,
            pairs,
            options.indeterminate,
        );
        if status == Status::Indeterminate {
            log::warn!("key {}: present on both sides, nothing comparable", pairing.key);
            diagnostics.push(Diagnostic::IndeterminateStatus { key: pairing.key.clone() });
        }

        records.push(ReconciledRecord {
            key: pairing.key,
            status,
            left: pairing.left,
            right: pairing.right,
            differences: comparison.differences,
        });
    }

    let summary = compute_summary(&records, &diagnostics, counts);
    log::debug!(
        "reconciled {} key(s) with {} diagnostic(s)",
        summary.total_records,
        summary.diagnostics
    );

    Ok(Reconciliation {
        key_fields: key_spec.names(),
        summary,
        diagnostics,
        records,
        left_discards,
        right_discards,
    })
}

fn unmatched_fields(left: &RecordSet, right: &RecordSet, pairs: &[FieldPair]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for (side, set) in [(Side::Left, left), (Side::Right, right)] {
        if set.columns().is_empty() {
            continue;
        }
        for pair in pairs {
            let field = pair.field(side);
            if !set.has_column(field) {
                log::warn!("{side} side has no compared field '{field}'");
                out.push(Diagnostic::UnmatchedField { side, field: field.to_string() });
            }
        }
    }
    out
}

/// Run reconciliation per config. Returns records, diagnostics, summary and
/// every configured aggregation.
pub fn run(config: &ReconConfig, left: RecordSet, right: RecordSet) -> Result<ReconResult, ReconError> {
    let reconciliation = reconcile_with(left, right, &config.options())?;

    let mut aggregations = Vec::with_capacity(config.aggregate.len());
    for agg in &config.aggregate {
        let rows = aggregate(&reconciliation, &agg.group_by, &config.compare, agg.grand_total)?;
        aggregations.push(NamedAggregation {
            name: agg.name.clone(),
            group_by: agg.group_by.clone(),
            rows,
        });
    }

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            key_fields: reconciliation.key_fields,
        },
        summary: reconciliation.summary,
        diagnostics: reconciliation.diagnostics,
        records: reconciliation.records,
        aggregations,
    })
}
