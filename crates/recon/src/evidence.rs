use crate::model::{Diagnostic, ReconSummary, ReconciledRecord, StatusCounts};

/// Input and key counts gathered before pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputCounts {
    pub left_input: usize,
    pub right_input: usize,
    pub left_keys: usize,
    pub right_keys: usize,
}

/// Compute summary statistics from reconciled records and diagnostics.
pub fn compute_summary(
    records: &[ReconciledRecord],
    diagnostics: &[Diagnostic],
    counts: InputCounts,
) -> ReconSummary {
    let mut status_counts = StatusCounts::default();
    for r in records {
        status_counts.record(r.status);
    }

    let mut duplicates_discarded = 0;
    let mut type_mismatches = 0;
    let mut unmatched_fields = 0;
    for d in diagnostics {
        match d {
            Diagnostic::DuplicateKey { .. } => duplicates_discarded += 1,
            Diagnostic::TypeMismatch { .. } => type_mismatches += 1,
            Diagnostic::UnmatchedField { .. } => unmatched_fields += 1,
            Diagnostic::IndeterminateStatus { .. } => {}
        }
    }

    ReconSummary {
        left_input: counts.left_input,
        right_input: counts.right_input,
        left_keys: counts.left_keys,
        right_keys: counts.right_keys,
        total_records: records.len(),
        status_counts,
        duplicates_discarded,
        type_mismatches,
        unmatched_fields,
        diagnostics: diagnostics.len(),
    }
}

impl ReconSummary {
    /// Every record matched and nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.status_counts.unreconciled() == 0 && self.diagnostics == 0
    }
}
