use indexmap::IndexMap;
use serde::Deserialize;

use crate::compare::FieldPair;
use crate::model::{Record, Status};
use crate::value::Number;

/// What to call a record that exists on both sides when none of its
/// designated fields could be compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminatePolicy {
    /// Surface it as [`Status::Indeterminate`].
    #[default]
    Indeterminate,
    /// Fold it into [`Status::Match`].
    Match,
}

/// Assign a status by fixed precedence: left only, right only, match,
/// mismatch. Both sides present with nothing comparable falls to `policy`.
pub fn classify(
    left: Option<&Record>,
    right: Option<&Record>,
    differences: &IndexMap<String, Option<Number>>,
    pairs: &[FieldPair],
    policy: IndeterminatePolicy,
) -> Status {
    match (left.is_some(), right.is_some()) {
        (true, false) => return Status::LeftOnly,
        (false, true) => return Status::RightOnly,
        // The reconciler never pairs two absent sides.
        (false, false) => return Status::Indeterminate,
        (true, true) => {}
    }

    if pairs.is_empty() {
        return Status::Match;
    }

    let mut compared = 0;
    for pair in pairs {
        let Some(Some(delta)) = differences.get(pair.name()) else {
            continue;
        };
        compared += 1;
        if !delta.within(pair.tolerance) {
            return Status::Mismatch;
        }
    }

    if compared > 0 {
        return Status::Match;
    }

    match policy {
        IndeterminatePolicy::Indeterminate => Status::Indeterminate,
        IndeterminatePolicy::Match => Status::Match,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn record() -> Record {
        Record::from_pairs([("qty", Value::Integer(1))])
    }

    fn diffs(entries: &[(&str, Option<Number>)]) -> IndexMap<String, Option<Number>> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn one_sided_records() {
        let r = record();
        let pairs = [FieldPair::same("qty")];
        let d = diffs(&[("qty", None)]);
        assert_eq!(classify(Some(&r), None, &d, &pairs, IndeterminatePolicy::Match), Status::LeftOnly);
        assert_eq!(classify(None, Some(&r), &d, &pairs, IndeterminatePolicy::Match), Status::RightOnly);
    }

    #[test]
    fn zero_differences_match() {
        let r = record();
        let pairs = [FieldPair::same("qty"), FieldPair::same("price")];
        let d = diffs(&[("qty", Some(Number::Integer(0))), ("price", None)]);
        assert_eq!(
            classify(Some(&r), Some(&r), &d, &pairs, IndeterminatePolicy::Indeterminate),
            Status::Match
        );
    }

    #[test]
    fn any_nonzero_difference_mismatches() {
        let r = record();
        let pairs = [FieldPair::same("qty"), FieldPair::same("price")];
        let d = diffs(&[("qty", Some(Number::Integer(0))), ("price", Some(Number::Decimal(-0.5)))]);
        assert_eq!(
            classify(Some(&r), Some(&r), &d, &pairs, IndeterminatePolicy::Indeterminate),
            Status::Mismatch
        );
    }

    #[test]
    fn tolerance_absorbs_small_deltas() {
        let r = record();
        let pairs = [FieldPair::same("price").with_tolerance(0.01)];
        let d = diffs(&[("price", Some(Number::Decimal(0.01)))]);
        assert_eq!(
            classify(Some(&r), Some(&r), &d, &pairs, IndeterminatePolicy::Indeterminate),
            Status::Match
        );
    }

    #[test]
    fn empty_field_list_matches() {
        let r = record();
        assert_eq!(
            classify(Some(&r), Some(&r), &IndexMap::new(), &[], IndeterminatePolicy::Indeterminate),
            Status::Match
        );
    }

    #[test]
    fn nothing_comparable_is_indeterminate_unless_configured() {
        let r = record();
        let pairs = [FieldPair::same("qty")];
        let d = diffs(&[("qty", None)]);
        assert_eq!(
            classify(Some(&r), Some(&r), &d, &pairs, IndeterminatePolicy::Indeterminate),
            Status::Indeterminate
        );
        assert_eq!(
            classify(Some(&r), Some(&r), &d, &pairs, IndeterminatePolicy::Match),
            Status::Match
        );
    }
}
