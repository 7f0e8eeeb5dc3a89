use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::compare::FieldPair;
use crate::engine::Reconciliation;
use crate::error::ReconError;
use crate::model::{AggregateRow, FieldTotals, ReconciledRecord, StatusCounts};
use crate::value::{Number, Value};

/// Roll reconciled records up by a subset of key components.
///
/// Summed differences fold the per-record signed differences; they are never
/// `sum(left) - sum(right)`, which lets one-sided gaps on different keys
/// cancel each other out. One-sided values are totalled separately and feed
/// `absolute_gap`.
///
/// Rows are ordered by group value. With `grand_total`, a row with an empty
/// group is appended; an empty `group_by` yields only that row.
pub fn aggregate(
    reconciliation: &Reconciliation,
    group_by: &[String],
    pairs: &[FieldPair],
    grand_total: bool,
) -> Result<Vec<AggregateRow>, ReconError> {
    let positions = group_by
        .iter()
        .map(|name| {
            reconciliation
                .key_fields
                .iter()
                .position(|k| k == name)
                .ok_or_else(|| ReconError::UnknownGroupField(name.clone()))
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let mut groups: BTreeMap<Vec<Value>, GroupTotals> = BTreeMap::new();
    let mut total = GroupTotals::new(pairs);

    for record in &reconciliation.records {
        let group_key: Vec<Value> = positions
            .iter()
            .map(|&p| record.key.0.get(p).cloned().unwrap_or(Value::Missing))
            .collect();
        groups
            .entry(group_key)
            .or_insert_with(|| GroupTotals::new(pairs))
            .add(record, pairs);
        total.add(record, pairs);
    }

    if group_by.is_empty() {
        return Ok(vec![total.finish(IndexMap::new(), pairs)]);
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(values, totals)| {
            let group = group_by.iter().cloned().zip(values).collect();
            totals.finish(group, pairs)
        })
        .collect();

    if grand_total {
        rows.push(total.finish(IndexMap::new(), pairs));
    }

    log::debug!("aggregated {} record(s) into {} row(s)", reconciliation.records.len(), rows.len());
    Ok(rows)
}

struct GroupTotals {
    record_count: usize,
    status_counts: StatusCounts,
    fields: Vec<FieldAccumulator>,
}

#[derive(Default)]
struct FieldAccumulator {
    left_sum: Option<Number>,
    right_sum: Option<Number>,
    difference: Option<Number>,
    compared: usize,
    left_only: Option<Number>,
    right_only: Option<Number>,
    absolute_gap: Option<Number>,
}

fn accumulate(slot: &mut Option<Number>, n: Number) {
    *slot = Some(match *slot {
        Some(total) => total.add(n),
        None => n,
    });
}

impl GroupTotals {
    fn new(pairs: &[FieldPair]) -> Self {
        Self {
            record_count: 0,
            status_counts: StatusCounts::default(),
            fields: pairs.iter().map(|_| FieldAccumulator::default()).collect(),
        }
    }

    fn add(&mut self, record: &ReconciledRecord, pairs: &[FieldPair]) {
        self.record_count += 1;
        self.status_counts.record(record.status);

        for (acc, pair) in self.fields.iter_mut().zip(pairs) {
            let left = record
                .left
                .as_ref()
                .and_then(|r| r.get(&pair.left))
                .and_then(Value::as_number);
            let right = record
                .right
                .as_ref()
                .and_then(|r| r.get(&pair.right))
                .and_then(Value::as_number);

            if let Some(l) = left {
                accumulate(&mut acc.left_sum, l);
            }
            if let Some(r) = right {
                accumulate(&mut acc.right_sum, r);
            }

            match record.difference(pair.name()) {
                Some(delta) => {
                    accumulate(&mut acc.difference, delta);
                    accumulate(&mut acc.absolute_gap, delta.abs());
                    acc.compared += 1;
                }
                None => match (left, right) {
                    (Some(l), None) => {
                        accumulate(&mut acc.left_only, l);
                        accumulate(&mut acc.absolute_gap, l.abs());
                    }
                    (None, Some(r)) => {
                        accumulate(&mut acc.right_only, r);
                        accumulate(&mut acc.absolute_gap, r.abs());
                    }
                    _ => {}
                },
            }
        }
    }

    fn finish(self, group: IndexMap<String, Value>, pairs: &[FieldPair]) -> AggregateRow {
        AggregateRow {
            group,
            record_count: self.record_count,
            status_counts: self.status_counts,
            fields: self
                .fields
                .into_iter()
                .zip(pairs)
                .map(|(acc, pair)| FieldTotals {
                    field: pair.name().to_string(),
                    left_sum: acc.left_sum,
                    right_sum: acc.right_sum,
                    difference: acc.difference,
                    compared: acc.compared,
                    left_only: acc.left_only,
                    right_only: acc.right_only,
                    absolute_gap: acc.absolute_gap.unwrap_or(Number::Integer(0)),
                })
                .collect(),
        }
    }
}
