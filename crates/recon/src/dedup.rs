//! Collapse a record set to one record per key.
//!
//! Upstream duplication is a data-quality defect, so the deduplicator keeps
//! exactly one record per key by a deterministic tie-break, and reports every
//! discarded record. It never sums or merges duplicate values.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::key::KeySpec;
use crate::model::{Diagnostic, Key, Record, RecordSet, Side};
use crate::value::Value;

/// Which record represents a key when several share it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// First record in input order wins.
    #[default]
    First,
    /// Last record in input order wins.
    Last,
    /// Greatest (or least) present value of `field` wins. Integers and
    /// decimals compare by magnitude. Missing values never beat present
    /// ones; ties keep the earlier record.
    Prefer { field: String, order: PreferOrder },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferOrder {
    #[default]
    Max,
    Min,
}

/// A surviving record with its key and input position.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    pub key: Key,
    pub index: usize,
    pub record: Record,
}

/// One discarded duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discard {
    pub key: Key,
    pub kept_index: usize,
    pub discarded_index: usize,
}

/// A record set with unique keys. Only [`dedup`] and [`dedup_by`] build one,
/// which is what lets the reconciler refuse raw input at the type level.
#[derive(Debug, Clone)]
pub struct Deduplicated {
    side: Side,
    columns: Vec<String>,
    arity: usize,
    entries: Vec<KeyedRecord>,
    discards: Vec<Discard>,
}

impl Deduplicated {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of key components every entry was built with.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Surviving records, in order of each key's first appearance.
    pub fn entries(&self) -> &[KeyedRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|e| &e.key)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn discards(&self) -> &[Discard] {
        &self.discards
    }

    pub fn total_discarded(&self) -> usize {
        self.discards.len()
    }

    /// How many records were discarded for `key`.
    pub fn discarded_count(&self, key: &Key) -> usize {
        self.discards.iter().filter(|d| &d.key == key).count()
    }

    /// Discard counts per key, for keys that had duplicates.
    pub fn discard_counts(&self) -> HashMap<Key, usize> {
        let mut counts = HashMap::new();
        for d in &self.discards {
            *counts.entry(d.key.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.discards
            .iter()
            .map(|d| Diagnostic::DuplicateKey {
                side: self.side,
                key: d.key.clone(),
                kept_index: d.kept_index,
                discarded_index: d.discarded_index,
            })
            .collect()
    }

    /// Back to a plain record set (surviving records, same schema).
    pub fn into_record_set(self) -> RecordSet {
        let mut set = RecordSet::new(self.columns);
        for entry in self.entries {
            set.push(entry.record);
        }
        set
    }

    pub(crate) fn into_entries(self) -> Vec<KeyedRecord> {
        self.entries
    }
}

/// Deduplicate `set` by `key_spec` using a configured tie-break.
pub fn dedup(
    set: RecordSet,
    side: Side,
    key_spec: &KeySpec,
    tie_break: &TieBreak,
) -> Result<Deduplicated, ReconError> {
    match tie_break {
        TieBreak::First => dedup_with(set, side, key_spec, |_, _| false),
        TieBreak::Last => dedup_with(set, side, key_spec, |_, _| true),
        TieBreak::Prefer { field, order } => {
            if !set.is_empty() && !set.has_column(field) {
                return Err(ReconError::MissingField { side, field: field.clone() });
            }
            let order = *order;
            dedup_with(set, side, key_spec, |candidate, current| {
                preferred(candidate.get(field), current.get(field), order)
            })
        }
    }
}

/// Deduplicate with a caller-supplied priority comparator: a later record
/// replaces the kept one only when it compares `Greater`.
pub fn dedup_by<F>(
    set: RecordSet,
    side: Side,
    key_spec: &KeySpec,
    priority: F,
) -> Result<Deduplicated, ReconError>
where
    F: Fn(&Record, &Record) -> Ordering,
{
    dedup_with(set, side, key_spec, |candidate, current| {
        priority(candidate, current) == Ordering::Greater
    })
}

fn preferred(candidate: Option<&Value>, current: Option<&Value>, order: PreferOrder) -> bool {
    let candidate = candidate.filter(|v| !v.is_missing());
    let current = current.filter(|v| !v.is_missing());
    match (candidate, current) {
        (Some(_), None) => true,
        (None, _) => false,
        (Some(a), Some(b)) => {
            let ord = match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.cmp_value(y),
                _ => a.cmp(b),
            };
            match order {
                PreferOrder::Max => ord == Ordering::Greater,
                PreferOrder::Min => ord == Ordering::Less,
            }
        }
    }
}

fn dedup_with<F>(
    set: RecordSet,
    side: Side,
    key_spec: &KeySpec,
    replaces: F,
) -> Result<Deduplicated, ReconError>
where
    F: Fn(&Record, &Record) -> bool,
{
    let input_len = set.len();
    let columns = set.columns().to_vec();

    let mut slots: HashMap<Key, usize> = HashMap::with_capacity(input_len);
    let mut entries: Vec<KeyedRecord> = Vec::with_capacity(input_len);
    let mut losers: Vec<Vec<usize>> = Vec::with_capacity(input_len);

    for (index, record) in set.into_records().into_iter().enumerate() {
        let key = key_spec.key_for(&record, side)?;
        match slots.get(&key) {
            Some(&pos) => {
                let entry = &mut entries[pos];
                if replaces(&record, &entry.record) {
                    losers[pos].push(entry.index);
                    entry.index = index;
                    entry.record = record;
                } else {
                    losers[pos].push(index);
                }
            }
            None => {
                slots.insert(key.clone(), entries.len());
                entries.push(KeyedRecord { key, index, record });
                losers.push(Vec::new());
            }
        }
    }

    let mut discards = Vec::new();
    for (entry, mut lost) in entries.iter().zip(losers) {
        if lost.is_empty() {
            continue;
        }
        lost.sort_unstable();
        log::warn!(
            "{side} key {}: {} duplicate record(s) discarded, kept index {}",
            entry.key,
            lost.len(),
            entry.index
        );
        discards.extend(lost.into_iter().map(|discarded_index| Discard {
            key: entry.key.clone(),
            kept_index: entry.index,
            discarded_index,
        }));
    }

    log::debug!(
        "{side}: deduplicated {input_len} record(s) to {} key(s)",
        entries.len()
    );

    Ok(Deduplicated {
        side,
        columns,
        arity: key_spec.len(),
        entries,
        discards,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &str, qty: i64, version: Option<i64>) -> Record {
        Record::from_pairs([
            ("sku", Value::from(key)),
            ("qty", Value::Integer(qty)),
            ("version", Value::from(version)),
        ])
    }

    fn set(records: Vec<Record>) -> RecordSet {
        RecordSet::from_records(records)
    }

    fn spec() -> KeySpec {
        KeySpec::shared(["sku"])
    }

    #[test]
    fn first_wins_by_default() {
        let input = set(vec![rec("A", 1, None), rec("B", 2, None), rec("A", 3, None)]);
        let d = dedup(input, Side::Left, &spec(), &TieBreak::First).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.entries()[0].record.get("qty"), Some(&Value::Integer(1)));
        assert_eq!(d.entries()[0].index, 0);
        assert_eq!(d.total_discarded(), 1);
        assert_eq!(d.discards()[0].discarded_index, 2);
    }

    #[test]
    fn last_wins() {
        let input = set(vec![rec("A", 1, None), rec("A", 2, None), rec("A", 3, None)]);
        let d = dedup(input, Side::Left, &spec(), &TieBreak::Last).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries()[0].record.get("qty"), Some(&Value::Integer(3)));
        assert_eq!(d.entries()[0].index, 2);
        let discarded: Vec<usize> = d.discards().iter().map(|x| x.discarded_index).collect();
        assert_eq!(discarded, vec![0, 1]);
        assert!(d.discards().iter().all(|x| x.kept_index == 2));
    }

    #[test]
    fn prefer_max_ignores_missing() {
        let input = set(vec![
            rec("A", 1, Some(2)),
            rec("A", 2, None),
            rec("A", 3, Some(5)),
            rec("A", 4, Some(5)),
        ]);
        let tie = TieBreak::Prefer { field: "version".into(), order: PreferOrder::Max };
        let d = dedup(input, Side::Right, &spec(), &tie).unwrap();
        assert_eq!(d.entries()[0].record.get("qty"), Some(&Value::Integer(3)));
        assert_eq!(d.discarded_count(&Key(vec![Value::from("A")])), 3);
    }

    #[test]
    fn prefer_min() {
        let input = set(vec![rec("A", 1, Some(4)), rec("A", 2, Some(1))]);
        let tie = TieBreak::Prefer { field: "version".into(), order: PreferOrder::Min };
        let d = dedup(input, Side::Left, &spec(), &tie).unwrap();
        assert_eq!(d.entries()[0].record.get("qty"), Some(&Value::Integer(2)));
    }

    #[test]
    fn prefer_compares_mixed_numbers_by_magnitude() {
        let source = crate::config::SourceConfig::new("versions.csv");
        let input = crate::table::load_csv(Side::Left, "sku,version,qty\nA,10,1\nA,2.5,2\nA,7,3\n", &source).unwrap();

        let max = TieBreak::Prefer { field: "version".into(), order: PreferOrder::Max };
        let d = dedup(input.clone(), Side::Left, &spec(), &max).unwrap();
        assert_eq!(d.entries()[0].record.get("version"), Some(&Value::Integer(10)));
        assert_eq!(d.entries()[0].index, 0);

        let min = TieBreak::Prefer { field: "version".into(), order: PreferOrder::Min };
        let d = dedup(input, Side::Left, &spec(), &min).unwrap();
        assert_eq!(d.entries()[0].record.get("version"), Some(&Value::Decimal(2.5)));
        assert_eq!(d.total_discarded(), 2);
    }

    #[test]
    fn long_numeric_ids_are_distinct_keys() {
        let source = crate::config::SourceConfig::new("ids.csv");
        let input = crate::table::load_csv(
            Side::Left,
            "id,qty\n12345678901234567890,1\n12345678901234567891,2\n",
            &source,
        )
        .unwrap();
        let d = dedup(input, Side::Left, &KeySpec::shared(["id"]), &TieBreak::First).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.total_discarded(), 0);
    }

    #[test]
    fn prefer_unknown_field_is_fatal() {
        let input = set(vec![rec("A", 1, None)]);
        let tie = TieBreak::Prefer { field: "updated_at".into(), order: PreferOrder::Max };
        let err = dedup(input, Side::Left, &spec(), &tie).unwrap_err();
        assert!(matches!(err, ReconError::MissingField { .. }));
    }

    #[test]
    fn custom_comparator() {
        let input = set(vec![rec("A", 5, None), rec("A", 9, None), rec("A", 7, None)]);
        let d = dedup_by(input, Side::Left, &spec(), |a, b| a.get("qty").cmp(&b.get("qty"))).unwrap();
        assert_eq!(d.entries()[0].record.get("qty"), Some(&Value::Integer(9)));
        assert_eq!(d.total_discarded(), 2);
    }

    #[test]
    fn duplicates_are_never_summed() {
        let input = set(vec![rec("A", 10, None), rec("A", 10, None), rec("A", 10, None)]);
        let d = dedup(input, Side::Right, &spec(), &TieBreak::First).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries()[0].record.get("qty"), Some(&Value::Integer(10)));
        let diags = d.diagnostics();
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|x| x.kind() == "duplicate_key"));
    }

    #[test]
    fn missing_key_values_group_together() {
        let input = set(vec![
            Record::from_pairs([("sku", Value::Missing), ("qty", Value::Integer(1))]),
            Record::from_pairs([("sku", Value::Missing), ("qty", Value::Integer(2))]),
        ]);
        let d = dedup(input, Side::Left, &spec(), &TieBreak::First).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries()[0].key, Key(vec![Value::Missing]));
    }

    #[test]
    fn idempotent() {
        let input = set(vec![rec("A", 1, None), rec("B", 2, None), rec("A", 3, None)]);
        let once = dedup(input, Side::Left, &spec(), &TieBreak::First).unwrap();
        let twice = dedup(once.clone().into_record_set(), Side::Left, &spec(), &TieBreak::First).unwrap();
        assert_eq!(
            once.records().collect::<Vec<_>>(),
            twice.records().collect::<Vec<_>>()
        );
        assert_eq!(twice.total_discarded(), 0);
    }

    #[test]
    fn missing_key_field_aborts() {
        let input = set(vec![Record::from_pairs([("qty", Value::Integer(1))])]);
        let err = dedup(input, Side::Left, &spec(), &TieBreak::First).unwrap_err();
        assert!(matches!(err, ReconError::MissingKeyField { .. }));
    }
}
