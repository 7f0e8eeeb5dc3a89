//! Full-outer pairing of two deduplicated sets by key.

use std::collections::HashMap;

use crate::dedup::{Deduplicated, KeyedRecord};
use crate::error::ReconError;
use crate::model::{Key, Record};

/// One distinct key with whichever sides carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    pub key: Key,
    pub left: Option<Record>,
    pub right: Option<Record>,
}

impl Pairing {
    fn new(left: Option<KeyedRecord>, right: Option<KeyedRecord>) -> Self {
        let (left_key, left) = split(left);
        let (right_key, right) = split(right);
        // Keys are equal when both sides exist.
        let key = left_key.or(right_key).unwrap_or_else(|| Key(Vec::new()));
        Self { key, left, right }
    }
}

fn split(entry: Option<KeyedRecord>) -> (Option<Key>, Option<Record>) {
    match entry {
        Some(e) => (Some(e.key), Some(e.record)),
        None => (None, None),
    }
}

/// Pair `left` and `right` on their keys.
///
/// Emits exactly one [`Pairing`] per key in `keys(left) ∪ keys(right)`: left
/// keys first in their order, then right-only keys in right order. Inputs
/// must come from the deduplicator, so no key can fan out.
pub fn pair(left: Deduplicated, right: Deduplicated) -> Result<Vec<Pairing>, ReconError> {
    if left.arity() != right.arity() {
        return Err(ReconError::KeyArityMismatch {
            left: left.arity(),
            right: right.arity(),
        });
    }

    let mut right_entries: Vec<Option<KeyedRecord>> =
        right.into_entries().into_iter().map(Some).collect();
    let right_index: HashMap<Key, usize> = right_entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_ref().map(|e| (e.key.clone(), i)))
        .collect();

    let left_entries = left.into_entries();
    let mut pairings = Vec::with_capacity(left_entries.len() + right_entries.len());
    let mut matched = 0usize;

    for left_entry in left_entries {
        let right_entry = right_index
            .get(&left_entry.key)
            .and_then(|&i| right_entries[i].take());
        if right_entry.is_some() {
            matched += 1;
        }
        pairings.push(Pairing::new(Some(left_entry), right_entry));
    }

    let left_count = pairings.len();
    pairings.extend(
        right_entries
            .into_iter()
            .flatten()
            .map(|right_entry| Pairing::new(None, Some(right_entry))),
    );

    log::debug!(
        "paired {} key(s): {matched} on both sides, {} left only, {} right only",
        pairings.len(),
        left_count - matched,
        pairings.len() - left_count
    );

    Ok(pairings)
}
