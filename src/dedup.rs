//! Merging scraped records into the store and picking the ones to announce.

use std::collections::HashSet;

use crate::formats::Record;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// `existing` followed by `added`.
    pub updated: Vec<Record>,
    pub added: Vec<Record>,
}

/// Appends the candidates whose identity key is not yet known.
///
/// Duplicates within `candidates` collapse to their first occurrence.
pub fn merge_new(existing: Vec<Record>, candidates: Vec<Record>) -> MergeOutcome {
    let mut seen = existing
        .iter()
        .map(Record::identity_key)
        .collect::<HashSet<_>>();

    let mut added = Vec::new();
    for candidate in candidates {
        if seen.insert(candidate.identity_key()) {
            added.push(candidate);
        }
    }

    let mut updated = existing;
    updated.extend(added.iter().cloned());
    MergeOutcome { updated, added }
}

/// Records of `current` that were not part of the last notification, in
/// `current` order.
pub fn diff_for_notification(current: &[Record], last_notified: &[Record]) -> Vec<Record> {
    let notified = last_notified
        .iter()
        .map(Record::identity_key)
        .collect::<HashSet<_>>();

    current
        .iter()
        .filter(|record| !notified.contains(&record.identity_key()))
        .cloned()
        .collect()
}
