//! The case collection implied by a sequence of change events.

use std::collections::{BTreeMap, HashMap};

use corruption_watch_case_models::CaseRecord;
use corruption_watch_store::{ChangeEvent, ChangeKind};

/// Case records keyed by id, iterated in first-insertion order.
///
/// Insert and update both upsert: an existing record keeps its position,
/// a new one is appended. Delete removes the record, so a later insert of
/// the same id is appended again. Records without an id are ignored.
#[derive(Debug, Clone, Default)]
pub struct CaseSet {
    records: BTreeMap<u64, CaseRecord>,
    positions: HashMap<String, u64>,
    next: u64,
}

impl CaseSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, replacing the record with the same id in place.
    /// Returns `false` if the record has no id.
    pub fn upsert(&mut self, record: CaseRecord) -> bool {
        if !record.has_identity() {
            return false;
        }
        if let Some(&position) = self.positions.get(&record.id) {
            self.records.insert(position, record);
        } else {
            let position = self.next;
            self.next += 1;
            self.positions.insert(record.id.clone(), position);
            self.records.insert(position, record);
        }
        true
    }

    /// Removes and returns the record with `id`.
    pub fn remove(&mut self, id: &str) -> Option<CaseRecord> {
        let position = self.positions.remove(id)?;
        self.records.remove(&position)
    }

    /// Applies one change event. Returns `false` if it left the set as it
    /// was (no id, or a delete of an unknown id).
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => self.upsert(event.record.clone()),
            ChangeKind::Delete => self.remove(&event.record.id).is_some(),
        }
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CaseRecord> {
        self.positions
            .get(id)
            .and_then(|position| self.records.get(position))
    }

    /// Iterates the records in order.
    pub fn iter(&self) -> impl Iterator<Item = &CaseRecord> {
        self.records.values()
    }

    /// Copies the records out in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<CaseRecord> {
        self.records.values().cloned().collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<CaseRecord> for CaseSet {
    fn from_iter<I: IntoIterator<Item = CaseRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.upsert(record);
        }
        set
    }
}

/// Replays `events` in order onto an empty set and returns the result.
pub fn materialize<'a>(events: impl IntoIterator<Item = &'a ChangeEvent>) -> Vec<CaseRecord> {
    let mut set = CaseSet::new();
    for event in events {
        set.apply(event);
    }
    set.to_vec()
}
