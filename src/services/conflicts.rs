//! Uniqueness conflict detection for bulk batches.
//!
//! A batch is classified against two sources of conflict: keys repeated
//! inside the batch itself, and keys already owned by persisted records.
//! Intra-batch duplicates win when an item collides with both.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use crate::models::bulk::RejectReason;

/// Items carrying one or more uniqueness keys (name, code, serial number)
pub trait UniqueKeys {
    fn unique_keys(&self) -> Vec<&str>;
}

impl<T: UniqueKeys + ?Sized> UniqueKeys for &T {
    fn unique_keys(&self) -> Vec<&str> {
        (**self).unique_keys()
    }
}

/// How two uniqueness keys are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatching {
    /// Byte-for-byte comparison
    Exact,
    /// Trimmed, NFKC-normalized, lowercased comparison
    #[default]
    CaseInsensitive,
}

impl KeyMatching {
    pub fn normalize(&self, key: &str) -> String {
        match self {
            KeyMatching::Exact => key.to_string(),
            KeyMatching::CaseInsensitive => key.trim().nfkc().collect::<String>().to_lowercase(),
        }
    }
}

/// Result of classifying a batch; both lists keep the input order
#[derive(Debug)]
pub struct Classification<T> {
    pub admitted: Vec<T>,
    pub rejected: Vec<(T, RejectReason)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {
    matching: KeyMatching,
}

impl ConflictDetector {
    pub fn new(matching: KeyMatching) -> Self {
        Self { matching }
    }

    pub fn matching(&self) -> KeyMatching {
        self.matching
    }

    /// Split `batch` into admitted and rejected items.
    ///
    /// An item is rejected with `DuplicateInBatch` when any of its keys occurs
    /// more than once across the batch, otherwise with `AlreadyExists` when
    /// any of its keys is in `persisted`.
    pub fn classify<T, K>(&self, batch: Vec<T>, persisted: impl IntoIterator<Item = K>) -> Classification<T>
    where
        T: UniqueKeys,
        K: AsRef<str>,
    {
        let persisted: HashSet<String> = persisted
            .into_iter()
            .map(|key| self.matching.normalize(key.as_ref()))
            .collect();

        let mut seen = HashSet::new();
        let mut duplicates = HashSet::new();
        for item in &batch {
            for key in item.unique_keys() {
                let key = self.matching.normalize(key);
                if !seen.insert(key.clone()) {
                    duplicates.insert(key);
                }
            }
        }

        let mut classification = Classification {
            admitted: Vec::with_capacity(batch.len()),
            rejected: Vec::new(),
        };

        for item in batch {
            let keys: Vec<String> = item
                .unique_keys()
                .into_iter()
                .map(|key| self.matching.normalize(key))
                .collect();

            if keys.iter().any(|key| duplicates.contains(key)) {
                classification.rejected.push((item, RejectReason::DuplicateInBatch));
            } else if keys.iter().any(|key| persisted.contains(key)) {
                classification.rejected.push((item, RejectReason::AlreadyExists));
            } else {
                classification.admitted.push(item);
            }
        }

        classification
    }

    /// First key of `keys` that repeats, in input order
    pub fn first_duplicate<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
        let mut seen = HashSet::new();
        keys.into_iter()
            .find(|key| !seen.insert(self.matching.normalize(key)))
    }

    pub fn index<Id: Eq + Hash>(&self) -> KeyIndex<Id> {
        KeyIndex {
            matching: self.matching,
            keys: HashMap::new(),
        }
    }
}

/// Working copy of the persisted uniqueness keys, kept current while a batch
/// of updates is applied so later items see the keys earlier items claimed.
#[derive(Debug)]
pub struct KeyIndex<Id> {
    matching: KeyMatching,
    keys: HashMap<Id, String>,
}

impl<Id: Eq + Hash> KeyIndex<Id> {
    /// Record (or replace) the key owned by `id`
    pub fn set(&mut self, id: Id, key: &str) {
        self.keys.insert(id, self.matching.normalize(key));
    }

    pub fn remove(&mut self, id: &Id) {
        self.keys.remove(id);
    }

    /// Whether `key` is owned by any record other than `owner`
    pub fn is_taken(&self, key: &str, owner: &Id) -> bool {
        let key = self.matching.normalize(key);
        self.keys
            .iter()
            .any(|(id, existing)| id != owner && *existing == key)
    }

    /// Whether `key` differs from the one currently recorded for `owner`
    pub fn changes(&self, key: &str, owner: &Id) -> bool {
        self.keys.get(owner) != Some(&self.matching.normalize(key))
    }
}
