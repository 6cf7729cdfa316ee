//! Partial-success report shared by every bulk operation

use std::fmt;

use serde::Serialize;

/// Why a single batch item was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Another item of the same batch carries the same uniqueness key
    DuplicateInBatch,
    /// A persisted record already owns the uniqueness key
    AlreadyExists,
    /// The targeted record does not exist
    NotFound,
    /// A foreign reference (security level, executor, ...) does not resolve
    InvalidReference(String),
    /// The store refused the write
    Store(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::DuplicateInBatch => write!(f, "duplicate in the batch"),
            RejectReason::AlreadyExists => write!(f, "already exists"),
            RejectReason::NotFound => write!(f, "not found"),
            RejectReason::InvalidReference(what) => write!(f, "invalid reference: {}", what),
            RejectReason::Store(message) => write!(f, "{}", message),
        }
    }
}

/// Outcome of a bulk create, update or delete.
///
/// Every input item lands in exactly one of `succeeded` (as the mutated
/// entity) or `failed` (as the original input). `reasons[i]` explains
/// `failed[i]`; the two vectors only grow together.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResult<S, I> {
    succeeded: Vec<S>,
    failed: Vec<I>,
    reasons: Vec<String>,
}

impl<S, I> BulkResult<S, I> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            reasons: Vec::new(),
        }
    }

    pub fn push_success(&mut self, entity: S) {
        self.succeeded.push(entity);
    }

    pub fn push_failure(&mut self, item: I, reason: impl fmt::Display) {
        self.failed.push(item);
        self.reasons.push(reason.to_string());
    }

    pub fn succeeded(&self) -> &[S] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[I] {
        &self.failed
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Number of input items accounted for
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl<S, I> Default for BulkResult<S, I> {
    fn default() -> Self {
        Self::new()
    }
}
