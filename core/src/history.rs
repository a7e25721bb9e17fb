//! Append-only orchestration history and the decision audit trail.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use attune_types::{DecisionRecord, OrchestrationResult, UserId};

/// Tail of `entries` holding at most `limit` items, oldest first.
fn tail<T: Clone>(entries: &[T], limit: usize) -> Vec<T> {
    let start = entries.len().saturating_sub(limit);
    entries[start..].to_vec()
}

pub trait OrchestrationLog: Send + Sync {
    fn append(&self, user: &UserId, result: OrchestrationResult);

    /// The most recent `limit` entries for `user`, oldest first.
    fn recent(&self, user: &UserId, limit: usize) -> Vec<OrchestrationResult>;
}

#[derive(Debug, Default)]
pub struct InMemoryOrchestrationLog {
    entries: Mutex<HashMap<UserId, Vec<OrchestrationResult>>>,
}

impl InMemoryOrchestrationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrchestrationLog for InMemoryOrchestrationLog {
    fn append(&self, user: &UserId, result: OrchestrationResult) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user.clone())
            .or_default()
            .push(result);
    }

    fn recent(&self, user: &UserId, limit: usize) -> Vec<OrchestrationResult> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .map(|entries| tail(entries, limit))
            .unwrap_or_default()
    }
}

/// One record per emitted decision, kept in memory for inspection.
#[derive(Debug, Default)]
pub struct DecisionAudit {
    records: Mutex<HashMap<UserId, Vec<DecisionRecord>>>,
}

impl DecisionAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: DecisionRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(record.user_id.clone())
            .or_default()
            .push(record);
    }

    #[must_use]
    pub fn recent(&self, user: &UserId, limit: usize) -> Vec<DecisionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .map(|records| tail(records, limit))
            .unwrap_or_default()
    }
}
