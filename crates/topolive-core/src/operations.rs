use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::CorrelationId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Completed,
}

/// Lookup result of [`OperationTracker::status_of`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Completed,
    Unknown,
}

/// Status of correlation-identified async operations (highlight requests).
///
/// The requester owns each record: it calls `begin`, someone calls
/// `complete`, and the requester calls `discard` when done. Misuse is logged
/// but never rejected.
#[derive(Debug, Default)]
pub struct OperationTracker {
    records: HashMap<CorrelationId, OperationStatus>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: CorrelationId) {
        if let Some(prev) = self.records.insert(id.clone(), OperationStatus::Pending) {
            tracing::debug!(correlation_id = %id, previous = ?prev, "operation restarted");
        }
    }

    pub fn complete(&mut self, id: CorrelationId) {
        if !self.records.contains_key(&id) {
            tracing::warn!(correlation_id = %id, "completing an operation that was never started");
        }
        self.records.insert(id, OperationStatus::Completed);
    }

    pub fn discard(&mut self, id: &CorrelationId) {
        if self.records.remove(id).is_none() {
            tracing::debug!(correlation_id = %id, "discard of unknown operation");
        }
    }

    pub fn status_of(&self, id: &CorrelationId) -> OperationState {
        match self.records.get(id) {
            Some(OperationStatus::Pending) => OperationState::Pending,
            Some(OperationStatus::Completed) => OperationState::Completed,
            None => OperationState::Unknown,
        }
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.status_of(id) == OperationState::Pending
    }

    pub fn pending_ids(&self) -> Vec<CorrelationId> {
        self.records
            .iter()
            .filter(|(_, status)| **status == OperationStatus::Pending)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
