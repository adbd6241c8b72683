// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of whole-document snapshots.
//!
//! Every mutating edit pushes a snapshot of the document as it was *before*
//! the edit. Undo swaps the current document for the newest snapshot and
//! keeps the current one on the redo stack.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 50;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Unique operation ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(u64);

impl OperationId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Serialized document state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized state
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            data,
            timestamp: now_secs(),
            size,
        }
    }

    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let data = bincode::serialize(value)?;
        Ok(Self::new(data))
    }

    /// Deserialize to value
    pub fn to_value<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// One undoable step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Operation ID
    pub id: OperationId,
    /// Human-readable description
    pub description: String,
    /// Document state to restore
    pub snapshot: StateSnapshot,
}

impl HistoryEntry {
    /// Get memory size of this entry
    pub fn memory_size(&self) -> usize {
        self.snapshot.size
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Entries in the undo stack
    pub undo_count: usize,
    /// Entries in the redo stack
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    /// Undo stack, oldest first
    undo_stack: VecDeque<HistoryEntry>,
    /// Redo stack, oldest first
    redo_stack: VecDeque<HistoryEntry>,
    /// Next operation ID
    next_id: u64,
    /// Maximum history depth
    max_depth: usize,
    /// Total memory used
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth: max_depth.max(1),
            memory_used: 0,
        }
    }

    fn next_operation_id(&mut self) -> OperationId {
        let id = OperationId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Record the pre-mutation state of an edit.
    ///
    /// Clears the redo stack and evicts the oldest entries past `max_depth`.
    pub fn push<T: Serialize>(&mut self, description: &str, state: &T) -> Result<OperationId> {
        let snapshot = StateSnapshot::from_value(state)?;
        let id = self.next_operation_id();

        for entry in self.redo_stack.drain(..) {
            self.memory_used = self.memory_used.saturating_sub(entry.memory_size());
        }

        let entry = HistoryEntry {
            id,
            description: description.to_string(),
            snapshot,
        };
        self.memory_used += entry.memory_size();
        self.undo_stack.push_back(entry);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.memory_size());
                tracing::debug!("Evicted oldest history entry: {}", old.description);
            }
        }

        Ok(id)
    }

    /// Undo: returns the state to restore. `current` moves onto the redo stack.
    pub fn undo<T: Serialize + DeserializeOwned>(&mut self, current: &T) -> Result<T> {
        let entry = self.undo_stack.back().ok_or(HistoryError::NothingToUndo)?;
        let restored = entry.snapshot.to_value()?;
        let redo_snapshot = StateSnapshot::from_value(current)?;

        let Some(entry) = self.undo_stack.pop_back() else {
            return Err(HistoryError::NothingToUndo);
        };
        self.memory_used = self.memory_used.saturating_sub(entry.memory_size());

        let redo_entry = HistoryEntry {
            id: entry.id,
            description: entry.description,
            snapshot: redo_snapshot,
        };
        self.memory_used += redo_entry.memory_size();
        self.redo_stack.push_back(redo_entry);

        Ok(restored)
    }

    /// Redo: returns the state to restore. `current` moves onto the undo stack.
    pub fn redo<T: Serialize + DeserializeOwned>(&mut self, current: &T) -> Result<T> {
        let entry = self.redo_stack.back().ok_or(HistoryError::NothingToRedo)?;
        let restored = entry.snapshot.to_value()?;
        let undo_snapshot = StateSnapshot::from_value(current)?;

        let Some(entry) = self.redo_stack.pop_back() else {
            return Err(HistoryError::NothingToRedo);
        };
        self.memory_used = self.memory_used.saturating_sub(entry.memory_size());

        let undo_entry = HistoryEntry {
            id: entry.id,
            description: entry.description,
            snapshot: undo_snapshot,
        };
        self.memory_used += undo_entry.memory_size();
        self.undo_stack.push_back(undo_entry);

        Ok(restored)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum history depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::new();
        let mut value = 1_u32;

        history.push("set 2", &value).unwrap();
        value = 2;
        history.push("set 3", &value).unwrap();
        value = 3;

        assert_eq!(history.undo_description(), Some("set 3"));
        value = history.undo(&value).unwrap();
        assert_eq!(value, 2);
        value = history.undo(&value).unwrap();
        assert_eq!(value, 1);
        assert!(matches!(history.undo(&value), Err(HistoryError::NothingToUndo)));

        assert_eq!(history.redo_description(), Some("set 2"));
        value = history.redo(&value).unwrap();
        assert_eq!(value, 2);
        value = history.redo(&value).unwrap();
        assert_eq!(value, 3);
        assert!(matches!(history.redo(&value), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_push_truncates_redo() {
        let mut history = History::new();
        history.push("a", &1_u32).unwrap();
        let _ = history.undo(&2_u32).unwrap();
        assert!(history.can_redo());

        history.push("b", &1_u32).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new();
        for i in 0..51_u32 {
            history.push(&format!("op {i}"), &i).unwrap();
        }
        assert_eq!(history.undo_depth(), MAX_HISTORY);

        let mut value = 51_u32;
        let mut steps = 0;
        while history.can_undo() {
            value = history.undo(&value).unwrap();
            steps += 1;
        }
        assert_eq!(steps, 50);
        // Snapshot of op 0 was evicted
        assert_eq!(value, 1);
    }

    #[test]
    fn test_memory_accounting() {
        let mut history = History::with_max_depth(2);
        history.push("a", &vec![0_u8; 64]).unwrap();
        let stats = history.stats();
        assert_eq!(stats.undo_count, 1);
        assert!(stats.memory_used >= 64);

        history.clear();
        assert_eq!(history.stats(), HistoryStats { max_depth: 2, ..Default::default() });
    }
}
