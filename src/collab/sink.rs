//! Record sinks
//!
//! Two [`RecordSink`] implementations ship with the crate: an in-memory sink
//! with failure injection (tests, demos) and an append-only JSONL file sink
//! for the interactive driver. Spreadsheet-style integrations live in the
//! surrounding application, not here.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::RecordSink;
use crate::engine::types::{Attributes, RecordStatus, UserId};
use crate::error::PersistenceError;

/// One persisted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    pub user_id: UserId,
    pub attributes: Attributes,
    pub status: RecordStatus,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    records: Vec<SavedRecord>,
    /// Saves left to reject before accepting again.
    failures_remaining: usize,
}

/// In-memory sink with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<RwLock<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` saves with a retryable error.
    pub async fn fail_next(&self, n: usize) {
        self.state.write().await.failures_remaining = n;
    }

    pub async fn records(&self) -> Vec<SavedRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn save(
        &self,
        user: UserId,
        record: &Attributes,
        status: RecordStatus,
    ) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(PersistenceError::retryable("injected failure"));
        }
        state.records.push(SavedRecord {
            user_id: user,
            attributes: record.clone(),
            status,
            saved_at: Utc::now(),
        });
        Ok(())
    }
}

/// Appends each saved record as one JSON line.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn save(
        &self,
        user: UserId,
        record: &Attributes,
        status: RecordStatus,
    ) -> Result<(), PersistenceError> {
        let row = SavedRecord {
            user_id: user,
            attributes: record.clone(),
            status,
            saved_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&row)
            .map_err(|e| PersistenceError::permanent(format!("encoding record: {e}")))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PersistenceError::retryable(format!("opening {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PersistenceError::retryable(format!("appending record: {e}")))?;
        Ok(())
    }
}
