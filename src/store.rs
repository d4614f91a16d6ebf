//! In-memory persistence collaborator for progress records.
//!
//! This module owns:
//!   - the per-user record map (user id -> versioned progress)
//!   - optimistic concurrency for the read-modify-write cycle
//!
//! Every record carries a write version. `write` only applies when the
//! caller's `expected_version` still matches the stored one; otherwise the
//! caller re-reads and retries. Two concurrent events for the same user can
//! therefore never both commit against the same stale snapshot (lost update).
//! State is partitioned per user id; no cross-user coordination exists.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::UserProgress;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("version conflict for user {user_id}: expected {expected}, found {found}")]
    VersionConflict {
        user_id: String,
        expected: u64,
        found: u64,
    },
}

/// A progress record plus its write version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedProgress {
    pub progress: UserProgress,
    pub version: u64,
}

impl VersionedProgress {
    pub fn initial(progress: UserProgress) -> Self {
        Self { progress, version: 0 }
    }
}

#[derive(Clone, Default)]
pub struct ProgressStore {
    records: Arc<RwLock<HashMap<String, VersionedProgress>>>,
}

impl ProgressStore {
    /// Wrap a pre-built record map (config bank + seeds) into a live store.
    pub fn with_records(records: HashMap<String, VersionedProgress>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Create the default record for a user if absent (idempotent). Returns
    /// whether a new record was created. This stands in for the external
    /// user-management subsystem that owns the user lifecycle.
    #[instrument(level = "debug", skip(self), fields(%user_id))]
    pub async fn register(&self, user_id: &str) -> bool {
        let mut records = self.records.write().await;
        if records.contains_key(user_id) {
            return false;
        }
        records.insert(
            user_id.to_string(),
            VersionedProgress::initial(UserProgress::default()),
        );
        debug!(target: "progress", %user_id, "registered fresh progress record");
        true
    }

    /// Read the current record. The store never fabricates state for an
    /// unknown user; resolving the user comes first.
    #[instrument(level = "debug", skip(self), fields(%user_id))]
    pub async fn read(&self, user_id: &str) -> Result<VersionedProgress, StoreError> {
        self.records
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))
    }

    /// Conditional write: applies only while the stored version still equals
    /// `expected_version`. Returns the new version on success.
    #[instrument(level = "debug", skip(self, progress), fields(%user_id, expected_version))]
    pub async fn write(
        &self,
        user_id: &str,
        progress: UserProgress,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        if slot.version != expected_version {
            return Err(StoreError::VersionConflict {
                user_id: user_id.to_string(),
                expected: expected_version,
                found: slot.version,
            });
        }
        slot.version += 1;
        slot.progress = progress;
        debug!(target: "progress", %user_id, version = slot.version, "progress record written");
        Ok(slot.version)
    }

    #[allow(dead_code)]
    pub async fn user_count(&self) -> usize {
        self.records.read().await.len()
    }
}
