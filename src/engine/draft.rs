//! Draft store
//!
//! Drafts are records awaiting a user decision (approve / edit / reject).
//! They are deliberately ephemeral: nothing here survives a restart, and a
//! draft must be dispositioned within the run that created it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::types::{Attributes, DraftId, UserId};

/// A proposed expense record awaiting disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub user_id: UserId,
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    /// Create a draft owned by `user`. The id binds the draft to this user
    /// for its entire lifetime.
    pub fn new(user_id: UserId, attributes: Attributes) -> Self {
        let created_at = Utc::now();
        Self {
            id: DraftId::mint(user_id, created_at),
            user_id,
            attributes,
            created_at,
        }
    }
}

/// In-memory store of pending drafts, keyed by draft id.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    drafts: Arc<RwLock<HashMap<DraftId, Draft>>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a draft, returning its id.
    pub async fn insert(&self, draft: Draft) -> DraftId {
        let id = draft.id.clone();
        tracing::debug!(user_id = %draft.user_id, draft_id = %id, "draft pending");
        self.drafts.write().await.insert(id.clone(), draft);
        id
    }

    /// Fetch a draft by id, but only if it belongs to `user`. A draft id is
    /// bound to one owner; a lookup under the wrong user behaves as absent.
    pub async fn get(&self, user: UserId, id: &DraftId) -> Option<Draft> {
        self.drafts
            .read()
            .await
            .get(id)
            .filter(|d| d.user_id == user)
            .cloned()
    }

    /// Remove a draft. Idempotent; returns the removed draft if present.
    pub async fn remove(&self, id: &DraftId) -> Option<Draft> {
        let removed = self.drafts.write().await.remove(id);
        if let Some(draft) = &removed {
            tracing::debug!(user_id = %draft.user_id, draft_id = %id, "draft removed");
        }
        removed
    }

    /// All pending drafts for one user, oldest first.
    pub async fn drafts_for(&self, user: UserId) -> Vec<Draft> {
        let mut drafts: Vec<Draft> = self
            .drafts
            .read()
            .await
            .values()
            .filter(|d| d.user_id == user)
            .cloned()
            .collect();
        drafts.sort_by_key(|d| d.created_at);
        drafts
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drafts.read().await.is_empty()
    }
}
