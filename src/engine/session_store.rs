//! Session store
//!
//! Holds every live [`EditSession`], indexed both by session id and by
//! owning user. Enforces at-most-one-session-per-user on `create` and a
//! lazy expiry policy on `get`: an expired session is destroyed the moment
//! it is observed, so no sweep is required for correctness. The periodic
//! sweep (driven by the engine) is hygiene only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::session::EditSession;
use super::types::{AttrValue, Attributes, DraftId, Field, SessionId, UserId};

/// Age-bucketed counts over the live sessions, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub sessions: usize,
    pub users: usize,
    pub under_5min: usize,
    pub under_30min: usize,
    pub over_30min: usize,
}

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<SessionId, EditSession>,
    by_user: HashMap<UserId, SessionId>,
}

impl Indexes {
    fn remove_by_id(&mut self, id: SessionId) -> Option<EditSession> {
        let session = self.by_id.remove(&id)?;
        // Only unlink the user index if it still points at this session;
        // a replacement may already have taken the slot.
        if self.by_user.get(&session.user_id) == Some(&id) {
            self.by_user.remove(&session.user_id);
        }
        Some(session)
    }
}

/// Store of live edit sessions with a per-store inactivity timeout.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Indexes>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Indexes::default())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open a session for `user` over `attributes`. Any existing session
    /// for that user is unrecoverably dropped first.
    pub async fn create(
        &self,
        user: UserId,
        draft_id: DraftId,
        attributes: Attributes,
    ) -> EditSession {
        let session = EditSession::new(user, draft_id, attributes);
        let mut inner = self.inner.write().await;

        if let Some(prior) = inner.by_user.get(&user).copied() {
            inner.remove_by_id(prior);
            tracing::info!(user_id = %user, session_id = %prior, "replaced prior edit session");
        }

        inner.by_user.insert(user, session.id);
        inner.by_id.insert(session.id, session.clone());
        tracing::info!(user_id = %user, session_id = %session.id, "edit session created");
        session
    }

    /// The user's live session, if any. An expired session is destroyed on
    /// observation and reported as absent.
    pub async fn get(&self, user: UserId) -> Option<EditSession> {
        {
            let inner = self.inner.read().await;
            let id = inner.by_user.get(&user)?;
            let session = inner.by_id.get(id)?;
            if !session.is_expired(self.timeout) {
                return Some(session.clone());
            }
        }
        // Expired: evict under the write lock, re-checking in case a
        // concurrent mutation refreshed or replaced it.
        self.evict_if_expired(user).await;
        None
    }

    /// Destroy the user's session if it has expired. Returns the evicted
    /// session id, if any.
    pub async fn evict_if_expired(&self, user: UserId) -> Option<SessionId> {
        let mut inner = self.inner.write().await;
        let id = inner.by_user.get(&user).copied()?;
        let expired = inner
            .by_id
            .get(&id)
            .map(|s| s.is_expired(self.timeout))
            .unwrap_or(false);
        if !expired {
            return None;
        }
        inner.remove_by_id(id);
        tracing::info!(user_id = %user, session_id = %id, "edit session expired");
        Some(id)
    }

    /// Overwrite `field` in the session's working copy and append a change
    /// record. No value validation; that is the calling flow's job.
    /// Returns `None` if the session no longer exists.
    pub async fn update_field(
        &self,
        id: SessionId,
        field: Field,
        value: AttrValue,
        reason: impl Into<String>,
    ) -> Option<()> {
        let mut inner = self.inner.write().await;
        let session = inner.by_id.get_mut(&id)?;
        session.update_field(field, value, reason);
        Some(())
    }

    /// Remove a session from both indices. Idempotent.
    pub async fn destroy(&self, id: SessionId) -> Option<EditSession> {
        let mut inner = self.inner.write().await;
        let removed = inner.remove_by_id(id);
        if let Some(session) = &removed {
            tracing::info!(user_id = %session.user_id, session_id = %id, "edit session destroyed");
        }
        removed
    }

    /// Users whose session has outlived the timeout. The engine sweeps
    /// these one at a time under each user's mutual-exclusion region.
    pub async fn expired_users(&self) -> Vec<UserId> {
        let inner = self.inner.read().await;
        inner
            .by_id
            .values()
            .filter(|s| s.is_expired(self.timeout))
            .map(|s| s.user_id)
            .collect()
    }

    /// Remove every expired session. Returns the count removed.
    ///
    /// This is the raw hygiene pass; callers that also own registry state
    /// should prefer the engine's sweep, which clears both sides under the
    /// per-user region.
    pub async fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        for user in self.expired_users().await {
            if self.evict_if_expired(user).await.is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(count = removed, "swept expired edit sessions");
        }
        removed
    }

    /// Age-bucketed stats over the live sessions.
    pub async fn stats(&self) -> SessionStats {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut stats = SessionStats {
            sessions: inner.by_id.len(),
            users: inner.by_user.len(),
            ..Default::default()
        };
        for session in inner.by_id.values() {
            let age = now - session.created_at;
            if age < Duration::minutes(5) {
                stats.under_5min += 1;
            } else if age < Duration::minutes(30) {
                stats.under_30min += 1;
            } else {
                stats.over_30min += 1;
            }
        }
        stats
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Attributes {
        Attributes::new().with(Field::Amount, AttrValue::Number("10".parse().unwrap()))
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::minutes(30))
    }

    #[tokio::test]
    async fn test_create_replaces_prior_session() {
        let store = store();
        let first = store.create(UserId(1), DraftId::from("exp-1-1"), attrs()).await;
        let second = store.create(UserId(1), DraftId::from("exp-1-2"), attrs()).await;

        assert_ne!(first.id, second.id);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(UserId(1)).await.unwrap().id, second.id);
        assert!(store.destroy(first.id).await.is_none());
    }

    #[tokio::test]
    async fn test_get_evicts_expired() {
        let store = SessionStore::new(Duration::zero());
        let session = store.create(UserId(1), DraftId::from("exp-1-1"), attrs()).await;

        // Zero timeout: anything already created counts as expired.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.get(UserId(1)).await.is_none());
        assert!(store.is_empty().await);
        assert!(store.destroy(session.id).await.is_none());

        // A fresh create afterwards succeeds cleanly.
        let fresh = store.create(UserId(1), DraftId::from("exp-1-2"), attrs()).await;
        assert_eq!(fresh.user_id, UserId(1));
    }

    #[tokio::test]
    async fn test_update_field_routes_to_session() {
        let store = store();
        let session = store.create(UserId(1), DraftId::from("exp-1-1"), attrs()).await;

        store
            .update_field(
                session.id,
                Field::Merchant,
                AttrValue::text("cafe"),
                "user edit",
            )
            .await
            .unwrap();

        let current = store.get(UserId(1)).await.unwrap();
        assert_eq!(current.working.merchant(), Some("cafe"));
        assert_eq!(current.changes.len(), 1);

        // Unknown session: total no-op.
        assert!(store
            .update_field(SessionId::new(), Field::Notes, AttrValue::text("x"), "r")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let store = store();
        let session = store.create(UserId(1), DraftId::from("exp-1-1"), attrs()).await;

        assert!(store.destroy(session.id).await.is_some());
        assert!(store.destroy(session.id).await.is_none());
        assert!(store.get(UserId(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_counts_only_expired() {
        let store = SessionStore::new(Duration::zero());
        store.create(UserId(1), DraftId::from("exp-1-1"), attrs()).await;
        store.create(UserId(2), DraftId::from("exp-2-1"), attrs()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(store.sweep_expired().await, 2);
        assert_eq!(store.sweep_expired().await, 0);
    }

    #[tokio::test]
    async fn test_stats_buckets() {
        let store = store();
        store.create(UserId(1), DraftId::from("exp-1-1"), attrs()).await;
        store.create(UserId(2), DraftId::from("exp-2-1"), attrs()).await;

        let stats = store.stats().await;
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.users, 2);
        assert_eq!(stats.under_5min, 2);
        assert_eq!(stats.over_30min, 0);
    }
}
