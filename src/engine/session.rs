//! Edit session model
//!
//! An [`EditSession`] wraps a mutable working copy of one draft's attributes
//! together with an immutable snapshot taken at session start and an ordered
//! change log. The change log is authoritative for *how* the working copy
//! diverged: replaying it over the snapshot reconstructs the working copy
//! exactly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::{AttrValue, Attributes, DraftId, Field, SessionId, UserId};

/// One accepted field mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: Field,
    pub old: Option<AttrValue>,
    pub new: AttrValue,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// A timed, mutable working copy of a draft plus its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub draft_id: DraftId,

    /// The copy being edited. Never shares storage with the draft.
    pub working: Attributes,

    /// Attributes exactly as they were when the session opened.
    pub snapshot: Attributes,

    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,

    /// Ordered log of accepted mutations.
    pub changes: Vec<FieldChange>,
}

impl EditSession {
    /// Open a session over a draft's attributes. Both the working copy and
    /// the snapshot are owned copies of `attributes`.
    pub fn new(user_id: UserId, draft_id: DraftId, attributes: Attributes) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id,
            draft_id,
            working: attributes.clone(),
            snapshot: attributes,
            created_at: now,
            last_activity: now,
            changes: Vec::new(),
        }
    }

    /// Overwrite `field` in the working copy, refresh activity, and append
    /// exactly one change record. No value validation happens here; the
    /// flow validates before calling.
    pub fn update_field(&mut self, field: Field, new: AttrValue, reason: impl Into<String>) {
        let old = self.working.set(field, new.clone());
        self.last_activity = Utc::now();
        self.changes.push(FieldChange {
            field,
            old,
            new,
            at: self.last_activity,
            reason: reason.into(),
        });
    }

    /// Whether the session has sat inactive longer than `timeout`.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        Utc::now() - self.last_activity > timeout
    }

    /// The most recent `n` change records, oldest of those first.
    pub fn change_summary(&self, n: usize) -> &[FieldChange] {
        let start = self.changes.len().saturating_sub(n);
        &self.changes[start..]
    }

    /// Rebuild the working copy by replaying the change log over the
    /// snapshot. Used by audit checks; equality with `working` is an
    /// invariant.
    pub fn replay(&self) -> Attributes {
        let mut attrs = self.snapshot.clone();
        for change in &self.changes {
            attrs.set(change.field, change.new.clone());
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn session() -> EditSession {
        let attrs = Attributes::new()
            .with(Field::Amount, AttrValue::Number(dec("350.50")))
            .with(Field::Category, AttrValue::text("food"));
        EditSession::new(UserId(1), DraftId::from("exp-1-1"), attrs)
    }

    #[test]
    fn test_working_copy_is_independent_of_snapshot() {
        let mut s = session();
        s.update_field(Field::Amount, AttrValue::Number(dec("99")), "user edit");

        assert_eq!(s.working.amount(), Some(dec("99")));
        assert_eq!(s.snapshot.amount(), Some(dec("350.50")));
    }

    #[test]
    fn test_every_update_appends_exactly_one_change() {
        let mut s = session();
        s.update_field(Field::Amount, AttrValue::Number(dec("1")), "a");
        s.update_field(Field::Amount, AttrValue::Number(dec("2")), "b");
        s.update_field(Field::Merchant, AttrValue::text("cafe"), "c");

        assert_eq!(s.changes.len(), 3);
        assert_eq!(s.changes[0].old, Some(AttrValue::Number(dec("350.50"))));
        assert_eq!(s.changes[1].old, Some(AttrValue::Number(dec("1"))));
        assert_eq!(s.changes[2].old, None);
    }

    #[test]
    fn test_replay_reconstructs_working_copy() {
        let mut s = session();
        s.update_field(Field::Amount, AttrValue::Number(dec("42")), "a");
        s.update_field(Field::Category, AttrValue::text("groceries"), "b");
        s.update_field(Field::Amount, AttrValue::Number(dec("43.10")), "c");

        assert_eq!(s.replay(), s.working);
    }

    #[test]
    fn test_change_summary_returns_tail() {
        let mut s = session();
        for i in 0..8 {
            s.update_field(Field::Notes, AttrValue::text(format!("note {i}")), "edit");
        }
        let tail = s.change_summary(5);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[4].new, AttrValue::text("note 7"));

        assert_eq!(s.change_summary(100).len(), 8);
    }

    #[test]
    fn test_expiry_against_timeout() {
        let mut s = session();
        assert!(!s.is_expired(Duration::minutes(30)));

        s.last_activity = Utc::now() - Duration::minutes(31);
        assert!(s.is_expired(Duration::minutes(30)));
        assert!(!s.is_expired(Duration::hours(1)));
    }
}
