//! Conversation state registry
//!
//! Per-user single-slot storage for the active flow descriptor. Exactly one
//! entry may exist per user; entering a new flow overwrites the old entry
//! unconditionally. Destroying any edit session the replaced flow depended
//! on is the engine's job (reconciliation), not the registry's.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::{ConversationState, FlowState, UserId};
use crate::error::{FlowError, FlowResult};

/// Registry of active conversation states, one slot per user.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    entries: Arc<RwLock<HashMap<UserId, ConversationState>>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a flow for `user`, overwriting any existing entry. Returns the
    /// replaced state so the caller can reconcile orphaned sessions.
    pub async fn enter(&self, user: UserId, flow: FlowState) -> Option<ConversationState> {
        let state = ConversationState::new(user, flow);
        let replaced = self.entries.write().await.insert(user, state);
        if let Some(prior) = &replaced {
            tracing::debug!(user_id = %user, prior = ?prior.flow.kind(), "flow replaced");
        }
        replaced
    }

    /// Mutate the user's flow state in place. Fails with [`FlowError::NoActiveFlow`]
    /// when the user has no entry; callers treat that as "the flow already
    /// ended" and re-prompt rather than crash.
    pub async fn advance<F>(&self, user: UserId, f: F) -> FlowResult<()>
    where
        F: FnOnce(&mut FlowState),
    {
        let mut entries = self.entries.write().await;
        let state = entries.get_mut(&user).ok_or(FlowError::NoActiveFlow)?;
        f(&mut state.flow);
        Ok(())
    }

    /// Remove the user's entry. Idempotent; returns the removed state.
    pub async fn clear(&self, user: UserId) -> Option<ConversationState> {
        self.entries.write().await.remove(&user)
    }

    /// The user's current flow state, if any.
    pub async fn peek(&self, user: UserId) -> Option<ConversationState> {
        self.entries.read().await.get(&user).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{DraftId, EditStep, SessionId, WizardStep};

    fn edit_flow() -> FlowState {
        FlowState::Edit {
            session_id: SessionId::new(),
            draft_id: DraftId::from("exp-1-1"),
            step: EditStep::CollectingAmount,
        }
    }

    #[tokio::test]
    async fn test_enter_overwrites_and_returns_prior() {
        let registry = FlowRegistry::new();
        assert!(registry.enter(UserId(1), edit_flow()).await.is_none());

        let replaced = registry
            .enter(
                UserId(1),
                FlowState::Wizard {
                    step: WizardStep::CollectingName,
                },
            )
            .await
            .unwrap();
        assert!(matches!(replaced.flow, FlowState::Edit { .. }));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_advance_requires_entry() {
        let registry = FlowRegistry::new();
        let err = registry
            .advance(UserId(1), |_| unreachable!("no entry to advance"))
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::NoActiveFlow);

        registry.enter(UserId(1), edit_flow()).await;
        registry
            .advance(UserId(1), |flow| {
                if let FlowState::Edit { step, .. } = flow {
                    *step = EditStep::CollectingCategory;
                }
            })
            .await
            .unwrap();

        let state = registry.peek(UserId(1)).await.unwrap();
        assert!(matches!(
            state.flow,
            FlowState::Edit {
                step: EditStep::CollectingCategory,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let registry = FlowRegistry::new();
        registry.enter(UserId(1), edit_flow()).await;

        assert!(registry.clear(UserId(1)).await.is_some());
        assert!(registry.clear(UserId(1)).await.is_none());
        assert!(registry.peek(UserId(1)).await.is_none());
        assert!(registry.is_empty().await);
    }
}
