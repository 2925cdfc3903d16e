//! Flow engine: dispatch and reconciliation
//!
//! The [`FlowEngine`] owns the draft store, session store, flow registry,
//! and classification catalog, and routes every inbound [`UserInput`]
//! through the active flow for that user.
//!
//! # Dispatch
//!
//! | Active flow | Input          | Handler                     |
//! |-------------|----------------|-----------------------------|
//! | any / none  | Approve/Reject | draft disposition           |
//! | any / none  | StartEdit      | open session, enter Edit    |
//! | any / none  | StartWizard    | enter Wizard                |
//! | Edit        | Message        | `handle_edit_message`       |
//! | Edit        | Save           | persist + tear down         |
//! | Wizard      | Message        | `handle_wizard_message`     |
//! | any         | CancelFlow     | tear down, nothing persists |
//! | none        | Message        | `Idle` (glue handles it)    |
//!
//! # Locking
//!
//! All mutations for one user happen inside that user's mutual-exclusion
//! region. Collaborator calls (category resolution, persistence) run with
//! the region released; the mutation recording their result re-acquires it
//! and re-validates that the flow is still the one it left. Expiry sweeps
//! take the same region, so a successful save always happens-before any
//! expiry-triggered destroy of the same session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::draft::{Draft, DraftStore};
use super::registry::FlowRegistry;
use super::response::EngineResponse;
use super::session::EditSession;
use super::session_store::{SessionStats, SessionStore};
use super::types::{
    AttrValue, Attributes, DraftId, EditStep, Field, FlowState, RecordStatus, UserId, UserInput,
    WizardStep,
};
use crate::classify::ClassificationCatalog;
use crate::collab::{CategoryResolver, RecordSink};
use crate::config::EngineConfig;
use crate::error::ValidationError;

/// The conversation & edit-session engine.
#[derive(Clone)]
pub struct FlowEngine {
    pub(super) config: EngineConfig,
    pub(super) drafts: DraftStore,
    pub(super) sessions: SessionStore,
    pub(super) registry: FlowRegistry,
    pub(super) catalog: ClassificationCatalog,
    pub(super) resolver: Arc<dyn CategoryResolver>,
    pub(super) sink: Arc<dyn RecordSink>,
    user_locks: Arc<RwLock<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl FlowEngine {
    pub fn new(
        config: EngineConfig,
        catalog: ClassificationCatalog,
        resolver: Arc<dyn CategoryResolver>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let sessions = SessionStore::new(config.session_timeout);
        Self {
            config,
            drafts: DraftStore::new(),
            sessions,
            registry: FlowRegistry::new(),
            catalog,
            resolver,
            sink,
            user_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &ClassificationCatalog {
        &self.catalog
    }

    pub async fn session_stats(&self) -> SessionStats {
        self.sessions.stats().await
    }

    /// The user's mutual-exclusion region. Every mutation of that user's
    /// session or registry entry runs inside it.
    pub(super) async fn lock_for(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.write().await;
        locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------

    /// Route one inbound input. Total over its inputs: taxonomy errors come
    /// back as response outcomes, never panics or `Err`.
    pub async fn handle(&self, user: UserId, input: UserInput) -> EngineResponse {
        match input {
            UserInput::Message { content } => self.handle_message(user, content).await,
            UserInput::Approve { draft_id } => self.approve(user, draft_id).await,
            UserInput::Reject { draft_id } => self.reject(user, draft_id).await,
            UserInput::StartEdit { draft_id } => self.start_edit(user, draft_id).await,
            UserInput::Save => self.save(user).await,
            UserInput::CancelFlow => self.cancel(user).await,
            UserInput::StartWizard => self.start_wizard(user).await,
        }
    }

    /// Register a freshly parsed record as a pending draft. When the parse
    /// left the category empty, keyword matching against the user's catalog
    /// fills it in.
    pub async fn submit_draft(&self, user: UserId, mut attributes: Attributes) -> EngineResponse {
        if attributes.category().is_none() {
            let probe = [
                attributes.merchant().unwrap_or_default(),
                attributes
                    .get(Field::Notes)
                    .and_then(|v| v.as_text())
                    .unwrap_or_default(),
            ]
            .join(" ");
            if let Some(hit) = self.catalog.match_keywords(user, &probe).await {
                attributes.set(Field::Category, AttrValue::Text(hit.name));
            }
        }
        let draft = Draft::new(user, attributes);
        self.drafts.insert(draft.clone()).await;
        EngineResponse::DraftPending { draft }
    }

    // ------------------------------------------------------------------
    // Draft disposition
    // ------------------------------------------------------------------

    async fn approve(&self, user: UserId, draft_id: DraftId) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let attributes = {
            let _guard = lock.lock().await;
            match self.drafts.get(user, &draft_id).await {
                Some(draft) => draft.attributes,
                None => return EngineResponse::NoActiveFlow,
            }
        };

        // Persist outside the region; nothing is destroyed on failure.
        if let Err(error) = self
            .sink
            .save(user, &attributes, RecordStatus::Confirmed)
            .await
        {
            tracing::warn!(user_id = %user, draft_id = %draft_id, %error, "approve: save failed");
            return EngineResponse::SaveFailed { error };
        }

        let _guard = lock.lock().await;
        self.drafts.remove(&draft_id).await;
        self.teardown_if_editing(user, &draft_id).await;
        EngineResponse::Approved { draft_id }
    }

    async fn reject(&self, user: UserId, draft_id: DraftId) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;
        if self.drafts.get(user, &draft_id).await.is_none() {
            return EngineResponse::NoActiveFlow;
        }
        self.drafts.remove(&draft_id).await;
        self.teardown_if_editing(user, &draft_id).await;
        EngineResponse::Rejected { draft_id }
    }

    /// If the user's active flow is editing `draft_id`, tear the session and
    /// registry entry down with it. Caller holds the user region.
    async fn teardown_if_editing(&self, user: UserId, draft_id: &DraftId) {
        if let Some(state) = self.registry.peek(user).await {
            if let FlowState::Edit {
                session_id,
                draft_id: editing,
                ..
            } = &state.flow
            {
                if editing == draft_id {
                    self.sessions.destroy(*session_id).await;
                    self.registry.clear(user).await;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Flow entry
    // ------------------------------------------------------------------

    async fn start_edit(&self, user: UserId, draft_id: DraftId) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        let draft = match self.drafts.get(user, &draft_id).await {
            Some(draft) => draft,
            None => return EngineResponse::NoActiveFlow,
        };

        // Replaces any prior session for this user; entering the flow below
        // replaces any prior registry entry. Reconciliation by construction.
        let session = self
            .sessions
            .create(user, draft_id.clone(), draft.attributes.clone())
            .await;
        self.registry
            .enter(
                user,
                FlowState::Edit {
                    session_id: session.id,
                    draft_id: draft_id.clone(),
                    step: EditStep::CollectingAmount,
                },
            )
            .await;

        EngineResponse::PromptAmount {
            draft_id,
            current: draft.attributes.amount(),
        }
    }

    async fn start_wizard(&self, user: UserId) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        // A prior Edit flow's session must not survive the flow switch. Its
        // draft stays pending: the user never dispositioned it.
        if let Some(prior) = self
            .registry
            .enter(
                user,
                FlowState::Wizard {
                    step: WizardStep::CollectingName,
                },
            )
            .await
        {
            if let Some(session_id) = prior.flow.session_id() {
                self.sessions.destroy(session_id).await;
            }
        }

        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingName,
        }
    }

    // ------------------------------------------------------------------
    // Terminal actions
    // ------------------------------------------------------------------

    async fn cancel(&self, user: UserId) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        let state = match self.registry.clear(user).await {
            Some(state) => state,
            None => return EngineResponse::NoActiveFlow,
        };

        let flow = state.flow.kind();
        if let FlowState::Edit {
            session_id,
            draft_id,
            ..
        } = state.flow
        {
            // The source of truth reverts to "nothing happened".
            self.sessions.destroy(session_id).await;
            self.drafts.remove(&draft_id).await;
        }
        EngineResponse::Cancelled { flow }
    }

    async fn save(&self, user: UserId) -> EngineResponse {
        let lock = self.lock_for(user).await;

        // Phase 1: under the region, validate the flow and copy out what the
        // sink needs.
        let (session_id, draft_id, attributes) = {
            let _guard = lock.lock().await;
            let (session, draft_id, step) = match self.require_edit_flow(user).await {
                Ok(ctx) => ctx,
                Err(response) => return response,
            };
            if !matches!(step, EditStep::Ready) {
                return EngineResponse::Reprompt {
                    flow: FlowState::Edit {
                        session_id: session.id,
                        draft_id,
                        step,
                    },
                    error: ValidationError::NotReadyToSave,
                };
            }
            (session.id, draft_id, session.working)
        };

        // Phase 2: persist with the region released.
        if let Err(error) = self.sink.save(user, &attributes, RecordStatus::Edited).await {
            tracing::warn!(user_id = %user, session_id = %session_id, %error, "save failed; session preserved");
            return EngineResponse::SaveFailed { error };
        }

        // Phase 3: re-acquire and tear down, but only if this save's flow
        // is still the live one. A racing cancel or expiry wins otherwise.
        let _guard = lock.lock().await;
        match self.registry.peek(user).await {
            Some(state) if state.flow.session_id() == Some(session_id) => {
                self.sessions.destroy(session_id).await;
                self.drafts.remove(&draft_id).await;
                self.registry.clear(user).await;
                tracing::info!(user_id = %user, session_id = %session_id, "edited record saved");
                EngineResponse::Saved {
                    draft_id,
                    attributes,
                    status: RecordStatus::Edited,
                }
            }
            _ => {
                tracing::info!(user_id = %user, session_id = %session_id, "save lost the race; flow already ended");
                EngineResponse::NoActiveFlow
            }
        }
    }

    // ------------------------------------------------------------------
    // Message routing
    // ------------------------------------------------------------------

    async fn handle_message(&self, user: UserId, content: String) -> EngineResponse {
        // Routing peeks without the region; the flow handlers re-validate
        // everything under it, so a racing transition just makes this input
        // the loser.
        match self.registry.peek(user).await.map(|s| s.flow) {
            Some(FlowState::Edit { .. }) => self.handle_edit_message(user, content).await,
            Some(FlowState::Wizard { .. }) => self.handle_wizard_message(user, content).await,
            None => {
                let lock = self.lock_for(user).await;
                let _guard = lock.lock().await;
                self.detect_orphaned_session(user).await;
                EngineResponse::Idle { content }
            }
        }
    }

    /// Flow context for edit actions. Caller holds the user region.
    ///
    /// Detects and self-heals the two cross-store inconsistencies: a
    /// registry entry whose session vanished (expiry) and a session without
    /// a registry entry (defect).
    pub(super) async fn require_edit_flow(
        &self,
        user: UserId,
    ) -> Result<(EditSession, DraftId, EditStep), EngineResponse> {
        let state = match self.registry.peek(user).await {
            Some(state) => state,
            None => {
                self.detect_orphaned_session(user).await;
                return Err(EngineResponse::NoActiveFlow);
            }
        };

        let (session_id, draft_id, step) = match state.flow {
            FlowState::Edit {
                session_id,
                draft_id,
                step,
            } => (session_id, draft_id, step),
            FlowState::Wizard { .. } => return Err(EngineResponse::NoActiveFlow),
        };

        match self.sessions.get(user).await {
            Some(session) if session.id == session_id => Ok((session, draft_id, step)),
            Some(stray) => {
                // Registry and store disagree about which session is live.
                tracing::error!(
                    user_id = %user,
                    registry_session = %session_id,
                    store_session = %stray.id,
                    "session/registry mismatch; clearing both"
                );
                self.sessions.destroy(stray.id).await;
                self.registry.clear(user).await;
                Err(EngineResponse::NoActiveFlow)
            }
            None => {
                // Lazily detected expiry: the store already evicted it.
                tracing::info!(user_id = %user, session_id = %session_id, "flow expired");
                self.registry.clear(user).await;
                Err(EngineResponse::FlowExpired)
            }
        }
    }

    /// A live session with no registry entry is a defect; log loudly and
    /// clear it rather than let it be saved against a flow that moved on.
    /// Caller holds the user region.
    async fn detect_orphaned_session(&self, user: UserId) {
        if let Some(session) = self.sessions.get(user).await {
            tracing::error!(
                user_id = %user,
                session_id = %session.id,
                "session without registry entry; destroying"
            );
            self.sessions.destroy(session.id).await;
        }
    }

    // ------------------------------------------------------------------
    // Expiry sweep
    // ------------------------------------------------------------------

    /// Remove every expired session and clear the conversation state that
    /// depended on it, one user region at a time. Returns sessions removed.
    pub async fn sweep(&self) -> usize {
        let mut removed = 0;
        for user in self.sessions.expired_users().await {
            let lock = self.lock_for(user).await;
            let _guard = lock.lock().await;

            let Some(evicted) = self.sessions.evict_if_expired(user).await else {
                continue;
            };
            removed += 1;

            // Clear the flow that depended on the session; leave wizard
            // flows (no backing session) alone.
            if let Some(state) = self.registry.peek(user).await {
                if state.flow.session_id() == Some(evicted) {
                    self.registry.clear(user).await;
                }
            }
        }
        if removed > 0 {
            tracing::info!(count = removed, "sweep cleared expired flows");
        }
        removed
    }

    /// Run [`FlowEngine::sweep`] forever at the configured interval.
    pub fn spawn_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
