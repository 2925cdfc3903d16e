//! Engine responses
//!
//! Every interaction produces one [`EngineResponse`] describing what the
//! presentation layer should do next: which prompt to render, which outcome
//! to announce. The engine never builds user-facing text; responses carry
//! flow kind, step, and scratch data only, and the renderer owns the words.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::draft::Draft;
use super::types::{Attributes, DraftId, FlowKind, FlowState, RecordStatus, WizardStep};
use crate::classify::Classification;
use crate::error::{PersistenceError, ValidationError};

/// Outcome of routing one user input through the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineResponse {
    /// A draft was stored and awaits approve / edit / reject.
    DraftPending { draft: Draft },

    /// The draft was persisted unchanged and discarded.
    Approved { draft_id: DraftId },

    /// The draft was discarded without persisting.
    Rejected { draft_id: DraftId },

    /// Edit flow: waiting for a positive amount.
    PromptAmount {
        draft_id: DraftId,
        current: Option<Decimal>,
    },

    /// Edit flow: amount committed, waiting for a category label.
    PromptCategory { amount: Decimal },

    /// Edit flow: the resolver proposed an existing classification.
    ConfirmSuggestion { original: String, suggested: String },

    /// Edit flow: category committed; a Save may now be issued.
    ReadyToSave {
        category: String,
        newly_created: bool,
    },

    /// The working copy was persisted and all flow state torn down.
    Saved {
        draft_id: DraftId,
        attributes: Attributes,
        status: RecordStatus,
    },

    /// Persistence refused the record; session and registry survive so the
    /// user can retry the save.
    SaveFailed { error: PersistenceError },

    /// The flow was abandoned; nothing was persisted.
    Cancelled { flow: FlowKind },

    /// Wizard: waiting for the next field. The step carries what has been
    /// collected so far.
    WizardPrompt { step: WizardStep },

    /// Wizard finished; the classification now exists in the user's set.
    ClassificationCreated { classification: Classification },

    /// Malformed input for the current step: state unchanged, same prompt
    /// again. The flow state is included so the renderer knows which.
    Reprompt {
        flow: FlowState,
        error: ValidationError,
    },

    /// The action had no matching flow or draft: tell the user to start
    /// over.
    NoActiveFlow,

    /// The backing session timed out; the flow was cleared. Distinct from
    /// `NoActiveFlow` for observability only.
    FlowExpired,

    /// Free text with no active flow. The surrounding application routes
    /// this to its language pipeline; the engine does not interpret it.
    Idle { content: String },
}

impl EngineResponse {
    /// Whether this response ended a flow (by success, cancel, or expiry).
    pub fn ends_flow(&self) -> bool {
        matches!(
            self,
            EngineResponse::Saved { .. }
                | EngineResponse::Cancelled { .. }
                | EngineResponse::ClassificationCreated { .. }
                | EngineResponse::FlowExpired
        )
    }
}
