//! Conversation & edit-session engine
//!
//! Per-user flow state machines over three coordinated stores:
//!
//! 1. **Draft store**: records awaiting approve / edit / reject
//! 2. **Session store**: timed working copies with a change audit trail
//! 3. **Flow registry**: the single active flow descriptor per user
//!
//! ```text
//! inbound (user, input)
//!        │
//!        ▼
//!  ┌───────────┐   flow active?   ┌──────────────────────┐
//!  │ registry  │ ───────────────► │ Edit Flow / Wizard   │
//!  └───────────┘                  │  reads+writes session │
//!        │ none                   └──────────────────────┘
//!        ▼                                   │ save / cancel / expiry
//!   Idle (glue's NL                          ▼
//!   pipeline takes over)          session + registry (+ draft) torn
//!                                 down together
//! ```
//!
//! The engine decides *which step is active*, *what data is mutated*, and
//! *when a flow is discarded*. It never parses natural language, performs
//! network I/O of its own, or renders user-facing text.

pub mod action;
pub mod draft;
pub mod edit_flow;
pub mod orchestrator;
pub mod registry;
pub mod response;
pub mod session;
pub mod session_store;
pub mod types;
pub mod wizard;

pub use draft::{Draft, DraftStore};
pub use orchestrator::FlowEngine;
pub use registry::FlowRegistry;
pub use response::EngineResponse;
pub use session::{EditSession, FieldChange};
pub use session_store::{SessionStats, SessionStore};
pub use types::{
    AttrValue, Attributes, ConversationState, DraftId, EditStep, Field, FlowKind, FlowState,
    PaymentMethod, RecordStatus, SessionId, UserId, UserInput, WizardStep,
};
