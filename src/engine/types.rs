//! Core types for the conversation engine
//!
//! All types in this module are serializable and designed for:
//! - Flow state machine transitions
//! - Change-log auditing
//! - API request/response contracts with the surrounding presentation layer
//!
//! The two flows drive user input like this:
//! ```text
//! Edit Flow:
//!   CollectingAmount ── positive number ──► CollectingCategory
//!   CollectingCategory ── known name ─────► Ready
//!   CollectingCategory ── suggestion ─────► ConfirmingSuggestion ──► Ready
//!   CollectingCategory ── no suggestion ──► Ready (new classification)
//!   Ready ── Save ──► (persist, tear down)      Cancel valid from any step
//!
//! Creation Wizard:
//!   CollectingName ──► CollectingGlyph ──► CollectingKeywords ──► done
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Chat-platform user identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque draft identifier. Derived from the owning user and creation time
/// so it stays unique within a process run without central coordination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(String);

impl DraftId {
    /// Mint an id for a draft owned by `user` created at `at`.
    pub fn mint(user: UserId, at: DateTime<Utc>) -> Self {
        Self(format!("exp-{}-{}", user.0, at.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DraftId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique edit-session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Attribute model
// ============================================================================

/// Named attribute of an expense record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Amount,
    Category,
    Merchant,
    PaymentMethod,
    Date,
    Notes,
    Confidence,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Amount => "amount",
            Field::Category => "category",
            Field::Merchant => "merchant",
            Field::PaymentMethod => "payment_method",
            Field::Date => "date",
            Field::Notes => "notes",
            Field::Confidence => "confidence",
        };
        write!(f, "{name}")
    }
}

/// How the expense was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Cash,
    Card,
    Online,
    #[default]
    Unknown,
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Number(Decimal),
    Text(String),
    Payment(PaymentMethod),
    Date(NaiveDate),
    Score(f64),
}

impl AttrValue {
    pub fn text(s: impl Into<String>) -> Self {
        AttrValue::Text(s.into())
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            AttrValue::Number(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The attribute map of one expense record.
///
/// A `BTreeMap` keeps field order deterministic for snapshots, change-log
/// replay, and serialized fixtures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<Field, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&AttrValue> {
        self.0.get(&field)
    }

    /// Overwrite `field`, returning the previous value if any.
    pub fn set(&mut self, field: Field, value: AttrValue) -> Option<AttrValue> {
        self.0.insert(field, value)
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.get(Field::Amount).and_then(AttrValue::as_number)
    }

    pub fn category(&self) -> Option<&str> {
        self.get(Field::Category).and_then(AttrValue::as_text)
    }

    pub fn merchant(&self) -> Option<&str> {
        self.get(Field::Merchant).and_then(AttrValue::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &AttrValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builder-style insertion for fixtures and draft construction.
    pub fn with(mut self, field: Field, value: AttrValue) -> Self {
        self.0.insert(field, value);
        self
    }
}

/// Disposition recorded against a persisted expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Approved as parsed, untouched.
    Confirmed,
    /// Approved after passing through the Edit Flow.
    Edited,
}

// ============================================================================
// Flow state machine
// ============================================================================

/// Which multi-step conversational procedure is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Edit,
    Wizard,
}

/// Steps of the Edit Flow. Scratch data rides inside the variant that
/// needs it, so a step can never be observed without its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum EditStep {
    /// Waiting for a positive number.
    CollectingAmount,

    /// Waiting for a free-text category label.
    CollectingCategory,

    /// The resolver proposed an existing classification; waiting for the
    /// user to accept it or implicitly create their original text as new.
    ConfirmingSuggestion { original: String, suggested: String },

    /// Category accepted; a Save may now commit the working copy.
    Ready,
}

/// Steps of the Creation Wizard. Collected fields accumulate through the
/// step variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardStep {
    CollectingName,
    CollectingGlyph { name: String },
    CollectingKeywords { name: String, glyph: String },
}

/// The flow a user is inside, with its step and flow-scoped scratch data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowState {
    Edit {
        session_id: SessionId,
        draft_id: DraftId,
        step: EditStep,
    },
    Wizard {
        step: WizardStep,
    },
}

impl FlowState {
    pub fn kind(&self) -> FlowKind {
        match self {
            FlowState::Edit { .. } => FlowKind::Edit,
            FlowState::Wizard { .. } => FlowKind::Wizard,
        }
    }

    /// The session this flow depends on, if it needs one.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            FlowState::Edit { session_id, .. } => Some(*session_id),
            FlowState::Wizard { .. } => None,
        }
    }
}

/// The single active flow descriptor for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: UserId,
    pub flow: FlowState,
    pub entered_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(user_id: UserId, flow: FlowState) -> Self {
        Self {
            user_id,
            flow,
            entered_at: Utc::now(),
        }
    }
}

// ============================================================================
// Inbound input
// ============================================================================

/// Everything a user can send into the engine: free text, or a discrete
/// action decoded at the boundary (see `engine::action`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserInput {
    /// Free-text reply.
    Message { content: String },

    /// Persist the pending draft as-is.
    Approve { draft_id: DraftId },

    /// Discard the pending draft.
    Reject { draft_id: DraftId },

    /// Open an edit session on the pending draft.
    StartEdit { draft_id: DraftId },

    /// Commit the working copy of the current edit session.
    Save,

    /// Abandon the current flow from any step.
    CancelFlow,

    /// Begin defining a new classification.
    StartWizard,
}

impl UserInput {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    pub fn as_message(&self) -> Option<&str> {
        match self {
            UserInput::Message { content } => Some(content),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
