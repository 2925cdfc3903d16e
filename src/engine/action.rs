//! Structured action descriptors
//!
//! Button presses arrive from the presentation layer as compact callback
//! strings. They are decoded here, once, into [`UserInput`]; handlers never
//! see or re-split the wire form. The format is `<scope>:<action>[:<id>]`:
//!
//! ```text
//! draft:approve:exp-7-1722900000000
//! draft:edit:exp-7-1722900000000
//! draft:reject:exp-7-1722900000000
//! edit:save
//! flow:cancel
//! wizard:start
//! ```

use super::types::{DraftId, UserInput};

/// Decode a callback string into a [`UserInput`].
///
/// Returns `None` for anything that is not a well-formed descriptor; the
/// caller should treat such input as free text or drop it.
pub fn decode(raw: &str) -> Option<UserInput> {
    let mut parts = raw.splitn(3, ':');
    let scope = parts.next()?;
    let action = parts.next()?;
    let id = parts.next();

    match (scope, action, id) {
        ("draft", "approve", Some(id)) => Some(UserInput::Approve {
            draft_id: DraftId::from(id),
        }),
        ("draft", "reject", Some(id)) => Some(UserInput::Reject {
            draft_id: DraftId::from(id),
        }),
        ("draft", "edit", Some(id)) => Some(UserInput::StartEdit {
            draft_id: DraftId::from(id),
        }),
        ("edit", "save", None) => Some(UserInput::Save),
        ("flow", "cancel", None) => Some(UserInput::CancelFlow),
        ("wizard", "start", None) => Some(UserInput::StartWizard),
        _ => None,
    }
}

/// Encode a structured input back into its callback string.
///
/// `Message` has no wire form (it travels as plain text), so this returns
/// `None` for it.
pub fn encode(input: &UserInput) -> Option<String> {
    match input {
        UserInput::Message { .. } => None,
        UserInput::Approve { draft_id } => Some(format!("draft:approve:{draft_id}")),
        UserInput::Reject { draft_id } => Some(format!("draft:reject:{draft_id}")),
        UserInput::StartEdit { draft_id } => Some(format!("draft:edit:{draft_id}")),
        UserInput::Save => Some("edit:save".to_string()),
        UserInput::CancelFlow => Some("flow:cancel".to_string()),
        UserInput::StartWizard => Some("wizard:start".to_string()),
    }
}
