//! Edit Flow
//!
//! Step logic for amending a pending draft: collect a new amount, collect a
//! category (with resolver-backed suggestion for unknown labels), then hold
//! at `Ready` until the user saves or cancels. Steps never skip; malformed
//! input re-issues the same prompt.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::orchestrator::FlowEngine;
use super::response::EngineResponse;
use super::types::{AttrValue, EditStep, Field, FlowState, SessionId, UserId};
use crate::classify::Classification;
use crate::error::ValidationError;

static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();

/// Scrape the first number out of a free-text reply and require it to be
/// positive. Accepts "350", "350.50", "paid 350 yesterday".
pub fn parse_amount(input: &str) -> Result<Decimal, ValidationError> {
    let re = AMOUNT_RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("amount pattern"));
    let invalid = || ValidationError::InvalidAmount {
        input: input.trim().to_string(),
    };
    let matched = re.find(input).ok_or_else(invalid)?;
    let amount: Decimal = matched.as_str().parse().map_err(|_| invalid())?;
    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    Ok(amount)
}

/// Category labels are compared and stored lowercased.
pub fn normalize_label(input: &str) -> Result<String, ValidationError> {
    let label = input.trim().to_lowercase();
    if label.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(label)
}

/// Replies that accept a suggested category. Anything else declines it.
pub fn is_affirmative(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "yes" | "y" | "yeah" | "ok" | "okay" | "sure"
    )
}

impl FlowEngine {
    pub(super) async fn handle_edit_message(
        &self,
        user: UserId,
        content: String,
    ) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let guard = lock.lock().await;

        let (session, draft_id, step) = match self.require_edit_flow(user).await {
            Ok(ctx) => ctx,
            Err(response) => return response,
        };

        match step {
            EditStep::CollectingAmount => {
                let amount = match parse_amount(&content) {
                    Ok(amount) => amount,
                    Err(error) => {
                        return EngineResponse::Reprompt {
                            flow: FlowState::Edit {
                                session_id: session.id,
                                draft_id,
                                step: EditStep::CollectingAmount,
                            },
                            error,
                        }
                    }
                };
                let _ = self
                    .sessions
                    .update_field(
                        session.id,
                        Field::Amount,
                        AttrValue::Number(amount),
                        format!("chat reply: {}", content.trim()),
                    )
                    .await;
                let _ = self
                    .registry
                    .advance(user, |flow| {
                        if let FlowState::Edit { step, .. } = flow {
                            *step = EditStep::CollectingCategory;
                        }
                    })
                    .await;
                EngineResponse::PromptCategory { amount }
            }

            EditStep::CollectingCategory => {
                let label = match normalize_label(&content) {
                    Ok(label) => label,
                    Err(error) => {
                        return EngineResponse::Reprompt {
                            flow: FlowState::Edit {
                                session_id: session.id,
                                draft_id,
                                step: EditStep::CollectingCategory,
                            },
                            error,
                        }
                    }
                };

                if self.catalog.contains(user, &label).await {
                    self.commit_category(user, session.id, &label, "chat reply")
                        .await;
                    return EngineResponse::ReadyToSave {
                        category: label,
                        newly_created: false,
                    };
                }

                // Unknown label: ask the resolver with the region released.
                let existing = self.catalog.names(user).await;
                drop(guard);
                let suggestion = match self.resolver.suggest(&label, &existing).await {
                    Ok(suggestion) => suggestion,
                    Err(error) => {
                        // Unrecognized responses and failures read as "none".
                        tracing::warn!(user_id = %user, %error, "category resolver failed");
                        None
                    }
                };

                // Re-acquire and re-validate: a racing cancel, save, or
                // expiry makes this input the loser.
                let _guard = lock.lock().await;
                let (current, _, current_step) = match self.require_edit_flow(user).await {
                    Ok(ctx) => ctx,
                    Err(response) => return response,
                };
                if current.id != session.id
                    || !matches!(current_step, EditStep::CollectingCategory)
                {
                    return EngineResponse::NoActiveFlow;
                }

                match suggestion {
                    Some(suggested) => {
                        let original = label.clone();
                        let _ = self
                            .registry
                            .advance(user, |flow| {
                                if let FlowState::Edit { step, .. } = flow {
                                    *step = EditStep::ConfirmingSuggestion {
                                        original: original.clone(),
                                        suggested: suggested.clone(),
                                    };
                                }
                            })
                            .await;
                        EngineResponse::ConfirmSuggestion {
                            original: label,
                            suggested,
                        }
                    }
                    None => {
                        self.create_and_commit(user, session.id, &label).await;
                        EngineResponse::ReadyToSave {
                            category: label,
                            newly_created: true,
                        }
                    }
                }
            }

            EditStep::ConfirmingSuggestion {
                original,
                suggested,
            } => {
                if is_affirmative(&content) {
                    self.commit_category(user, session.id, &suggested, "suggestion confirmed")
                        .await;
                    EngineResponse::ReadyToSave {
                        category: suggested,
                        newly_created: false,
                    }
                } else {
                    // Any other reply: the user's original text becomes a
                    // brand-new classification.
                    self.create_and_commit(user, session.id, &original).await;
                    EngineResponse::ReadyToSave {
                        category: original,
                        newly_created: true,
                    }
                }
            }

            EditStep::Ready => {
                // Everything is collected; point the renderer back at the
                // save/cancel choice.
                let category = session.working.category().unwrap_or_default().to_string();
                EngineResponse::ReadyToSave {
                    category,
                    newly_created: false,
                }
            }
        }
    }

    /// Commit a category value into the session and move the flow to
    /// `Ready`. Caller holds the user region.
    pub(super) async fn commit_category(
        &self,
        user: UserId,
        session_id: SessionId,
        label: &str,
        reason: &str,
    ) {
        let _ = self
            .sessions
            .update_field(session_id, Field::Category, AttrValue::text(label), reason)
            .await;
        let _ = self
            .registry
            .advance(user, |flow| {
                if let FlowState::Edit { step, .. } = flow {
                    *step = EditStep::Ready;
                }
            })
            .await;
    }

    /// Create `label` as a new bare classification (default glyph, no
    /// keywords) and commit it. A lost creation race just means the name
    /// already exists, and committing it is still correct.
    async fn create_and_commit(&self, user: UserId, session_id: SessionId, label: &str) {
        if let Err(error) = self.catalog.insert(user, Classification::bare(label)).await {
            tracing::debug!(user_id = %user, %error, "classification already present");
        }
        self.commit_category(user, session_id, label, "new classification")
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_accepts_decorated_input() {
        assert_eq!(parse_amount("350.50").unwrap(), "350.50".parse().unwrap());
        assert_eq!(parse_amount("paid 120 for lunch").unwrap(), "120".parse().unwrap());
        assert_eq!(parse_amount("₹99.90").unwrap(), "99.90".parse().unwrap());
    }

    #[test]
    fn test_parse_amount_rejects_nonpositive_and_garbage() {
        assert!(parse_amount("no numbers here").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("0.00").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Groceries ").unwrap(), "groceries");
        assert!(matches!(
            normalize_label("   "),
            Err(ValidationError::EmptyInput)
        ));
    }

    #[test]
    fn test_affirmative_replies() {
        for yes in ["yes", "Yes", " y ", "OK", "sure"] {
            assert!(is_affirmative(yes), "{yes:?} should affirm");
        }
        for no in ["no", "nope", "subscriptions", ""] {
            assert!(!is_affirmative(no), "{no:?} should decline");
        }
    }
}
