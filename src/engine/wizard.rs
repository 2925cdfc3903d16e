//! Creation Wizard
//!
//! Ordered collection of a new classification: name, glyph, keywords. Name
//! validation is strict (re-prompt on bad input); the glyph is lenient by
//! design: it is cosmetic, so unusable input falls back to the default
//! glyph instead of blocking the flow.

use super::orchestrator::FlowEngine;
use super::response::EngineResponse;
use super::types::{FlowState, UserId, WizardStep};
use crate::classify::{Classification, DEFAULT_GLYPH};
use crate::error::ValidationError;

/// Accept a short non-empty glyph verbatim; anything else becomes the
/// default glyph.
pub fn normalize_glyph(input: &str, max_chars: usize) -> String {
    let glyph = input.trim();
    if glyph.is_empty() || glyph.chars().count() > max_chars {
        DEFAULT_GLYPH.to_string()
    } else {
        glyph.to_string()
    }
}

/// Parse a comma-separated keyword reply. A literal "none" yields the empty
/// set. Keywords are trimmed, lowercased, de-duplicated in first-seen order.
pub fn parse_keywords(input: &str) -> Vec<String> {
    if input.trim().eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    let mut keywords = Vec::new();
    for raw in input.split(',') {
        let keyword = raw.trim().to_lowercase();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}

impl FlowEngine {
    pub(super) async fn handle_wizard_message(
        &self,
        user: UserId,
        content: String,
    ) -> EngineResponse {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;

        let step = match self.registry.peek(user).await.map(|s| s.flow) {
            Some(FlowState::Wizard { step }) => step,
            // The flow ended (or switched) between routing and locking.
            _ => return EngineResponse::NoActiveFlow,
        };

        match step {
            WizardStep::CollectingName => match self.validate_name(user, &content).await {
                Err(error) => EngineResponse::Reprompt {
                    flow: FlowState::Wizard {
                        step: WizardStep::CollectingName,
                    },
                    error,
                },
                Ok(name) => {
                    let next = WizardStep::CollectingGlyph { name };
                    self.set_wizard_step(user, next.clone()).await;
                    EngineResponse::WizardPrompt { step: next }
                }
            },

            WizardStep::CollectingGlyph { name } => {
                let glyph = normalize_glyph(&content, self.config.max_glyph_chars);
                let next = WizardStep::CollectingKeywords { name, glyph };
                self.set_wizard_step(user, next.clone()).await;
                EngineResponse::WizardPrompt { step: next }
            }

            WizardStep::CollectingKeywords { name, glyph } => {
                let classification = Classification::new(name, glyph, parse_keywords(&content));
                match self.catalog.insert(user, classification.clone()).await {
                    Ok(()) => {
                        self.registry.clear(user).await;
                        tracing::info!(
                            user_id = %user,
                            name = %classification.name,
                            "classification created"
                        );
                        EngineResponse::ClassificationCreated { classification }
                    }
                    Err(error) => {
                        // The name was validated on entry, so a collision
                        // here means the set changed under the flow. Start
                        // the name step over.
                        self.set_wizard_step(user, WizardStep::CollectingName).await;
                        EngineResponse::Reprompt {
                            flow: FlowState::Wizard {
                                step: WizardStep::CollectingName,
                            },
                            error,
                        }
                    }
                }
            }
        }
    }

    async fn validate_name(&self, user: UserId, input: &str) -> Result<String, ValidationError> {
        let name = input.trim().to_lowercase();
        if name.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        if name.chars().count() > self.config.max_name_chars {
            return Err(ValidationError::NameTooLong {
                max: self.config.max_name_chars,
            });
        }
        if self.catalog.contains(user, &name).await {
            return Err(ValidationError::DuplicateName { name });
        }
        Ok(name)
    }

    async fn set_wizard_step(&self, user: UserId, step: WizardStep) {
        let _ = self
            .registry
            .advance(user, |flow| {
                *flow = FlowState::Wizard { step: step.clone() };
            })
            .await;
    }
}
