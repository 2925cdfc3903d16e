//! Integration tests for the Creation Wizard: name → glyph → keywords.

use std::sync::Arc;

use spendbot::classify::{Classification, ClassificationCatalog, DEFAULT_GLYPH};
use spendbot::collab::{MemorySink, NullResolver};
use spendbot::config::EngineConfig;
use spendbot::engine::{
    AttrValue, Attributes, EngineResponse, Field, FlowEngine, UserId, UserInput, WizardStep,
};
use spendbot::error::ValidationError;

const USER: UserId = UserId(11);

fn engine() -> FlowEngine {
    FlowEngine::new(
        EngineConfig::default(),
        ClassificationCatalog::with_default_set().unwrap(),
        Arc::new(NullResolver),
        Arc::new(MemorySink::new()),
    )
}

#[tokio::test]
async fn test_wizard_full_run() {
    let engine = engine();

    let resp = engine.handle(USER, UserInput::StartWizard).await;
    assert!(matches!(
        resp,
        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingName
        }
    ));

    let resp = engine.handle(USER, UserInput::message("Subscriptions")).await;
    match resp {
        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingGlyph { name },
        } => assert_eq!(name, "subscriptions"),
        other => panic!("expected glyph prompt, got {other:?}"),
    }

    let resp = engine.handle(USER, UserInput::message("📺")).await;
    match resp {
        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingKeywords { name, glyph },
        } => {
            assert_eq!(name, "subscriptions");
            assert_eq!(glyph, "📺");
        }
        other => panic!("expected keywords prompt, got {other:?}"),
    }

    let resp = engine
        .handle(USER, UserInput::message("Netflix, prime, , Spotify"))
        .await;
    match resp {
        EngineResponse::ClassificationCreated { classification } => {
            assert_eq!(classification.name, "subscriptions");
            assert_eq!(classification.glyph, "📺");
            assert_eq!(classification.keywords, vec!["netflix", "prime", "spotify"]);
        }
        other => panic!("expected ClassificationCreated, got {other:?}"),
    }

    // The flow cleared itself and the catalog kept the entry.
    assert!(engine.registry().is_empty().await);
    assert!(engine.catalog().contains(USER, "subscriptions").await);
}

#[tokio::test]
async fn test_name_validation_reprompts() {
    let engine = engine();
    engine.handle(USER, UserInput::StartWizard).await;

    // Empty.
    let resp = engine.handle(USER, UserInput::message("   ")).await;
    assert!(matches!(
        resp,
        EngineResponse::Reprompt {
            error: ValidationError::EmptyInput,
            ..
        }
    ));

    // Too long.
    let resp = engine
        .handle(USER, UserInput::message("x".repeat(51)))
        .await;
    assert!(matches!(
        resp,
        EngineResponse::Reprompt {
            error: ValidationError::NameTooLong { max: 50 },
            ..
        }
    ));

    // Duplicate, case-insensitively ("food" ships in the default catalog).
    let resp = engine.handle(USER, UserInput::message("FOOD")).await;
    assert!(matches!(
        resp,
        EngineResponse::Reprompt {
            error: ValidationError::DuplicateName { .. },
            ..
        }
    ));

    // Still at the name step; a valid name advances.
    let resp = engine.handle(USER, UserInput::message("gifts")).await;
    assert!(matches!(
        resp,
        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingGlyph { .. }
        }
    ));
}

#[tokio::test]
async fn test_unusable_glyph_falls_back_to_default() {
    let engine = engine();
    engine.handle(USER, UserInput::StartWizard).await;
    engine.handle(USER, UserInput::message("gifts")).await;

    let resp = engine
        .handle(USER, UserInput::message("this is far too long"))
        .await;
    match resp {
        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingKeywords { glyph, .. },
        } => assert_eq!(glyph, DEFAULT_GLYPH),
        other => panic!("expected keywords prompt, got {other:?}"),
    }
}

#[tokio::test]
async fn test_keywords_none_yields_empty_set() {
    let engine = engine();
    engine.handle(USER, UserInput::StartWizard).await;
    engine.handle(USER, UserInput::message("gifts")).await;
    engine.handle(USER, UserInput::message("🎁")).await;

    let resp = engine.handle(USER, UserInput::message("None")).await;
    match resp {
        EngineResponse::ClassificationCreated { classification } => {
            assert!(classification.keywords.is_empty());
        }
        other => panic!("expected ClassificationCreated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_mid_wizard_leaves_catalog_untouched() {
    let engine = engine();
    let before = engine.catalog().snapshot(USER).await;

    engine.handle(USER, UserInput::StartWizard).await;
    engine.handle(USER, UserInput::message("gifts")).await;
    engine.handle(USER, UserInput::message("🎁")).await;

    let resp = engine.handle(USER, UserInput::CancelFlow).await;
    assert!(matches!(resp, EngineResponse::Cancelled { .. }));
    assert!(engine.registry().is_empty().await);
    assert_eq!(engine.catalog().snapshot(USER).await, before);
}

#[tokio::test]
async fn test_starting_wizard_destroys_orphaned_edit_session() {
    let engine = engine();

    // Put the user in an edit flow first.
    let attrs = Attributes::new().with(Field::Amount, AttrValue::Number("50".parse().unwrap()));
    let draft_id = match engine.submit_draft(USER, attrs).await {
        EngineResponse::DraftPending { draft } => draft.id,
        other => panic!("expected DraftPending, got {other:?}"),
    };
    engine
        .handle(USER, UserInput::StartEdit { draft_id: draft_id.clone() })
        .await;
    assert!(engine.sessions().get(USER).await.is_some());

    // Entering the wizard abandons the edit flow and its session; the
    // undispositioned draft stays pending.
    engine.handle(USER, UserInput::StartWizard).await;
    assert!(engine.sessions().is_empty().await);
    assert!(engine.drafts().get(USER, &draft_id).await.is_some());

    // A reply routes into the wizard, not the dead edit flow.
    let resp = engine.handle(USER, UserInput::message("gifts")).await;
    assert!(matches!(
        resp,
        EngineResponse::WizardPrompt {
            step: WizardStep::CollectingGlyph { .. }
        }
    ));

    // The abandoned-but-pending draft can still be edited afterwards.
    engine.handle(USER, UserInput::CancelFlow).await;
    let resp = engine.handle(USER, UserInput::StartEdit { draft_id }).await;
    assert!(matches!(resp, EngineResponse::PromptAmount { .. }));
}

#[tokio::test]
async fn test_wizard_and_edit_catalogs_are_per_user() {
    let engine = engine();
    engine.handle(USER, UserInput::StartWizard).await;
    engine.handle(USER, UserInput::message("gifts")).await;
    engine.handle(USER, UserInput::message("🎁")).await;
    engine.handle(USER, UserInput::message("none")).await;

    assert!(engine.catalog().contains(USER, "gifts").await);
    assert!(!engine.catalog().contains(UserId(12), "gifts").await);

    // Another user may claim the same name.
    let other = UserId(12);
    engine
        .catalog()
        .insert(other, Classification::bare("gifts"))
        .await
        .unwrap();
    assert!(engine.catalog().contains(other, "gifts").await);
}
