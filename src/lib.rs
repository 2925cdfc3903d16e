//! spendbot: conversation & edit-session engine
//!
//! The core of a chat-driven expense assistant: per-user flow state
//! machines (Edit Flow, Creation Wizard), a timed edit-session store with
//! change auditing, a draft store, and the reconciliation rules that keep
//! the three consistent. Parsing, rendering, and storage integrations are
//! external collaborators behind the traits in [`collab`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use spendbot::classify::ClassificationCatalog;
//! use spendbot::collab::{JaroWinklerResolver, MemorySink};
//! use spendbot::config::EngineConfig;
//! use spendbot::engine::{Attributes, AttrValue, Field, FlowEngine, UserId, UserInput};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = FlowEngine::new(
//!     EngineConfig::default(),
//!     ClassificationCatalog::with_default_set()?,
//!     Arc::new(JaroWinklerResolver::default()),
//!     Arc::new(MemorySink::new()),
//! );
//!
//! let user = UserId(42);
//! let attrs = Attributes::new()
//!     .with(Field::Amount, AttrValue::Number("350.50".parse()?))
//!     .with(Field::Merchant, AttrValue::text("McDonald's"));
//! let pending = engine.submit_draft(user, attrs).await;
//! let reply = engine.handle(user, UserInput::message("groceries")).await;
//! # let _ = (pending, reply);
//! # Ok(())
//! # }
//! ```

// Core error taxonomy
pub mod error;

// Engine configuration
pub mod config;

// Classification catalog (per-user named buckets)
pub mod classify;

// External collaborator contracts + shipped implementations
pub mod collab;

// The conversation & edit-session engine
pub mod engine;

pub use config::EngineConfig;
pub use engine::{EngineResponse, FlowEngine, UserId, UserInput};
pub use error::{FlowError, PersistenceError, ValidationError};
