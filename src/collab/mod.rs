//! External collaborator contracts
//!
//! The engine consumes exactly two collaborators, both behind narrow async
//! traits so implementations can be swapped (stubbed in tests, HTTP-backed
//! in production glue). These are **pure service contracts**: no session
//! mutation, no engine state behind them.

pub mod fuzzy;
pub mod http;
pub mod sink;

use async_trait::async_trait;

use crate::engine::types::{Attributes, RecordStatus, UserId};
use crate::error::PersistenceError;

pub use fuzzy::JaroWinklerResolver;
pub use http::GenerativeResolver;
pub use sink::{JsonlSink, MemorySink, SavedRecord};

/// Maps an unrecognized category label onto one of the user's existing
/// classification names, or declines.
///
/// The engine treats `Ok(None)` and `Err(_)` identically (fall through to
/// "create new"), so implementations should not bother retrying.
#[async_trait]
pub trait CategoryResolver: Send + Sync {
    async fn suggest(
        &self,
        candidate: &str,
        existing: &[String],
    ) -> anyhow::Result<Option<String>>;
}

/// Persists a finalized expense record. The engine never retries on its own;
/// failure is surfaced to the flow caller verbatim.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn save(
        &self,
        user: UserId,
        record: &Attributes,
        status: RecordStatus,
    ) -> Result<(), PersistenceError>;
}

/// Resolver that never suggests anything. Useful as a default and in tests
/// exercising the "create new classification" path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

#[async_trait]
impl CategoryResolver for NullResolver {
    async fn suggest(
        &self,
        _candidate: &str,
        _existing: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Resolver that always proposes a fixed name. Test-only convenience.
#[derive(Debug, Clone, Default)]
pub struct FixedResolver {
    pub answer: Option<String>,
}

impl FixedResolver {
    pub fn suggesting(name: impl Into<String>) -> Self {
        Self {
            answer: Some(name.into()),
        }
    }
}

#[async_trait]
impl CategoryResolver for FixedResolver {
    async fn suggest(
        &self,
        _candidate: &str,
        _existing: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(self.answer.clone())
    }
}
