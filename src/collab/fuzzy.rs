//! Jaro-Winkler category resolver
//!
//! Deterministic, local implementation of [`CategoryResolver`]: proposes the
//! existing classification whose name is closest to the candidate text,
//! provided the similarity clears a threshold. Works entirely offline, which
//! also makes it the resolver of choice for the interactive driver.

use async_trait::async_trait;
use strsim::jaro_winkler;

use super::CategoryResolver;

/// Similarity below this is not worth confirming with the user.
const DEFAULT_THRESHOLD: f64 = 0.84;

#[derive(Debug, Clone, Copy)]
pub struct JaroWinklerResolver {
    threshold: f64,
}

impl JaroWinklerResolver {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Best-scoring existing name above the threshold, if any.
    fn best_match(&self, candidate: &str, existing: &[String]) -> Option<String> {
        let needle = candidate.trim().to_lowercase();
        existing
            .iter()
            .map(|name| (name, jaro_winkler(&needle, &name.to_lowercase())))
            .filter(|(_, score)| *score >= self.threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name.clone())
    }
}

impl Default for JaroWinklerResolver {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[async_trait]
impl CategoryResolver for JaroWinklerResolver {
    async fn suggest(
        &self,
        candidate: &str,
        existing: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(self.best_match(candidate, existing))
    }
}
