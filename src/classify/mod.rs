//! Classification catalog
//!
//! A classification is a named bucket with a display glyph and a keyword
//! set, owned per user. Names are unique case-insensitively within one
//! user's set. A default catalog ships as `config/categories.yaml` and is
//! installed for a user the first time their set is touched.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::engine::types::UserId;
use crate::error::ValidationError;

/// Glyph used when the user supplies none (or an unusable one).
pub const DEFAULT_GLYPH: &str = "📝";

const DEFAULT_CATALOG_YAML: &str = include_str!("../../config/categories.yaml");

/// A named expense bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Stored lowercased; display casing is the renderer's concern.
    pub name: String,
    pub glyph: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Classification {
    /// Build a classification, lowercasing the name and keywords.
    pub fn new(name: impl Into<String>, glyph: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            name: name.into().trim().to_lowercase(),
            glyph: glyph.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// A bucket with the default glyph and no keywords: what the Edit Flow
    /// creates for unrecognized category labels.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_GLYPH, Vec::new())
    }
}

/// Parse the default catalog shipped with the crate.
pub fn default_classifications() -> anyhow::Result<Vec<Classification>> {
    let raw: Vec<Classification> =
        serde_yaml::from_str(DEFAULT_CATALOG_YAML).context("parsing config/categories.yaml")?;
    Ok(raw
        .into_iter()
        .map(|c| Classification::new(c.name, c.glyph, c.keywords))
        .collect())
}

/// Per-user classification sets.
#[derive(Debug, Clone)]
pub struct ClassificationCatalog {
    sets: Arc<RwLock<HashMap<UserId, Vec<Classification>>>>,
    defaults: Arc<Vec<Classification>>,
}

impl ClassificationCatalog {
    /// A catalog that seeds each new user with `defaults`.
    pub fn new(defaults: Vec<Classification>) -> Self {
        Self {
            sets: Arc::new(RwLock::new(HashMap::new())),
            defaults: Arc::new(defaults),
        }
    }

    /// A catalog seeded from `config/categories.yaml`.
    pub fn with_default_set() -> anyhow::Result<Self> {
        Ok(Self::new(default_classifications()?))
    }

    /// An empty catalog (no seeding); used by tests that want full control.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    async fn ensure_user(&self, user: UserId) {
        let mut sets = self.sets.write().await;
        sets.entry(user)
            .or_insert_with(|| self.defaults.as_ref().clone());
    }

    /// The user's classification, looked up case-insensitively.
    pub async fn find(&self, user: UserId, name: &str) -> Option<Classification> {
        self.ensure_user(user).await;
        let needle = name.trim().to_lowercase();
        self.sets
            .read()
            .await
            .get(&user)
            .and_then(|set| set.iter().find(|c| c.name == needle))
            .cloned()
    }

    pub async fn contains(&self, user: UserId, name: &str) -> bool {
        self.find(user, name).await.is_some()
    }

    /// All classification names for the user, in catalog order.
    pub async fn names(&self, user: UserId) -> Vec<String> {
        self.ensure_user(user).await;
        self.sets
            .read()
            .await
            .get(&user)
            .map(|set| set.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Add a classification to the user's set. Fails when a name collides
    /// case-insensitively.
    pub async fn insert(
        &self,
        user: UserId,
        classification: Classification,
    ) -> Result<(), ValidationError> {
        self.ensure_user(user).await;
        let mut sets = self.sets.write().await;
        let set = sets.entry(user).or_default();
        if set.iter().any(|c| c.name == classification.name) {
            return Err(ValidationError::DuplicateName {
                name: classification.name,
            });
        }
        tracing::debug!(user_id = %user, name = %classification.name, "classification added");
        set.push(classification);
        Ok(())
    }

    /// First classification whose keyword occurs in `text` (lowercased).
    /// Used when a draft is built from parsed input.
    pub async fn match_keywords(&self, user: UserId, text: &str) -> Option<Classification> {
        self.ensure_user(user).await;
        let haystack = text.to_lowercase();
        self.sets
            .read()
            .await
            .get(&user)
            .and_then(|set| {
                set.iter()
                    .find(|c| c.keywords.iter().any(|k| haystack.contains(k.as_str())))
            })
            .cloned()
    }

    /// A copy of the user's full set, for the surrounding glue to render or
    /// export.
    pub async fn snapshot(&self, user: UserId) -> Vec<Classification> {
        self.ensure_user(user).await;
        self.sets
            .read()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_parses() {
        let defaults = default_classifications().unwrap();
        assert!(defaults.len() >= 5);
        assert!(defaults.iter().any(|c| c.name == "food"));
        // The catch-all bucket carries no keywords.
        let misc = defaults.iter().find(|c| c.name == "miscellaneous").unwrap();
        assert!(misc.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let catalog = ClassificationCatalog::empty();
        catalog
            .insert(UserId(1), Classification::bare("Groceries"))
            .await
            .unwrap();

        assert!(catalog.contains(UserId(1), "groceries").await);
        assert!(catalog.contains(UserId(1), "GROCERIES").await);
        assert!(catalog.contains(UserId(1), "  Groceries ").await);
        assert!(!catalog.contains(UserId(2), "groceries").await);
    }

    #[tokio::test]
    async fn test_insert_rejects_case_insensitive_duplicate() {
        let catalog = ClassificationCatalog::empty();
        catalog
            .insert(UserId(1), Classification::bare("travel"))
            .await
            .unwrap();

        let err = catalog
            .insert(UserId(1), Classification::bare("Travel"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateName { .. }));
    }

    #[tokio::test]
    async fn test_defaults_seed_on_first_touch() {
        let catalog = ClassificationCatalog::with_default_set().unwrap();
        assert!(catalog.contains(UserId(9), "food").await);

        // Seeded sets are independent per user.
        catalog
            .insert(UserId(9), Classification::bare("hobby"))
            .await
            .unwrap();
        assert!(!catalog.contains(UserId(10), "hobby").await);
    }

    #[tokio::test]
    async fn test_keyword_match() {
        let catalog = ClassificationCatalog::empty();
        catalog
            .insert(
                UserId(1),
                Classification::new("transport", "🚗", vec!["uber".into(), "taxi".into()]),
            )
            .await
            .unwrap();
        catalog
            .insert(
                UserId(1),
                Classification::new("food", "🍽️", vec!["lunch".into()]),
            )
            .await
            .unwrap();

        let hit = catalog
            .match_keywords(UserId(1), "Uber ride to the airport")
            .await
            .unwrap();
        assert_eq!(hit.name, "transport");
        assert!(catalog.match_keywords(UserId(1), "rent payment").await.is_none());
    }
}
