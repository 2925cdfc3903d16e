//! Generative-text category resolver
//!
//! HTTP-backed implementation of [`CategoryResolver`] that asks a
//! generative-language endpoint whether a free-text label maps onto one of
//! the user's existing classification names. The model is instructed to
//! reply with exactly one existing name, or the literal `NEW_CATEGORY`;
//! anything unrecognized is treated as a decline.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::CategoryResolver;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT_SECS: u64 = 20;

pub struct GenerativeResolver {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GenerativeResolver {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("building HTTP client for generative resolver")?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point the resolver at a different endpoint (test servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn prompt(candidate: &str, existing: &[String]) -> String {
        format!(
            "The user entered '{candidate}' as an expense category. Their existing \
             categories are: [{}]. If one of the existing categories is a very close \
             match, respond with ONLY that category name in lowercase. Otherwise \
             respond with ONLY the word NEW_CATEGORY.",
            existing.join(", ")
        )
    }

    /// Map a raw model reply onto an existing name, or decline.
    fn interpret(answer: &str, existing: &[String]) -> Option<String> {
        let answer = answer.trim().trim_matches('"').to_lowercase();
        if answer.is_empty() || answer == "new_category" {
            return None;
        }
        existing
            .iter()
            .find(|name| name.to_lowercase() == answer)
            .cloned()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("sending generate request")?
            .error_for_status()
            .context("generate request rejected")?;

        let payload: serde_json::Value =
            response.json().await.context("decoding generate response")?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .context("response carried no text part")?;
        Ok(text.to_string())
    }
}

#[async_trait]
impl CategoryResolver for GenerativeResolver {
    async fn suggest(
        &self,
        candidate: &str,
        existing: &[String],
    ) -> Result<Option<String>> {
        if existing.is_empty() {
            return Ok(None);
        }
        let answer = self.generate(&Self::prompt(candidate, existing)).await?;
        Ok(Self::interpret(&answer, existing))
    }
}
