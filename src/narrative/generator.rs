//! Core `NarrativeGenerator` trait and `ChatNarrator` implementation.
//!
//! `ChatNarrator` calls any OpenAI-compatible `/v1/chat/completions` endpoint.
//! Connection details come from [`NarrativeConfig`]; the key comes from
//! [`crate::config::Credentials`].

use async_trait::async_trait;

use crate::config::NarrativeConfig;
use crate::geocode::PlaceDescription;
use crate::narrative::prompt::build_messages;
use crate::narrative::{NarrativeError, NarrativeText};

// ---------------------------------------------------------------------------
// NarrativeGenerator trait
// ---------------------------------------------------------------------------

/// Produces one historical anecdote for a place.
///
/// Implementors must be `Send + Sync` so they can be held as
/// `Arc<dyn NarrativeGenerator>`.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, place: &PlaceDescription) -> Result<NarrativeText, NarrativeError>;
}

// ---------------------------------------------------------------------------
// ChatNarrator
// ---------------------------------------------------------------------------

/// Chat-completions client speaking the OpenAI wire format.
pub struct ChatNarrator {
    client: reqwest::Client,
    config: NarrativeConfig,
    api_key: Option<String>,
}

impl ChatNarrator {
    /// Build a `ChatNarrator` with the per-request timeout from `config`.
    pub fn from_config(config: &NarrativeConfig, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            api_key,
        }
    }

    /// JSON request body for `place`.
    pub fn request_body(&self, place: &PlaceDescription) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model":    self.config.model,
            "messages": build_messages(place),
        });
        if let Some(t) = self.config.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(n) = self.config.max_tokens {
            body["max_tokens"] = serde_json::json!(n);
        }
        body
    }
}

#[async_trait]
impl NarrativeGenerator for ChatNarrator {
    /// The `Authorization: Bearer …` header is attached only when an API key
    /// was supplied, so keyless local providers work too.
    async fn generate(&self, place: &PlaceDescription) -> Result<NarrativeText, NarrativeError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        log::debug!("narrative: POST {url} (model {})", self.config.model);

        let mut req = self.client.post(&url).json(&self.request_body(place));

        let key = self.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NarrativeError::Parse(e.to_string()))?;

        first_completion(&json)
    }
}

/// Pull `choices[0].message.content` out of a completion payload.
///
/// Missing choices, a missing content field, or blank content are all
/// [`NarrativeError::EmptyResponse`].
pub fn first_completion(json: &serde_json::Value) -> Result<NarrativeText, NarrativeError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .and_then(NarrativeText::new)
        .ok_or(NarrativeError::EmptyResponse)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
