//! `SpeechSynthesizer` trait and the OpenAI-compatible speech client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::SpeechConfig;
use crate::narrative::NarrativeText;
use crate::speech::SynthesisError;

/// Turns anecdote text into a complete, encoded audio clip.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &NarrativeText) -> Result<Vec<u8>, SynthesisError>;
}

/// `/v1/audio/speech` request body.
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint and returns the raw
/// audio payload.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    config: SpeechConfig,
    api_key: Option<String>,
}

impl OpenAiSpeech {
    pub fn from_config(config: &SpeechConfig, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            api_key,
        }
    }

    fn speech_url(&self) -> String {
        format!(
            "{}/v1/audio/speech",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &NarrativeText) -> Result<Vec<u8>, SynthesisError> {
        let request = SpeechRequest {
            model: &self.config.model,
            voice: &self.config.voice,
            input: text.as_str(),
            response_format: &self.config.response_format,
        };

        log::debug!(
            "speech: POST {} (model {}, voice {}, {} chars)",
            self.speech_url(),
            request.model,
            request.voice,
            request.input.len()
        );

        let mut req = self.client.post(self.speech_url()).json(&request);
        let key = self.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        log::info!("speech: received {} bytes of audio", audio.len());
        Ok(audio)
    }
}
