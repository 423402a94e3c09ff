//! ElevenLabs text-to-speech client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

use ringback_core::config::SynthesisSettings;
use ringback_core::error::{Result, RingbackError};

use crate::SpeechSynthesizer;

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io";
const DEFAULT_MODEL: &str = "eleven_monolingual_v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ElevenLabsClient {
    settings: SynthesisSettings,
    http: reqwest::Client,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(settings: SynthesisSettings) -> Self {
        Self::with_base_url(settings, ELEVENLABS_API_BASE.to_string())
    }

    /// Point the client at a different API host. Tests use this to drive a
    /// local stub instead of ElevenLabs.
    pub fn with_base_url(settings: SynthesisSettings, base_url: String) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url, self.settings.voice_id
        );

        let resp = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.settings.api_key)
            .json(&json!({
                "text": text,
                "model_id": DEFAULT_MODEL,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.5,
                    "style": 0.5,
                    "use_speaker_boost": true,
                },
            }))
            .send()
            .await
            .map_err(|e| RingbackError::Synthesis(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(%status, body, "ElevenLabs API error");
            return Err(RingbackError::Synthesis(format!(
                "ElevenLabs API error {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RingbackError::Synthesis(e.to_string()))?;

        info!(
            voice = %self.settings.voice_id,
            size_kb = bytes.len() / 1024,
            "Synthesized audio"
        );
        Ok(bytes.to_vec())
    }
}
