//! Shared relay state, built once from config and handed to every handler.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{error, warn};

use ringback_core::call_state::{CallContext, CallStateStore};
use ringback_core::config::Config;
use ringback_core::error::{Result, RingbackError};
use ringback_telephony::twilio::TwilioClient;
use ringback_tts::SpeechSynthesizer;
use ringback_tts::audio_store::AudioStore;
use ringback_tts::elevenlabs::ElevenLabsClient;

/// Shared state accessible from all in-flight requests.
///
/// Configuration gaps are decided here, once: a missing credential leaves
/// the corresponding field `None` and the feature permanently unavailable
/// for the process — handlers fall back instead of retrying.
pub struct AppState {
    pub config: Arc<Config>,
    pub calls: CallStateStore,
    pub telephony: Option<Arc<TwilioClient>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub audio: AudioStore,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self> {
        let telephony = match config.resolve_telephony() {
            Some(settings) => Some(Arc::new(TwilioClient::new(settings))),
            None => {
                warn!(
                    "Twilio credentials not found. Set TWILIO_ACCOUNT_SID, \
                     TWILIO_AUTH_TOKEN, and TWILIO_PHONE_NUMBER to enable outbound calls."
                );
                None
            }
        };

        let synthesizer: Option<Arc<dyn SpeechSynthesizer>> = match config.resolve_synthesis() {
            Some(settings) => Some(Arc::new(ElevenLabsClient::new(settings))),
            None => {
                warn!("ElevenLabs API key not found; using provider text-to-speech only.");
                None
            }
        };

        let audio = AudioStore::new(config.audio_dir())?;

        Ok(Self {
            config: Arc::new(config),
            calls: CallStateStore::new(),
            telephony,
            synthesizer,
            audio,
        })
    }

    /// Base URL for callback and audio URLs: the configured `public_url`
    /// when set, otherwise derived from the request's Host header.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = self.config.public_url() {
            return url;
        }
        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{host}")
    }

    /// Ask the telephony collaborator to place the outbound call for a
    /// stored context. The callback URL carries only the call id; the
    /// greeting webhook reads everything else back out of the store.
    pub async fn place_relay_call(&self, base_url: &str, context: &CallContext) -> Result<String> {
        let telephony = self.telephony.as_ref().ok_or_else(|| {
            RingbackError::Config("telephony is not configured".to_string())
        })?;
        let callback_url = format!("{base_url}/webhook/voice/call/{}", context.call_id);
        telephony
            .place_call(&context.origin_number, &callback_url)
            .await
    }

    /// Synthesize `text` and expose it at a public URL, or `None` when
    /// synthesis is unavailable or failed — the caller then falls back to
    /// the telephony provider's own text-to-speech.
    pub async fn synthesize_to_url(&self, base_url: &str, text: &str) -> Option<String> {
        let synthesizer = self.synthesizer.as_ref()?;
        let bytes = match synthesizer.synthesize(text).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Synthesis failed; falling back to provider voice");
                return None;
            }
        };
        match self.audio.save(&bytes).await {
            Ok(filename) => Some(self.audio.public_url(base_url, &filename)),
            Err(e) => {
                error!(error = %e, "Failed to persist synthesized audio");
                None
            }
        }
    }
}
