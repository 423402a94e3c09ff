//! Speech synthesis: the ElevenLabs client behind the [`SpeechSynthesizer`]
//! seam, and the write-once audio store its output lands in.

pub mod audio_store;
pub mod elevenlabs;

use async_trait::async_trait;

use ringback_core::error::Result;

/// Text-to-speech provider seam.
///
/// Callers treat any `Err` as "synthesis unavailable" and fall back to the
/// telephony provider's own text-to-speech; nothing downstream retries.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into a playable audio byte stream (mp3).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
