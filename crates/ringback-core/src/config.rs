//! Configuration loading and secret resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5002;
pub const DEFAULT_AUDIO_DIR: &str = "audio_files";

/// ElevenLabs "Rachel".
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Top-level Ringback configuration.
///
/// Loaded from a JSON5 file; every secret can also come from the
/// conventional environment variables, so a bare deployment with only
/// `TWILIO_*` / `ELEVENLABS_*` set in the environment needs no file at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephony: Option<TelephonyConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

/// Twilio credentials and the originating number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sid_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_number_env: Option<String>,
}

impl TelephonyConfig {
    pub fn resolve_account_sid(&self) -> Option<String> {
        resolve_secret_field(&self.account_sid, &self.account_sid_env)
            .or_else(|| env_non_empty("TWILIO_ACCOUNT_SID"))
    }

    pub fn resolve_auth_token(&self) -> Option<String> {
        resolve_secret_field(&self.auth_token, &self.auth_token_env)
            .or_else(|| env_non_empty("TWILIO_AUTH_TOKEN"))
    }

    pub fn resolve_from_number(&self) -> Option<String> {
        resolve_secret_field(&self.from_number, &self.from_number_env)
            .or_else(|| env_non_empty("TWILIO_PHONE_NUMBER"))
    }
}

/// ElevenLabs API key and voice selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

impl SynthesisConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
            .or_else(|| env_non_empty("ELEVENLABS_API_KEY"))
    }

    pub fn resolve_voice_id(&self) -> String {
        self.voice_id
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| env_non_empty("ELEVENLABS_VOICE_ID"))
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Externally reachable base URL (e.g. the tunnel hostname). When unset,
    /// callback and audio URLs are derived from each request's Host header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_dir: Option<String>,
}

/// Fully resolved Twilio settings. Present only when the account sid, auth
/// token, and originating number are all available.
#[derive(Debug, Clone)]
pub struct TelephonySettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Fully resolved ElevenLabs settings. Present only when an API key is
/// available; the voice id always has a default.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub api_key: String,
    pub voice_id: String,
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file is not an error: the defaults resolve everything from
    /// the conventional environment variables.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::RingbackError::Io)?;

        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::RingbackError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location: `ringback.json` in the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("ringback.json")
    }

    /// Resolve Twilio settings, or `None` when the relay runs without
    /// outbound calling.
    pub fn resolve_telephony(&self) -> Option<TelephonySettings> {
        let t = self.telephony.clone().unwrap_or_default();
        Some(TelephonySettings {
            account_sid: t.resolve_account_sid()?,
            auth_token: t.resolve_auth_token()?,
            from_number: t.resolve_from_number()?,
        })
    }

    /// Resolve ElevenLabs settings, or `None` when synthesis is unavailable
    /// and the relay falls back to provider text-to-speech.
    pub fn resolve_synthesis(&self) -> Option<SynthesisSettings> {
        let s = self.synthesis.clone().unwrap_or_default();
        Some(SynthesisSettings {
            api_key: s.resolve_api_key()?,
            voice_id: s.resolve_voice_id(),
        })
    }

    pub fn bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn public_url(&self) -> Option<String> {
        self.server
            .as_ref()
            .and_then(|s| s.public_url.clone())
            .map(|u| u.trim_end_matches('/').to_string())
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.server
            .as_ref()
            .and_then(|s| s.audio_dir.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_DIR))
    }
}
