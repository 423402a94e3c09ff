//! Twilio REST client — places outbound calls.

use std::time::Duration;

use ringback_core::config::TelephonySettings;
use ringback_core::error::{Result, RingbackError};
use tracing::{error, info};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Every provider round-trip is bounded; a stalled upstream must not pin a
/// webhook request indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TwilioClient {
    settings: TelephonySettings,
    http: reqwest::Client,
    base_url: String,
}

/// The sliver of the call-creation reply we care about.
#[derive(serde::Deserialize)]
struct CallCreated {
    sid: String,
}

impl TwilioClient {
    pub fn new(settings: TelephonySettings) -> Self {
        Self::with_base_url(settings, TWILIO_API_BASE.to_string())
    }

    /// Point the client at a different API host. Tests use this to drive a
    /// local stub instead of Twilio.
    pub fn with_base_url(settings: TelephonySettings, base_url: String) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The number outbound calls originate from.
    pub fn from_number(&self) -> &str {
        &self.settings.from_number
    }

    /// Place an outbound call. The provider fetches `callback_url` when the
    /// call connects and executes the TwiML it returns.
    ///
    /// Returns the provider call sid.
    pub async fn place_call(&self, to: &str, callback_url: &str) -> Result<String> {
        let url = format!(
            "{}/Accounts/{}/Calls.json",
            self.base_url, self.settings.account_sid
        );

        let resp = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&[
                ("Url", callback_url),
                ("To", to),
                ("From", &self.settings.from_number),
            ])
            .send()
            .await
            .map_err(|e| RingbackError::Telephony(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(%status, body, "Twilio call creation failed");
            return Err(RingbackError::Telephony(format!(
                "Twilio API error {status}"
            )));
        }

        let created: CallCreated = resp
            .json()
            .await
            .map_err(|e| RingbackError::Telephony(e.to_string()))?;

        info!(call_sid = %created.sid, to, "Outbound call initiated");
        Ok(created.sid)
    }
}
