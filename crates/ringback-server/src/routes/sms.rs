//! Inbound SMS webhooks.

use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use tracing::{error, info, warn};

use ringback_core::call_state::{CallContext, CallStateStore};
use ringback_core::error::Result;
use ringback_telephony::twiml::MessagingResponse;

use crate::routes::xml_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsWebhookForm {
    pub message_sid: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub num_media: Option<String>,
    pub media_url0: Option<String>,
    pub media_content_type0: Option<String>,
}

/// `POST /webhook/sms` — an inbound message event.
///
/// Stores the message text under a fresh call id, places a call back to the
/// sender with a callback URL carrying that id, and acknowledges by SMS.
pub async fn sms_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SmsWebhookForm>,
) -> Response {
    let xml = handle_sms(&state, &headers, &form).await.unwrap_or_else(|e| {
        error!(error = %e, message_sid = %form.message_sid, "SMS webhook failed");
        MessagingResponse::empty().to_xml()
    });
    xml_response(xml)
}

async fn handle_sms(state: &AppState, headers: &HeaderMap, form: &SmsWebhookForm) -> Result<String> {
    info!(
        from = %form.from,
        to = %form.to,
        message_sid = %form.message_sid,
        body = %form.body,
        "Received SMS"
    );

    if let Some(num) = form.num_media.as_deref().and_then(|n| n.parse::<u32>().ok()) {
        if num > 0 {
            // Media is logged only, never processed.
            info!(
                url = form.media_url0.as_deref().unwrap_or(""),
                content_type = form.media_content_type0.as_deref().unwrap_or(""),
                "Media attached"
            );
        }
    }

    if state.telephony.is_none() {
        warn!("Telephony not configured; cannot place outbound call");
        let reply = MessagingResponse::new().message(&format!(
            "Received your message: '{}'. Twilio calling is not configured.",
            form.body
        ));
        return Ok(reply.to_xml());
    }

    let context = CallContext {
        call_id: CallStateStore::mint_call_id(),
        text: form.body.clone(),
        origin_number: form.from.clone(),
        destination_number: form.to.clone(),
        message_sid: form.message_sid.clone(),
        created_at: chrono::Utc::now(),
    };
    state.calls.insert(context.clone());

    let base_url = state.base_url(headers);
    let reply = match state.place_relay_call(&base_url, &context).await {
        Ok(call_sid) => {
            info!(call_sid, call_id = %context.call_id, to = %form.from, "Calling sender back");
            MessagingResponse::new().message(&format!(
                "Thanks for your message! I'm calling you now to read it back. Call SID: {call_sid}"
            ))
        }
        Err(e) => {
            error!(error = %e, "Error making outbound call");
            MessagingResponse::new().message(&format!(
                "Received your message: '{}'. Sorry, I couldn't call you back due to an error.",
                form.body
            ))
        }
    };

    Ok(reply.to_xml())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsStatusForm {
    pub message_sid: String,
    pub message_status: String,
    pub to: Option<String>,
    pub from: Option<String>,
}

/// `POST /webhook/sms/status` — delivery status updates. Logged only;
/// always replies with an empty body.
pub async fn sms_status_webhook(Form(form): Form<SmsStatusForm>) -> &'static str {
    info!(
        message_sid = %form.message_sid,
        status = %form.message_status,
        from = form.from.as_deref().unwrap_or(""),
        to = form.to.as_deref().unwrap_or(""),
        "SMS status update"
    );
    ""
}
