//! Voice webhooks: the greeting + IVR menu and the digit handler.

use std::sync::Arc;

use axum::Form;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use tracing::{error, info};

use ringback_core::error::Result;
use ringback_telephony::twiml::{Gather, IVR_VOICE, VoiceResponse, prosody};

use crate::routes::xml_response;
use crate::state::AppState;

/// `POST /webhook/voice` — generic fallback for voice webhooks that are not
/// tied to a relayed call.
pub async fn voice_fallback() -> Response {
    let xml = VoiceResponse::new()
        .say("Hello! This is a voice webhook response.", "alice")
        .to_xml();
    xml_response(xml)
}

/// `GET|POST /webhook/voice/call/{call_id}` — first contact for an outbound
/// call: look up the stored text, synthesize or fall back to provider
/// text-to-speech, then present the IVR menu.
pub async fn voice_call_webhook(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let xml = greeting(&state, &headers, &call_id).await.unwrap_or_else(|e| {
        error!(error = %e, call_id, "Voice call webhook failed");
        VoiceResponse::new()
            .say("Sorry, there was an error. Goodbye!", IVR_VOICE)
            .hangup()
            .to_xml()
    });
    xml_response(xml)
}

async fn greeting(state: &AppState, headers: &HeaderMap, call_id: &str) -> Result<String> {
    let Some(context) = state.calls.get(call_id) else {
        // Unknown or already-consumed id: terminal, and synthesis is never
        // attempted for it.
        error!(call_id, "Call context not found");
        return Ok(VoiceResponse::new()
            .say("Sorry, there was an error processing your call.", IVR_VOICE)
            .hangup()
            .to_xml());
    };

    let base_url = state.base_url(headers);

    // Prefer synthesized audio; the provider voice fallback changes the
    // engine, not the content or the menu.
    let response = match state.synthesize_to_url(&base_url, &context.text).await {
        Some(audio_url) => VoiceResponse::new().play(audio_url).pause(1),
        None => VoiceResponse::new()
            .say_ssml(prosody(&context.text), IVR_VOICE)
            .pause(1),
    };

    let menu = Gather::new(1, 10, format!("/webhook/voice/input/{call_id}")).say_ssml(
        prosody("Press 1 to end the call, or press 2 for a special message."),
        IVR_VOICE,
    );

    // No digit before the gather times out: terminal, no loop back.
    Ok(response
        .gather(menu)
        .say_ssml(prosody("I didn't receive any input. Goodbye!"), IVR_VOICE)
        .hangup()
        .to_xml())
}

#[derive(Debug, Default, Deserialize)]
pub struct DigitsParams {
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
}

/// `GET /webhook/voice/input/{call_id}` — digits arrive as a query param.
pub async fn voice_input_get(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
    Query(params): Query<DigitsParams>,
) -> Response {
    handle_input(&state, &call_id, params.digits)
}

/// `POST /webhook/voice/input/{call_id}` — digits arrive as a form field.
pub async fn voice_input_post(
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
    Form(params): Form<DigitsParams>,
) -> Response {
    handle_input(&state, &call_id, params.digits)
}

/// The decision table is exhaustive: 1 and 2 have dedicated responses and
/// everything else — including no input at all — is the invalid branch.
/// Every branch ends the call; none returns to the menu.
fn handle_input(state: &AppState, call_id: &str, digits: Option<String>) -> Response {
    let digits = digits.unwrap_or_default();
    info!(call_id, digits, "IVR input received");

    let response = match digits.as_str() {
        "1" => VoiceResponse::new()
            .say_ssml(prosody("Goodbye!"), IVR_VOICE)
            .hangup(),
        "2" => VoiceResponse::new()
            .say_ssml(prosody("Thanks for picking up the phone dude!"), IVR_VOICE)
            .pause(1)
            .say_ssml(prosody("Have a great day!"), IVR_VOICE)
            .hangup(),
        _ => VoiceResponse::new()
            .say_ssml(prosody("Invalid option. Goodbye!"), IVR_VOICE)
            .hangup(),
    };

    // The context is consumed unconditionally once a digit-handling pass
    // completes, whatever the digit was.
    state.calls.remove(call_id);

    xml_response(response.to_xml())
}
