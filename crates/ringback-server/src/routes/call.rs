//! Direct call API — initiate an outbound call without an inbound SMS.
//!
//! Unlike the webhook surface this path returns structured JSON and uses
//! transport-level status codes: 400 for a malformed destination number,
//! 500 for missing configuration or a provider failure.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use ringback_core::call_state::{CallContext, CallStateStore};
use ringback_telephony::number::is_e164;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendCallRequest {
    pub message: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct SendCallResponse {
    pub call_id: String,
    pub call_sid: String,
    pub to: String,
}

/// `POST /call/send`
pub async fn send_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendCallRequest>,
) -> Response {
    if !is_e164(&req.phone_number) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "phone_number must be in E.164 form, e.g. +15551234567"
            })),
        )
            .into_response();
    }

    let Some(telephony) = state.telephony.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "telephony is not configured: set TWILIO_ACCOUNT_SID, \
                          TWILIO_AUTH_TOKEN, and TWILIO_PHONE_NUMBER"
            })),
        )
            .into_response();
    };

    let context = CallContext {
        call_id: CallStateStore::mint_call_id(),
        text: req.message,
        origin_number: req.phone_number.clone(),
        destination_number: telephony.from_number().to_string(),
        message_sid: "api".to_string(),
        created_at: chrono::Utc::now(),
    };
    state.calls.insert(context.clone());

    let base_url = state.base_url(&headers);
    match state.place_relay_call(&base_url, &context).await {
        Ok(call_sid) => Json(SendCallResponse {
            call_id: context.call_id,
            call_sid,
            to: req.phone_number,
        })
        .into_response(),
        Err(e) => {
            // This path reports the failure to the caller instead of
            // degrading, so the entry must not linger.
            state.calls.remove(&context.call_id);
            error!(error = %e, to = %req.phone_number, "Direct call placement failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
