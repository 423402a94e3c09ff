//! Relay integration tests — boot a real server and drive the webhook
//! surface over HTTP, with a local stub standing in for the Twilio API and
//! a stub synthesizer standing in for ElevenLabs.
//!
//! Run with: `cargo test -p ringback-server --test integration`

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::State;
use axum::{Form, Json};
use serde_json::json;

use ringback_core::call_state::{CallContext, CallStateStore};
use ringback_core::config::{Config, TelephonySettings};
use ringback_core::error::RingbackError;
use ringback_server::AppState;
use ringback_telephony::twilio::TwilioClient;
use ringback_tts::SpeechSynthesizer;
use ringback_tts::audio_store::AudioStore;

const STUB_AUDIO: &[u8] = b"ID3 stub audio";

/// Find an available port.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Synthesizer test double: records whether it was invoked and either
/// returns fixed bytes or fails like an unreachable provider.
struct StubSynthesizer {
    fail: bool,
    called: AtomicBool,
}

impl StubSynthesizer {
    fn working() -> Arc<Self> {
        Arc::new(Self { fail: false, called: AtomicBool::new(false) })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self { fail: true, called: AtomicBool::new(false) })
    }

    fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str) -> ringback_core::error::Result<Vec<u8>> {
        self.called.store(true, Ordering::SeqCst);
        if self.fail {
            Err(RingbackError::Synthesis("stub offline".into()))
        } else {
            Ok(STUB_AUDIO.to_vec())
        }
    }
}

type CapturedCalls = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn mock_calls_endpoint(
    State(captured): State<CapturedCalls>,
    Form(params): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    captured.lock().unwrap().push(params);
    Json(json!({ "sid": "CA123" }))
}

/// Start a stub Twilio API that records call-creation requests.
async fn start_mock_twilio() -> (u16, CapturedCalls) {
    let port = find_free_port();
    let captured: CapturedCalls = Arc::default();

    let app = axum::Router::new()
        .route(
            "/2010-04-01/Accounts/{sid}/Calls.json",
            axum::routing::post(mock_calls_endpoint),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
        .await
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (port, captured)
}

fn test_twilio_client(mock_port: u16) -> Arc<TwilioClient> {
    Arc::new(TwilioClient::with_base_url(
        TelephonySettings {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from_number: "+15550000000".into(),
        },
        format!("http://127.0.0.1:{mock_port}"),
    ))
}

/// Build a relay with the given collaborators and serve it on a free port.
async fn start_test_relay(
    telephony: Option<Arc<TwilioClient>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
) -> (Arc<AppState>, u16) {
    let port = find_free_port();

    let audio = AudioStore::new(std::env::temp_dir().join(format!("ringback-test-{port}")))
        .unwrap();

    let state = Arc::new(AppState {
        config: Arc::new(Config::default()),
        calls: CallStateStore::new(),
        telephony,
        synthesizer,
        audio,
    });

    let state_clone = state.clone();
    tokio::spawn(async move {
        let _ = ringback_server::start_server(state_clone, port).await;
    });

    // Wait for the relay to be ready
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if reqwest::get(format!("http://127.0.0.1:{port}/")).await.is_ok() {
            break;
        }
    }

    (state, port)
}

fn extract_between<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = haystack.find(start)? + start.len();
    let to = haystack[from..].find(end)? + from;
    Some(&haystack[from..to])
}

fn insert_context(state: &AppState, text: &str) -> String {
    let call_id = CallStateStore::mint_call_id();
    state.calls.insert(CallContext {
        call_id: call_id.clone(),
        text: text.into(),
        origin_number: "+15551234567".into(),
        destination_number: "+15550000000".into(),
        message_sid: "SM123".into(),
        created_at: chrono::Utc::now(),
    });
    call_id
}

#[tokio::test]
async fn test_liveness_probe() {
    let (_state, port) = start_test_relay(None, None).await;

    let resp = reqwest::get(format!("http://127.0.0.1:{port}/"))
        .await
        .expect("Liveness request failed");
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_sms_webhook_without_telephony() {
    let (state, port) = start_test_relay(None, None).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook/sms"))
        .form(&[
            ("MessageSid", "SM1"),
            ("From", "+15551234567"),
            ("To", "+15550000000"),
            ("Body", "Hello there"),
        ])
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let body = resp.text().await.unwrap();
    assert!(body.contains("Twilio calling is not configured"));
    assert!(body.contains("Hello there"));
    assert!(state.calls.is_empty());
}

/// The full handoff: inbound SMS → stored context → outbound call against
/// the stub Twilio → greeting with synthesis down (provider-voice fallback)
/// → digit 2 → special message and the context is gone.
#[tokio::test]
async fn test_end_to_end_relay_flow() {
    let (twilio_port, captured) = start_mock_twilio().await;
    let synth = StubSynthesizer::offline();
    let (state, port) =
        start_test_relay(Some(test_twilio_client(twilio_port)), Some(synth.clone() as Arc<dyn SpeechSynthesizer>)).await;

    // Inbound SMS
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook/sms"))
        .form(&[
            ("MessageSid", "SM1"),
            ("From", "+15551234567"),
            ("To", "+15550000000"),
            ("Body", "Hello there"),
        ])
        .send()
        .await
        .unwrap();
    let ack = resp.text().await.unwrap();
    assert!(ack.contains("Call SID: CA123"), "ack was: {ack}");

    // The provider was asked to call the sender back, from our number.
    let call_params = captured.lock().unwrap().last().cloned().unwrap();
    assert_eq!(call_params["To"], "+15551234567");
    assert_eq!(call_params["From"], "+15550000000");
    let callback_url = call_params["Url"].clone();
    let call_id = callback_url
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();
    assert!(callback_url.contains("/webhook/voice/call/"));

    // The stored context matches the message.
    let context = state.calls.get(&call_id).expect("context stored");
    assert_eq!(context.text, "Hello there");
    assert_eq!(context.origin_number, "+15551234567");

    // Greeting webhook: synthesis is down, so the text is spoken via the
    // provider voice and the menu is still presented.
    let greeting = reqwest::get(&callback_url).await.unwrap().text().await.unwrap();
    assert!(synth.was_called());
    assert!(greeting.contains(r#"<Say voice="Polly.Emma">"#));
    assert!(greeting.contains("Hello there"));
    assert!(!greeting.contains("<Play>"));
    assert!(greeting.contains(r#"numDigits="1""#));
    assert!(greeting.contains(r#"timeout="10""#));
    assert!(greeting.contains(&format!("/webhook/voice/input/{call_id}")));

    // Digit 2: two-part special message, then hangup and cleanup.
    let input = reqwest::Client::new()
        .post(format!(
            "http://127.0.0.1:{port}/webhook/voice/input/{call_id}"
        ))
        .form(&[("Digits", "2")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(input.contains("Thanks for picking up the phone dude!"));
    assert!(input.contains("Have a great day!"));
    assert!(input.contains("<Hangup/>"));
    assert!(state.calls.get(&call_id).is_none());
}

#[tokio::test]
async fn test_greeting_unknown_call_id_skips_synthesis() {
    let synth = StubSynthesizer::working();
    let (state, port) = start_test_relay(None, Some(synth.clone() as Arc<dyn SpeechSynthesizer>)).await;

    let body = reqwest::get(format!(
        "http://127.0.0.1:{port}/webhook/voice/call/no-such-id"
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();

    assert!(body.contains("Sorry, there was an error processing your call."));
    assert!(body.contains("<Hangup/>"));
    assert!(!synth.was_called());
    assert!(state.calls.is_empty());
}

#[tokio::test]
async fn test_digit_decision_table() {
    let (state, port) = start_test_relay(None, None).await;
    let client = reqwest::Client::new();

    // Digit 1: goodbye.
    let call_id = insert_context(&state, "hi");
    let body = client
        .post(format!(
            "http://127.0.0.1:{port}/webhook/voice/input/{call_id}"
        ))
        .form(&[("Digits", "1")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Goodbye!"));
    assert!(body.contains("<Hangup/>"));
    assert!(state.calls.get(&call_id).is_none());

    // Unrecognized digit: invalid option.
    let call_id = insert_context(&state, "hi");
    let body = client
        .post(format!(
            "http://127.0.0.1:{port}/webhook/voice/input/{call_id}"
        ))
        .form(&[("Digits", "9")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Invalid option. Goodbye!"));
    assert!(state.calls.get(&call_id).is_none());

    // No digits at all: also the invalid branch, also consumed.
    let call_id = insert_context(&state, "hi");
    let body = client
        .post(format!(
            "http://127.0.0.1:{port}/webhook/voice/input/{call_id}"
        ))
        .form(&Vec::<(String, String)>::new())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Invalid option. Goodbye!"));
    assert!(state.calls.get(&call_id).is_none());

    // Digits on the query string (GET variant).
    let call_id = insert_context(&state, "hi");
    let body = reqwest::get(format!(
        "http://127.0.0.1:{port}/webhook/voice/input/{call_id}?Digits=1"
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();
    assert!(body.contains("Goodbye!"));
    assert!(state.calls.get(&call_id).is_none());
}

#[tokio::test]
async fn test_synthesized_audio_is_played_and_served() {
    let synth = StubSynthesizer::working();
    let (state, port) = start_test_relay(None, Some(synth.clone() as Arc<dyn SpeechSynthesizer>)).await;

    let call_id = insert_context(&state, "Read me aloud");
    let greeting = reqwest::get(format!(
        "http://127.0.0.1:{port}/webhook/voice/call/{call_id}"
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();

    let audio_url = extract_between(&greeting, "<Play>", "</Play>")
        .expect("greeting should play synthesized audio")
        .to_string();
    assert!(audio_url.contains("/audio/"));
    assert!(audio_url.ends_with(".mp3"));

    // The synthesized file is actually reachable at the advertised URL.
    let audio = reqwest::get(&audio_url).await.unwrap();
    assert!(audio.status().is_success());
    assert_eq!(audio.bytes().await.unwrap().as_ref(), STUB_AUDIO);

    // Greeting is read-only: the context survives until the digit pass.
    assert!(state.calls.get(&call_id).is_some());
}

#[tokio::test]
async fn test_call_send_rejects_malformed_number() {
    let (twilio_port, captured) = start_mock_twilio().await;
    let (state, port) = start_test_relay(Some(test_twilio_client(twilio_port)), None).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/call/send"))
        .json(&json!({ "message": "hi", "phone_number": "5551234567" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert!(state.calls.is_empty());
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_call_send_without_telephony_is_config_error() {
    let (state, port) = start_test_relay(None, None).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/call/send"))
        .json(&json!({ "message": "hi", "phone_number": "+15551234567" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not configured"));
    assert!(state.calls.is_empty());
}

#[tokio::test]
async fn test_call_send_success() {
    let (twilio_port, _captured) = start_mock_twilio().await;
    let (state, port) = start_test_relay(Some(test_twilio_client(twilio_port)), None).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/call/send"))
        .json(&json!({ "message": "hi there", "phone_number": "+15551234567" }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["call_sid"], "CA123");
    assert_eq!(body["to"], "+15551234567");

    // The context stays parked until the voice leg consumes it.
    let call_id = body["call_id"].as_str().unwrap();
    let context = state.calls.get(call_id).expect("context stored");
    assert_eq!(context.text, "hi there");
}

#[tokio::test]
async fn test_status_webhook_replies_empty() {
    let (_state, port) = start_test_relay(None, None).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook/sms/status"))
        .form(&[("MessageSid", "SM1"), ("MessageStatus", "delivered")])
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_fallback_greeting() {
    let (_state, port) = start_test_relay(None, None).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/webhook/voice"))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let body = resp.text().await.unwrap();
    assert!(body.contains("Hello! This is a voice webhook response."));
}
