//! Transient call-state handoff storage.
//!
//! The voice-call webhook round-trip cannot carry arbitrary payloads — only
//! the call id travels in the callback URL — so the text to speak and the
//! numbers involved are parked here between placing the call and the final
//! IVR keypress. An entry lives from call placement until the first
//! completed digit-handling pass. A call that never reaches the digit
//! webhook (abandoned, never answered) leaks its entry for the life of the
//! process; the relay is single-process and in-memory by scope, so there is
//! no reaper.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Payload for one pending or in-progress outbound call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallContext {
    /// Opaque unique token minted at call-placement time.
    pub call_id: String,
    /// Text spoken back to the caller.
    pub text: String,
    /// Number the call is placed to (the original sender).
    pub origin_number: String,
    /// Number the inbound message was addressed to.
    pub destination_number: String,
    /// Originating message sid, kept for traceability only.
    pub message_sid: String,
    pub created_at: DateTime<Utc>,
}

/// Process-wide mapping from call id to [`CallContext`].
///
/// One coarse lock over a plain map: contention is low and every operation
/// is O(1), and nothing awaits while holding it. Handlers receive the store
/// by shared reference and never retain entries across requests.
#[derive(Default)]
pub struct CallStateStore {
    inner: Mutex<HashMap<String, CallContext>>,
}

impl CallStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh call id.
    pub fn mint_call_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Insert unconditionally — ids are generator-unique, so there is no
    /// collision policy.
    pub fn insert(&self, context: CallContext) {
        let mut map = self.inner.lock().expect("call state lock poisoned");
        debug!(call_id = %context.call_id, "Stored call context");
        map.insert(context.call_id.clone(), context);
    }

    pub fn get(&self, call_id: &str) -> Option<CallContext> {
        let map = self.inner.lock().expect("call state lock poisoned");
        map.get(call_id).cloned()
    }

    /// Remove if present; a miss is a no-op (already consumed or unknown).
    pub fn remove(&self, call_id: &str) {
        let mut map = self.inner.lock().expect("call state lock poisoned");
        if map.remove(call_id).is_some() {
            debug!(call_id, "Removed call context");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("call state lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
