//! Session-scoped persistence of the message list.
//!
//! Persistence is best-effort: write failures are logged and swallowed, read
//! failures come back as an empty history. The in-memory session state stays
//! authoritative either way.

use std::sync::Arc;

use tracing::{debug, warn};

use super::traits::KeyValueStore;
use crate::assistant::handoff::HandoffRecord;
use crate::chat::Message;

/// Default prefix for per-session message keys.
pub const DEFAULT_KEY_PREFIX: &str = "chatbot_messages_";

/// Default well-known key for the handoff record.
pub const DEFAULT_HANDOFF_KEY: &str = "chatbot_handoff";

/// Saves and loads a session's messages through a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    handoff_key: String,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_keys(store, DEFAULT_KEY_PREFIX, DEFAULT_HANDOFF_KEY)
    }

    pub fn with_keys(
        store: Arc<dyn KeyValueStore>,
        key_prefix: impl Into<String>,
        handoff_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            handoff_key: handoff_key.into(),
        }
    }

    /// Storage key for a session. Distinct session ids give distinct keys.
    pub fn storage_key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    /// Persist `messages` for `session_id`. Never fails.
    pub async fn save(&self, session_id: &str, messages: &[Message]) {
        let key = self.storage_key(session_id);
        let json = match serde_json::to_string(messages) {
            Ok(json) => json,
            Err(e) => {
                warn!(session_id, error = %e, "Failed to serialize messages");
                return;
            }
        };
        match self.store.set(&key, &json).await {
            Ok(()) => debug!(session_id, count = messages.len(), "Messages saved"),
            Err(e) => warn!(session_id, error = %e, "Failed to save messages"),
        }
    }

    /// Load the persisted messages for `session_id`; empty if none or unreadable.
    pub async fn load(&self, session_id: &str) -> Vec<Message> {
        let key = self.storage_key(session_id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to read stored messages");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => {
                debug!(session_id, count = messages.len(), "Messages loaded");
                messages
            }
            Err(e) => {
                warn!(session_id, error = %e, "Stored messages are unreadable, starting fresh");
                Vec::new()
            }
        }
    }

    /// Remove the stored entry. Clearing a missing entry is fine.
    pub async fn clear(&self, session_id: &str) {
        let key = self.storage_key(session_id);
        match self.store.remove(&key).await {
            Ok(removed) => debug!(session_id, removed, "Stored messages cleared"),
            Err(e) => warn!(session_id, error = %e, "Failed to clear stored messages"),
        }
    }

    pub async fn has_stored(&self, session_id: &str) -> bool {
        match self.store.get(&self.storage_key(session_id)).await {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to check stored messages");
                false
            }
        }
    }

    /// Write the handoff record, replacing any previous one. Returns whether
    /// the write succeeded.
    pub async fn save_handoff(&self, record: &HandoffRecord) -> bool {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize handoff record");
                return false;
            }
        };
        match self.store.set(&self.handoff_key, &json).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save handoff record");
                false
            }
        }
    }

    /// The last handoff record written, if any.
    pub async fn load_handoff(&self) -> Option<HandoffRecord> {
        let raw = match self.store.get(&self.handoff_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read handoff record");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!(error = %e, "Handoff record is unreadable"))
            .ok()
    }
}
