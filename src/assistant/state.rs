//! Per-session assistant state and the change events the UI renders from.

use serde::Serialize;

use super::handoff::{HandoffRecord, NavigationKind};
use crate::chat::Message;
use crate::flow::{FormData, Step};

/// Live state of one conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Whether the assistant panel is visible.
    pub is_open: bool,
    /// Insertion-ordered; only ever appended to or cleared.
    pub messages: Vec<Message>,
    /// True while at least one reply is being produced.
    pub is_typing: bool,
    pub current_step: Option<Step>,
    pub form_data: FormData,
    pub session_id: String,
    #[serde(skip)]
    pub(crate) pending_replies: usize,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            is_open: false,
            messages,
            is_typing: false,
            current_step: None,
            form_data: FormData::default(),
            session_id: session_id.into(),
            pending_replies: 0,
        }
    }

    /// Mark one more reply as in flight.
    pub(crate) fn begin_reply(&mut self) {
        self.pending_replies += 1;
        self.is_typing = true;
    }

    /// Mark a reply as finished. Typing stops once none are left.
    pub(crate) fn end_reply(&mut self) {
        self.pending_replies = self.pending_replies.saturating_sub(1);
        self.is_typing = self.pending_replies > 0;
    }
}

/// Something about the session changed.
#[derive(Debug, Clone)]
pub enum AssistantEvent {
    MessageAdded(Message),
    TypingChanged(bool),
    PanelToggled(bool),
    StepChanged(Option<Step>),
    FormUpdated,
    MessagesCleared,
    HandoffStarted(HandoffRecord),
    Navigated {
        destination: String,
        kind: NavigationKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_tracks_in_flight_replies() {
        let mut state = SessionState::new("s1", Vec::new());
        assert!(!state.is_typing);

        state.begin_reply();
        state.begin_reply();
        assert!(state.is_typing);

        state.end_reply();
        assert!(state.is_typing);
        state.end_reply();
        assert!(!state.is_typing);

        // Extra ends never underflow
        state.end_reply();
        assert!(!state.is_typing);
        assert_eq!(state.pending_replies, 0);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let state = SessionState::new("s1", Vec::new());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["isOpen"], false);
        assert!(json["currentStep"].is_null());
        assert!(json.get("pendingReplies").is_none());
    }
}
