//! Handing the conversation over to the primary chat surface.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::{FormData, Step};

/// Tag recorded on every handoff written by the calculator assistant.
pub const COMPLETED_FLOW: &str = "calculator";

/// Context written for the primary chat surface to pick up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRecord {
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    pub from_step: Option<Step>,
    pub form_data: FormData,
    pub completed_flow: String,
}

impl HandoffRecord {
    pub fn new(summary: String, from_step: Option<Step>, form_data: FormData) -> Self {
        Self {
            timestamp: Utc::now(),
            summary,
            from_step,
            form_data,
            completed_flow: COMPLETED_FLOW.to_string(),
        }
    }
}

/// Address of the primary chat surface, carrying the session and a handoff flag.
pub fn handoff_destination(main_chat_path: &str, session_id: &str) -> String {
    format!(
        "{}?session={}&handoff=true",
        main_chat_path,
        urlencoding::encode(session_id)
    )
}

/// Path portion of an address, without query or fragment.
pub fn path_of(address: &str) -> &str {
    address
        .split(['?', '#'])
        .next()
        .unwrap_or(address)
}

/// Moves the user between surfaces.
pub trait Navigator: Send + Sync {
    /// Address currently displayed.
    fn current_path(&self) -> String;

    /// Go to another surface.
    fn navigate(&self, destination: &str);

    /// Apply a new address in place, without leaving the current surface.
    fn replace(&self, destination: &str);
}

/// How a navigation was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Navigate,
    Replace,
}

/// Navigator that only tracks addresses. Used by headless hosts and tests.
#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<MemoryNavigatorState>,
}

#[derive(Debug)]
struct MemoryNavigatorState {
    current: String,
    history: Vec<(NavigationKind, String)>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(MemoryNavigatorState {
                current: start.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Every navigation performed so far, oldest first.
    pub fn history(&self) -> Vec<(NavigationKind, String)> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryNavigatorState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, kind: NavigationKind, destination: &str) {
        let mut state = self.lock();
        state.current = destination.to_string();
        state.history.push((kind, destination.to_string()));
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.lock().current.clone()
    }

    fn navigate(&self, destination: &str) {
        self.record(NavigationKind::Navigate, destination);
    }

    fn replace(&self, destination: &str) {
        self.record(NavigationKind::Replace, destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_carries_session_and_flag() {
        assert_eq!(
            handoff_destination("/chat", "s1"),
            "/chat?session=s1&handoff=true"
        );
        assert_eq!(
            handoff_destination("/chat", "a b&c"),
            "/chat?session=a%20b%26c&handoff=true"
        );
    }

    #[test]
    fn path_strips_query_and_fragment() {
        assert_eq!(path_of("/chat?session=1"), "/chat");
        assert_eq!(path_of("/calculator#step-2"), "/calculator");
        assert_eq!(path_of("/chat"), "/chat");
    }

    #[test]
    fn record_wire_format() {
        let record = HandoffRecord::new(
            "summary".to_string(),
            Some(Step::Offer),
            FormData::new(serde_json::json!({"paymentAmount": 1000})),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fromStep"], "offer");
        assert_eq!(json["completedFlow"], COMPLETED_FLOW);
        assert_eq!(json["formData"]["paymentAmount"], 1000);
        assert!(json["timestamp"].is_string());

        let parsed: HandoffRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn memory_navigator_tracks_history() {
        let nav = MemoryNavigator::new("/calculator");
        assert_eq!(nav.current_path(), "/calculator");

        nav.navigate("/chat?session=s1&handoff=true");
        nav.replace("/chat?session=s1&handoff=true");
        assert_eq!(nav.current_path(), "/chat?session=s1&handoff=true");
        assert_eq!(
            nav.history(),
            vec![
                (NavigationKind::Navigate, "/chat?session=s1&handoff=true".to_string()),
                (NavigationKind::Replace, "/chat?session=s1&handoff=true".to_string()),
            ]
        );
    }
}
