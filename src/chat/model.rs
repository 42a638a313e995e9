//! Dialogue message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::{FormData, Step};

/// What kind of turn a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    /// A button/choice the user picked in the calculator.
    UserChoice,
    System,
}

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Optional tags attached to a message.
///
/// Flags default to `false` and are left out of the persisted form when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<FormData>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_welcome: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_bot_message: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_handoff: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub context_aware: bool,
    /// The literal choice for `user_choice` messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_data: Option<serde_json::Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl MessageMetadata {
    /// Metadata recording the step and form snapshot at creation time.
    pub fn for_context(step: Option<Step>, form_data: &FormData) -> Self {
        Self {
            step,
            form_data: (!form_data.is_empty()).then(|| form_data.clone()),
            ..Default::default()
        }
    }
}

/// One turn of dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub text: String,
    pub sender: Sender,
    /// Persisted as an RFC 3339 string.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}
