//! Message constructors and predicates.
//!
//! Every message in a session is built here so ids and timestamps are
//! assigned in one place. Nothing in this module can fail.

use chrono::Utc;
use uuid::Uuid;

use super::model::{Message, MessageMetadata, MessageType, Sender};
use crate::flow::{FormData, Step};
use crate::responses;

/// Copy used when an error message is added without text.
pub const DEFAULT_ERROR_TEXT: &str =
    "Sorry, I ran into a problem answering that. Please try again in a moment.";

/// Farewell shown when the conversation moves to the main chat.
pub const HANDOFF_TEXT: &str = "I'm connecting you with our main chat now. \
Everything we've covered so far comes with you, so you won't need to start over.";

/// Build a message with a fresh id and the current time.
pub fn create_message(
    text: impl Into<String>,
    message_type: MessageType,
    sender: Sender,
    metadata: MessageMetadata,
) -> Message {
    Message {
        id: Uuid::new_v4().to_string(),
        message_type,
        text: text.into(),
        sender,
        timestamp: Utc::now(),
        metadata,
    }
}

pub fn create_user_message(text: impl Into<String>, metadata: MessageMetadata) -> Message {
    create_message(text, MessageType::Text, Sender::User, metadata)
}

pub fn create_assistant_message(text: impl Into<String>, metadata: MessageMetadata) -> Message {
    create_message(text, MessageType::Text, Sender::Assistant, metadata)
}

/// An assistant-side notification that did not come from the response backend.
pub fn create_bot_message(text: impl Into<String>, metadata: MessageMetadata) -> Message {
    let metadata = MessageMetadata {
        is_bot_message: true,
        ..metadata
    };
    create_message(text, MessageType::Text, Sender::Assistant, metadata)
}

/// An assistant message flagged as an error. `None` uses [`DEFAULT_ERROR_TEXT`].
pub fn create_error_message(text: Option<&str>, metadata: MessageMetadata) -> Message {
    let metadata = MessageMetadata {
        is_error: true,
        ..metadata
    };
    create_message(
        text.unwrap_or(DEFAULT_ERROR_TEXT),
        MessageType::Text,
        Sender::Assistant,
        metadata,
    )
}

/// The greeting for `step`, or `None` when that step has no greeting.
pub fn create_welcome_message(step: Step, form_data: &FormData) -> Option<Message> {
    let text = responses::welcome_message(Some(step), form_data);
    if text.is_empty() {
        return None;
    }
    let metadata = MessageMetadata {
        is_welcome: true,
        ..MessageMetadata::for_context(Some(step), form_data)
    };
    Some(create_message(
        text,
        MessageType::Text,
        Sender::Assistant,
        metadata,
    ))
}

pub fn create_handoff_message(metadata: MessageMetadata) -> Message {
    let metadata = MessageMetadata {
        is_handoff: true,
        ..metadata
    };
    create_message(HANDOFF_TEXT, MessageType::Text, Sender::Assistant, metadata)
}

/// Record a choice the user made in the calculator, echoed as `Selected: <choice>`.
pub fn create_user_choice_message(
    choice: &str,
    step: Option<Step>,
    calculation_data: Option<serde_json::Value>,
) -> Message {
    let metadata = MessageMetadata {
        step,
        choice: Some(choice.to_string()),
        calculation_data,
        ..Default::default()
    };
    create_message(
        format!("Selected: {choice}"),
        MessageType::UserChoice,
        Sender::User,
        metadata,
    )
}

pub fn is_welcome_message(message: &Message) -> bool {
    message.metadata.is_welcome
}

pub fn is_error_message(message: &Message) -> bool {
    message.metadata.is_error
}

pub fn is_bot_message(message: &Message) -> bool {
    message.metadata.is_bot_message
}

pub fn is_handoff_message(message: &Message) -> bool {
    message.metadata.is_handoff
}
