//! Dialogue messages and the constructors that build them.

pub mod factory;
pub mod model;

pub use factory::{
    DEFAULT_ERROR_TEXT, HANDOFF_TEXT, create_assistant_message, create_bot_message,
    create_error_message, create_handoff_message, create_message, create_user_choice_message,
    create_user_message, create_welcome_message, is_bot_message, is_error_message,
    is_handoff_message, is_welcome_message,
};
pub use model::{Message, MessageMetadata, MessageType, Sender};
