//! Assistant response copy and the reply backend trait.

pub mod generator;
pub mod script;
pub mod service;

pub use generator::{ResponseGenerator, ScriptedResponder};
pub use service::{
    generate_response, handoff_summary, step_change_message, step_guidance, welcome_message,
};
