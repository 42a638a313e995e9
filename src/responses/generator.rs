//! The reply backend consumed by the orchestrator.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::flow::{FormData, Step};

use super::service;

/// Produces assistant replies for user input.
///
/// The scripted implementation answers from static tables; a networked
/// backend can be slotted in behind the same trait.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Backend name, used in logs.
    fn name(&self) -> &str;

    /// Reply to `input` given the current step and form snapshot.
    async fn generate(
        &self,
        input: &str,
        step: Option<Step>,
        form_data: &FormData,
    ) -> Result<String, GenerationError>;
}

/// Answers from the scripted per-step reply tables. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedResponder;

impl ScriptedResponder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        input: &str,
        step: Option<Step>,
        form_data: &FormData,
    ) -> Result<String, GenerationError> {
        Ok(service::generate_response(input, step, form_data))
    }
}
