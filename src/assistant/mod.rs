//! The assistant session: state, delayed replies, handoff and the orchestrator
//! tying them together.

pub mod delay;
pub mod handoff;
pub mod orchestrator;
pub mod state;

pub use delay::{Delay, ImmediateDelay, TokioDelay};
pub use handoff::{
    COMPLETED_FLOW, HandoffRecord, MemoryNavigator, NavigationKind, Navigator, handoff_destination,
};
pub use orchestrator::{AssistantDeps, AssistantOrchestrator, PendingReply, SELF_TEST_ERROR_TEXT};
pub use state::{AssistantEvent, SessionState};
