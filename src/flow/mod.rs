//! The calculator flow the assistant is embedded in.

pub mod form;
pub mod step;

pub use form::{FormData, LumpSum, format_currency};
pub use step::{Step, StepPosition};
