//! Settlement Assist: conversational helper for the structured-settlement calculator.

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod flow;
pub mod responses;
pub mod store;
