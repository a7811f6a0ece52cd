//! Application services for the Outline Orchestration context.

pub mod command_handlers;
pub mod orchestrator;
pub mod query_handlers;
