//! Domain model for the Outline Orchestration context.

pub mod commands;
pub mod parameters;
pub mod progression;
pub mod prompts;
pub mod session;
pub mod stages;
