//! OdysseyMaker: Outline Orchestration bounded context.
//!
//! Turns validated campaign parameters into three generated stages, in a
//! fixed order: a story outline, a scene outline that draws on it, and a
//! level progression that draws on both.

pub mod application;
pub mod domain;
