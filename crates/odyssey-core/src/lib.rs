//! OdysseyMaker Core: shared domain abstractions.
//!
//! This crate defines the ports and error types that the outline context
//! and its adapters depend on. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod provider;
pub mod repository;
