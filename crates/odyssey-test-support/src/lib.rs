//! Shared test mocks and utilities for the OdysseyMaker campaign outliner.

mod clock;
mod provider;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use provider::{FailingProvider, SlowProvider, StubProvider};
pub use repository::{EmptySessionRepository, FailingSessionRepository};
