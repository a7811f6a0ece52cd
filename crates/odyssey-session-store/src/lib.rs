//! OdysseyMaker session store.
//!
//! Session state lives only as long as the server process.

pub mod memory_session_repository;

pub use memory_session_repository::InMemorySessionRepository;
