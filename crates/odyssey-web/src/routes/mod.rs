//! Route modules: the JSON API, the HTML UI, and the health check.

pub mod health;
pub mod outline;
pub mod sessions;
pub mod ui;
