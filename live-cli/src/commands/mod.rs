//! CLI command implementations.

pub mod fetch;
pub mod health;
pub mod render;
pub mod watch;
