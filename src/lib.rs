//! Maestro: community bot for a programming course server.
//!
//! One gateway process drives three surfaces: Discord commands and events,
//! an AI provider-failover gateway with an "architect" planning mode, and a
//! keep-alive HTTP endpoint for the hosting platform.

pub mod commands;
pub mod config;
pub mod discord;
pub mod error;
pub mod llm;
pub mod plan;
pub mod prompts;
pub mod server;
pub mod store;
pub mod tasks;

pub use error::{Error, Result};
