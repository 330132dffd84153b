//! # Ash Core
//!
//! Shared building blocks for Ash's agent tools:
//!
//! - **Tools**: the [`Tool`] trait and the structured [`ToolResponse`] every
//!   tool answers with
//! - **Registry**: name-based lookup and dispatch of tools
//! - **Configuration**: typed environment variable helpers
//! - **Discord**: a small REST client for messages, DMs and uploads
//! - **Fenced JSON**: extraction of ```` ```json ```` blocks from chat text

pub mod config;
pub mod discord;
pub mod fenced;
pub mod registry;
pub mod tool;

pub use config::{ConfigError, ConfigResult, DiscordConfig};
pub use discord::{Attachment, DiscordClient, DiscordError, DiscordMessage, DiscordResult};
pub use registry::InMemoryToolRegistry;
pub use tool::{Tool, ToolResponse, ToolStatus};
