//! # Ash
//!
//! Facade over the Ash workspace crates:
//!
//! - [`core`]: tool trait, registry, configuration and the Discord client
//! - [`bridge`]: the correlated command protocol driving the Rider Pi robot
//! - [`tools`]: heartbeat, voice, tasks, usage stats and archival cleanup
//!
//! ```rust,no_run
//! use ash_workspace::bridge::{BridgeConfig, RiderPiTool};
//! use ash_workspace::core::{InMemoryToolRegistry, ToolResponse};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tool = RiderPiTool::from_config(&BridgeConfig::from_env()?);
//! let registry = InMemoryToolRegistry::new().with_tool(Arc::new(tool));
//! let response: ToolResponse = registry
//!     .try_dispatch("rider_pi", json!({"action": "happy_dance"}))
//!     .await;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

pub use ash_bridge as bridge;
pub use ash_core as core;
pub use ash_tools as tools;

pub use ash_core::{InMemoryToolRegistry, Tool, ToolResponse, ToolStatus};
