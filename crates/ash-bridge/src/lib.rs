//! # Ash Bridge
//!
//! Drives the Rider Pi robot through a shared chat channel. Commands are
//! posted as tagged text frames; a relay on the robot side executes them and
//! answers in the same channel. Replies are matched back to their command by
//! correlation id.
//!
//! ## Flow
//!
//! ```text
//! action name + params
//!   -> resolve (registry, clamping)
//!   -> CommandEnvelope framed as "🤖 MCP_COMMAND [id]: ```json ...```"
//!   -> ChannelTransport::send
//!   -> ResponseWaiter polls list_after(...) until MCP_RESPONSE/MCP_ERROR [id]
//!   -> ResponseResult
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use ash_bridge::{BridgeConfig, RiderPiTool};
//! use ash_core::Tool;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tool = RiderPiTool::from_config(&BridgeConfig::from_env()?);
//! let response = tool.call(json!({"action": "happy_dance"})).await;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod response;
pub mod sequence;
pub mod tool;
pub mod transport;
pub mod waiter;

#[cfg(test)]
mod testing;

pub use action::{ParamKind, ParamSpec, ResolvedAction, RiderAction, resolve};
pub use config::{BridgeConfig, CorrelationConfig};
pub use dispatcher::CommandDispatcher;
pub use error::{BridgeError, BridgeResult};
pub use frame::{CommandEnvelope, CorrelationId, Payload, ReplyFrame, classify_reply};
pub use response::ResponseResult;
pub use sequence::{SequenceRunner, SequenceSummary, StepResult, delay_from_secs};
pub use tool::{ActionParams, RiderPiRequest, RiderPiTool};
pub use transport::{ChannelTransport, DiscordChannel, Frame, FramePosition};
pub use waiter::ResponseWaiter;
