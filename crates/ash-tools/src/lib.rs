//! # Ash Tools
//!
//! Agent tools and maintenance helpers around Ash's Discord presence:
//!
//! - [`heartbeat`]: emotionally tagged pulses with optional ambient context
//! - [`voice`]: ElevenLabs text-to-speech delivered as Discord attachments
//! - [`tasks`]: self tasks posted to the tasks channel
//! - [`stats`]: credit and call totals from the local usage log
//! - [`archival`]: summarizing selected archival memory entries
//!
//! Every tool implements [`ash_core::Tool`] and can be registered in an
//! [`ash_core::InMemoryToolRegistry`].

pub mod archival;
pub mod context;
pub mod error;
pub mod heartbeat;
pub mod stats;
pub mod tasks;
pub mod voice;

pub use archival::{CleanReport, clean_entries, clean_file};
pub use error::{ToolsError, ToolsResult};
pub use heartbeat::{HeartbeatConfig, HeartbeatRequest, HeartbeatTool, TargetType};
pub use stats::{StatsTool, Timeframe, UsageStats, query_usage};
pub use tasks::{TaskFetcher, TasksConfig};
pub use voice::{VoiceConfig, VoiceRequest, VoiceTool};
