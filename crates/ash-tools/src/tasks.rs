//! Self-task lookup.
//!
//! Scheduled self tasks are posted to a dedicated channel as chat messages
//! with the task definition in a fenced JSON block. This reads the recent
//! history of that channel and returns the decoded definitions.

use ash_core::config::{ConfigResult, require_env};
use ash_core::fenced::decode_json_block;
use ash_core::tool::parse_input;
use ash_core::{DiscordClient, DiscordConfig, DiscordMessage, Tool, ToolResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

pub const TOOL_NAME: &str = "fetch_tasks";

/// Number of recent messages scanned.
pub const HISTORY_LIMIT: usize = 30;

#[derive(Debug, Clone)]
pub struct TasksConfig {
    pub discord: DiscordConfig,
    pub channel_id: String,
}

impl TasksConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            discord: DiscordConfig::from_env()?,
            channel_id: require_env("TASKS_CHANNEL_ID")?,
        })
    }
}

/// Tasks found in a batch of messages.
#[derive(Debug, Default, PartialEq)]
pub struct TaskScan {
    pub tasks: Vec<Value>,
    /// One entry per task message whose block could not be decoded
    pub errors: Vec<String>,
}

fn is_self_task(content: &str) -> bool {
    content.contains("task_name") && content.to_lowercase().contains("self")
}

/// Decode the task definitions posted in `messages`.
pub fn scan_messages(messages: &[DiscordMessage]) -> TaskScan {
    let mut scan = TaskScan::default();
    for message in messages.iter().filter(|m| is_self_task(&m.content)) {
        match decode_json_block(&message.content) {
            Some(Ok(task)) => scan.tasks.push(task),
            Some(Err(e)) => {
                warn!(message_id = %message.id, error = %e, "Unreadable task definition");
                scan.errors.push(format!("Error parsing task in message {}: {e}", message.id));
            }
            None => {}
        }
    }
    scan
}

#[derive(Debug, Default, Deserialize)]
struct FetchTasksRequest {
    #[serde(default)]
    channel_id: Option<String>,
}

/// The `fetch_tasks` tool.
pub struct TaskFetcher {
    client: DiscordClient,
    channel_id: String,
}

impl TaskFetcher {
    pub fn new(config: TasksConfig) -> Self {
        Self {
            client: DiscordClient::new(&config.discord),
            channel_id: config.channel_id,
        }
    }

    /// Scan the newest messages of `channel_id` (or the configured channel).
    pub async fn fetch(&self, channel_id: Option<&str>) -> ToolResponse {
        let channel_id = channel_id.unwrap_or(&self.channel_id);
        let messages = match self.client.list_messages(channel_id, None, HISTORY_LIMIT).await {
            Ok(messages) => messages,
            Err(e) => return ToolResponse::error(format!("Error fetching messages: {e}")),
        };

        let scan = scan_messages(&messages);
        ToolResponse::success(format!("Found {} self tasks", scan.tasks.len()))
            .with_field("tasks", scan.tasks)
            .with_field("errors", scan.errors)
    }
}

#[async_trait]
impl Tool for TaskFetcher {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "List the self tasks recently posted to the tasks channel"
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"channel_id": {"type": "string"}}
        }))
    }

    async fn call(&self, input: Value) -> ToolResponse {
        let input = if input.is_null() { json!({}) } else { input };
        match parse_input::<FetchTasksRequest>(input) {
            Ok(request) => self.fetch(request.channel_id.as_deref()).await,
            Err(response) => response,
        }
    }
}
