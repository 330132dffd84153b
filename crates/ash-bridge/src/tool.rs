//! The `rider_pi` agent tool.
//!
//! Single entry point over the dispatcher and sequence runner. Every call
//! answers with a [`ToolResponse`]; failures never escape as errors.

use crate::action::RiderAction;
use crate::config::BridgeConfig;
use crate::dispatcher::CommandDispatcher;
use crate::sequence::{DEFAULT_DELAY_SECS, SequenceRunner, SequenceSummary, delay_from_secs};
use crate::transport::{ChannelTransport, DiscordChannel};
use ash_core::tool::parse_input;
use ash_core::{Tool, ToolResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const TOOL_NAME: &str = "rider_pi";

/// Optional parameters accepted by single actions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActionParams {
    pub height: Option<Value>,
    pub roll: Option<Value>,
    pub enabled: Option<Value>,
    pub period: Option<Value>,
}

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(mut self, height: impl Into<Value>) -> Self {
        self.height = Some(height.into());
        self
    }

    pub fn roll(mut self, roll: impl Into<Value>) -> Self {
        self.roll = Some(roll.into());
        self
    }

    pub fn enabled(mut self, enabled: impl Into<Value>) -> Self {
        self.enabled = Some(enabled.into());
        self
    }

    pub fn period(mut self, period: impl Into<Value>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn to_map(&self) -> Map<String, Value> {
        [
            ("height", &self.height),
            ("roll", &self.roll),
            ("enabled", &self.enabled),
            ("period", &self.period),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
        .collect()
    }
}

/// JSON arguments of the `rider_pi` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct RiderPiRequest {
    /// `"sequence"`, `"list_actions"` or a registered action name
    pub action: String,
    #[serde(flatten)]
    pub params: ActionParams,
    #[serde(default)]
    pub sequence: Option<Vec<Value>>,
    #[serde(default)]
    pub delay_between: Option<f64>,
}

/// Agent tool driving the Rider Pi robot.
pub struct RiderPiTool<T: ChannelTransport> {
    runner: SequenceRunner<T>,
}

impl RiderPiTool<DiscordChannel> {
    /// Build a tool talking to the command channel named in `config`.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let channel = DiscordChannel::from_config(&config.discord, config.command_channel_id.clone());
        Self::new(CommandDispatcher::new(
            Arc::new(channel),
            config.correlation.clone(),
        ))
    }
}

impl<T: ChannelTransport> RiderPiTool<T> {
    pub fn new(dispatcher: CommandDispatcher<T>) -> Self {
        Self {
            runner: SequenceRunner::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<T> {
        self.runner.dispatcher()
    }

    /// Run one action and wait for the robot's reply.
    pub async fn execute_single_action(&self, action: &str, params: ActionParams) -> ToolResponse {
        self.dispatcher()
            .execute(action, &params.to_map())
            .await
            .to_tool_response()
            .with_field("action", action)
    }

    /// Run a list of `{action, ...params}` steps in order.
    pub async fn execute_sequence(&self, steps: &[Value], delay_between: f64) -> ToolResponse {
        match self.runner.run(steps, delay_from_secs(delay_between)).await {
            Ok(summary) => summary_response(&summary),
            Err(e) => ToolResponse::error(e.to_string()),
        }
    }

    /// Describe every available action plus an example sequence.
    pub fn list_actions(&self) -> ToolResponse {
        let actions: Map<String, Value> = RiderAction::all()
            .iter()
            .map(|action| (action.name().to_string(), Value::from(action.description())))
            .collect();
        ToolResponse::success(format!("{} actions available", actions.len()))
            .with_field("actions", actions)
            .with_field(
                "example_sequence",
                json!([
                    {"action": "adjust_height", "height": 100},
                    {"action": "happy_dance"},
                    {"action": "reset"}
                ]),
            )
    }

    /// Route a parsed request to the matching operation.
    pub async fn handle(&self, request: RiderPiRequest) -> ToolResponse {
        match request.action.as_str() {
            "list_actions" => self.list_actions(),
            "sequence" => {
                let steps = request.sequence.unwrap_or_default();
                let delay = request.delay_between.unwrap_or(DEFAULT_DELAY_SECS);
                self.execute_sequence(&steps, delay).await
            }
            action => self.execute_single_action(action, request.params).await,
        }
    }
}

fn summary_response(summary: &SequenceSummary) -> ToolResponse {
    let results: Vec<Value> = summary
        .results
        .iter()
        .map(|step| {
            let mut entry = step.result.to_tool_response().to_value();
            if let Value::Object(object) = &mut entry {
                object.insert("index".into(), Value::from(step.index));
                object.insert("action".into(), Value::from(step.action.clone()));
            }
            entry
        })
        .collect();

    ToolResponse::new(summary.status, summary.message())
        .with_field("total_actions", summary.total)
        .with_field("successful", summary.successful)
        .with_field("failed", summary.failed)
        .with_field("results", results)
}

#[async_trait]
impl<T: ChannelTransport + 'static> Tool for RiderPiTool<T> {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Control the Rider Pi robot: run a single action, a sequence of actions, or list the available actions"
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Action name, \"sequence\" or \"list_actions\""
                },
                "height": {"type": "integer", "minimum": 75, "maximum": 115},
                "roll": {"type": "integer", "minimum": -17, "maximum": 17},
                "enabled": {"type": "boolean"},
                "period": {"type": "number", "minimum": 0.0, "maximum": 4.0},
                "sequence": {
                    "type": "array",
                    "items": {"type": "object"},
                    "description": "Steps of the form {\"action\": name, ...parameters}"
                },
                "delay_between": {"type": "number", "default": DEFAULT_DELAY_SECS}
            },
            "required": ["action"]
        }))
    }

    async fn call(&self, input: Value) -> ToolResponse {
        match parse_input::<RiderPiRequest>(input) {
            Ok(request) => self.handle(request).await,
            Err(response) => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryChannel;
    use ash_core::ToolStatus;

    fn tool(channel: MemoryChannel) -> RiderPiTool<MemoryChannel> {
        RiderPiTool::new(CommandDispatcher::with_defaults(Arc::new(channel)))
    }

    #[test]
    fn params_map_skips_absent_values() {
        let params = ActionParams::new().height(100).enabled(false);
        let map = params.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["height"], json!(100));
        assert_eq!(map["enabled"], json!(false));
    }

    #[tokio::test(start_paused = true)]
    async fn single_action_reports_remote_message() {
        let tool = tool(MemoryChannel::echoing());
        let response = tool
            .call(json!({"action": "adjust_roll", "roll": -30}))
            .await;

        assert_eq!(response.status, ToolStatus::Success);
        assert_eq!(response.message, "ok");
        assert_eq!(response.field("action"), Some(&json!("adjust_roll")));
        let sent = tool.dispatcher().transport().commands();
        assert!(sent[0].contains("\"roll\": -17"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_action_lists_alternatives() {
        let response = tool(MemoryChannel::echoing()).call(json!({"action": "fly"})).await;

        assert!(response.is_error());
        assert!(response.message.starts_with("Unknown action: 'fly'. Available: "));
        assert!(response.message.contains("happy_dance"));
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_summary_shape() {
        let tool = tool(MemoryChannel::echoing());
        let response = tool
            .call(json!({
                "action": "sequence",
                "sequence": [
                    {"action": "adjust_height", "height": 100},
                    {"action": "fly"},
                    {"action": "reset"}
                ],
                "delay_between": 0
            }))
            .await;

        assert_eq!(response.status, ToolStatus::Partial);
        assert_eq!(response.field("total_actions"), Some(&json!(3)));
        assert_eq!(response.field("successful"), Some(&json!(2)));
        assert_eq!(response.field("failed"), Some(&json!(1)));
        let results = response.field("results").unwrap().as_array().unwrap();
        assert_eq!(results[1]["index"], 1);
        assert_eq!(results[1]["action"], "fly");
        assert_eq!(results[1]["status"], "error");
        assert_eq!(results[2]["status"], "success");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sequence_is_an_error() {
        let tool = tool(MemoryChannel::echoing());
        let response = tool.call(json!({"action": "sequence", "sequence": []})).await;

        assert!(response.is_error());
        assert_eq!(response.message, "Sequence is empty");
        assert!(tool.dispatcher().transport().commands().is_empty());

        let missing = tool.call(json!({"action": "sequence"})).await;
        assert!(missing.is_error());
    }

    #[tokio::test]
    async fn list_actions_describes_every_action() {
        let response = tool(MemoryChannel::silent())
            .call(json!({"action": "list_actions"}))
            .await;

        assert!(response.is_success());
        let actions = response.field("actions").unwrap().as_object().unwrap();
        assert_eq!(actions.len(), RiderAction::all().len());
        assert!(actions.contains_key("test_connection"));
        assert!(response.field("example_sequence").unwrap().is_array());
    }

    #[tokio::test]
    async fn malformed_input_is_rejected() {
        let response = tool(MemoryChannel::silent()).call(json!({"height": 90})).await;
        assert!(response.is_error());
        assert!(response.message.starts_with("Invalid input"));
    }
}
