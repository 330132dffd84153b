//! End-to-end tests for the `rider_pi` tool over a scripted channel and a
//! mocked Discord API.

use ash_workspace::bridge::{
    BridgeResult, ChannelTransport, CommandDispatcher, CorrelationConfig, DiscordChannel, Frame,
    FramePosition, RiderPiTool,
};
use ash_workspace::core::{DiscordConfig, InMemoryToolRegistry, Tool, ToolStatus};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Request id between the first pair of brackets.
fn request_id(text: &str) -> Option<String> {
    let start = text.find('[')? + 1;
    let end = start + text[start..].find(']')?;
    Some(text[start..end].to_string())
}

/// A robot stand-in: answers every command on the same log, failing any
/// command whose text contains `broken`.
struct ScriptedRobot {
    frames: Mutex<Vec<Frame>>,
    broken: &'static str,
}

impl ScriptedRobot {
    fn new(broken: &'static str) -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            broken,
        }
    }

    fn append(frames: &mut Vec<Frame>, text: String) -> FramePosition {
        let position = FramePosition::new((frames.len() + 1).to_string());
        frames.push(Frame {
            position: position.clone(),
            text,
        });
        position
    }

    fn sent_commands(&self) -> usize {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.text.contains("MCP_COMMAND"))
            .count()
    }
}

#[async_trait]
impl ChannelTransport for ScriptedRobot {
    async fn send(&self, text: &str) -> BridgeResult<FramePosition> {
        let mut frames = self.frames.lock().unwrap();
        let position = Self::append(&mut frames, text.to_string());
        let id = request_id(text).unwrap_or_default();
        Self::append(&mut frames, "chatter from another bot".to_string());
        let reply = if text.contains(self.broken) {
            format!("❌ MCP_ERROR [{id}]: servo stalled")
        } else {
            format!("✅ MCP_RESPONSE [{id}]: ```json\n{{\"status\": \"success\", \"message\": \"done\"}}\n```")
        };
        Self::append(&mut frames, reply);
        Ok(position)
    }

    async fn list_after(&self, position: &FramePosition, limit: usize) -> BridgeResult<Vec<Frame>> {
        let after: usize = position.as_str().parse().unwrap_or(0);
        Ok(self
            .frames
            .lock()
            .unwrap()
            .iter()
            .skip(after)
            .take(limit)
            .cloned()
            .collect())
    }
}

fn scripted_registry(robot: Arc<ScriptedRobot>) -> InMemoryToolRegistry {
    let tool = RiderPiTool::new(CommandDispatcher::with_defaults(robot));
    InMemoryToolRegistry::new().with_tool(Arc::new(tool))
}

#[tokio::test(start_paused = true)]
async fn sequence_with_failures_reports_partial() {
    let robot = Arc::new(ScriptedRobot::new("rider_pi_happy_dance"));
    let registry = scripted_registry(robot.clone());

    let response = registry
        .try_dispatch(
            "rider_pi",
            json!({
                "action": "sequence",
                "sequence": [
                    {"action": "adjust_height", "height": 100},
                    {"action": "happy_dance"},
                    {"action": "teleport"},
                    {"action": "reset"}
                ],
                "delay_between": 0.5
            }),
        )
        .await;

    assert_eq!(response.status, ToolStatus::Partial);
    assert_eq!(response.field("total_actions"), Some(&json!(4)));
    assert_eq!(response.field("successful"), Some(&json!(2)));
    assert_eq!(response.field("failed"), Some(&json!(2)));

    let results = response.field("results").and_then(Value::as_array).unwrap();
    let statuses: Vec<&str> = results
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["success", "error", "error", "success"]);
    assert!(results[1]["message"].as_str().unwrap().contains("servo stalled"));
    assert_eq!(results[2]["action"], "teleport");
    assert_eq!(results[3]["index"], 3);

    // The unknown step never reaches the channel.
    assert_eq!(robot.sent_commands(), 3);
}

#[tokio::test(start_paused = true)]
async fn single_action_through_registry() {
    let robot = Arc::new(ScriptedRobot::new("never"));
    let registry = scripted_registry(robot);

    let response = registry
        .try_dispatch("rider_pi", json!({"action": "adjust_height", "height": 60}))
        .await;

    assert!(response.is_success());
    assert_eq!(response.message, "done");
    assert_eq!(response.field("action"), Some(&json!("adjust_height")));
}

#[tokio::test(start_paused = true)]
async fn unknown_tool_names_the_registered_ones() {
    let registry = scripted_registry(Arc::new(ScriptedRobot::new("never")));
    let response = registry.try_dispatch("rider", json!({})).await;

    assert!(response.is_error());
    assert_eq!(response.message, "Tool not found: rider. Available: rider_pi");
}

/// Plays the robot on a mocked Discord channel: remembers the request id of
/// the last posted command and answers polls with a reply for it.
#[derive(Clone, Default)]
struct DiscordRobot {
    last_id: Arc<Mutex<Option<String>>>,
}

struct PostCommand(DiscordRobot);
struct PollReplies(DiscordRobot);

impl Respond for PostCommand {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let content = body["content"].as_str().unwrap_or_default();
        *self.0.last_id.lock().unwrap() = request_id(content);
        ResponseTemplate::new(200).set_body_json(json!({"id": "1000", "content": content}))
    }
}

impl Respond for PollReplies {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let Some(id) = self.0.last_id.lock().unwrap().clone() else {
            return ResponseTemplate::new(200).set_body_json(json!([]));
        };
        ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "1002",
                "content": format!("✅ MCP_RESPONSE [{id}]: ```json\n{{\"status\": \"success\", \"message\": \"Reset complete\"}}\n```")
            },
            {"id": "1001", "content": "unrelated"}
        ]))
    }
}

#[tokio::test]
async fn command_round_trip_over_discord() {
    let server = MockServer::start().await;
    let robot = DiscordRobot::default();
    Mock::given(method("POST"))
        .and(path("/channels/42/messages"))
        .respond_with(PostCommand(robot.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channels/42/messages"))
        .respond_with(PollReplies(robot))
        .mount(&server)
        .await;

    let discord = DiscordConfig::new("token").with_api_base(server.uri());
    let correlation = CorrelationConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_command_timeout(Duration::from_secs(5));
    let dispatcher =
        CommandDispatcher::new(Arc::new(DiscordChannel::from_config(&discord, "42")), correlation);
    let tool = RiderPiTool::new(dispatcher);

    let response = tool.call(json!({"action": "reset"})).await;

    assert!(response.is_success(), "{response:?}");
    assert_eq!(response.message, "Reset complete");
    assert_eq!(response.field("action"), Some(&json!("reset")));
}
