//! Cross-crate tests for the Discord-facing tools and the maintenance helpers.

use ash_workspace::core::{DiscordConfig, InMemoryToolRegistry, ToolStatus};
use ash_workspace::tools::context::WeatherConfig;
use ash_workspace::tools::{HeartbeatConfig, HeartbeatTool, StatsTool, clean_file};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::tempdir;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry_for(server: &MockServer, db_dir: &std::path::Path) -> InMemoryToolRegistry {
    let mut heartbeat = HeartbeatConfig::new(DiscordConfig::new("token").with_api_base(server.uri()));
    heartbeat.default_user_id = Some("777".into());
    heartbeat.weather = Some(WeatherConfig::new("key").with_api_base(server.uri()));

    InMemoryToolRegistry::new()
        .with_tool(Arc::new(HeartbeatTool::new(heartbeat)))
        .with_tool(Arc::new(StatsTool::new(db_dir.join("missing.db"))))
}

#[tokio::test]
async fn heartbeat_reaches_default_user_with_weather() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/@me/channels"))
        .and(body_json(json!({"recipient_id": "777"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dm-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "main": {"temp": 12.5, "feels_like": 10.0},
            "weather": [{"description": "leichter Regen"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/dm-1/messages"))
        .and(body_string_contains("temperature: warm"))
        .and(body_string_contains("leichter Regen"))
        .and(body_string_contains("thinking of you"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "5001"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let response = registry_for(&server, dir.path())
        .try_dispatch(
            "send_heartbeat",
            json!({"temperature": "warm", "whisper": "thinking of you"}),
        )
        .await;

    assert!(response.is_success(), "{response:?}");
    assert_eq!(response.message, "Heartbeat sent to user 777");
    assert_eq!(response.field("channel_id"), Some(&json!("dm-1")));
    assert_eq!(response.field("message_id"), Some(&json!("5001")));
}

#[tokio::test]
async fn heartbeat_to_channel_skips_dm_and_reports_send_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/general/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Missing Access"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let response = registry_for(&server, dir.path())
        .try_dispatch(
            "send_heartbeat",
            json!({
                "temperature": "tender",
                "target": "general",
                "target_type": "channel",
                "include_context": false
            }),
        )
        .await;

    assert_eq!(response.status, ToolStatus::Error);
    assert!(response.message.starts_with("Failed to send: "));
}

#[tokio::test]
async fn stats_without_database_is_an_error_response() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let response = registry_for(&server, dir.path())
        .try_dispatch("usage_stats", json!({"timeframe": "week"}))
        .await;

    assert!(response.is_error());
    assert!(response.message.starts_with("Database not found at "));
}

#[tokio::test]
async fn stats_rejects_custom_range_missing_end() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let response = registry_for(&server, dir.path())
        .try_dispatch("usage_stats", json!({"timeframe": "custom", "start": "2026-10-01"}))
        .await;

    assert!(response.is_error());
    assert_eq!(response.message, "Custom timeframe needs a start and an end");
}

#[test]
fn archival_cleanup_rewrites_only_targeted_entries() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("archival.json");
    std::fs::write(
        &file,
        serde_json::to_string(&json!([
            {"id": "keep", "content": "untouched", "metadata": {"length": 9}},
            {"id": "drop", "content": "[whispering] a long voice script", "metadata": {"length": 32}}
        ]))
        .unwrap(),
    )
    .unwrap();

    let report = clean_file(&file, &["drop".to_string()], "summary").unwrap();
    assert_eq!(report.updated, 1);
    assert!(report.missing_ids.is_empty());
    assert_eq!(report.characters_saved, 32 - 7);

    let rewritten: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(rewritten[0]["content"], "untouched");
    assert_eq!(rewritten[1]["content"], "summary");
    assert_eq!(rewritten[1]["metadata"]["cleaned"], true);
    assert_eq!(rewritten[1]["metadata"]["original_length"], 32);
}
