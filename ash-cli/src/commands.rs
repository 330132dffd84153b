//! Subcommand handlers.
//!
//! Every handler builds the same JSON arguments an agent would send and
//! goes through the tool's `call`, so the CLI exercises exactly the agent
//! code path.

use ash_bridge::{BridgeConfig, RiderPiTool};
use ash_core::config::ConfigError;
use ash_core::{InMemoryToolRegistry, Tool, ToolResponse};
use ash_tools::archival::{DEFAULT_SUMMARY, clean_file};
use ash_tools::stats::db_path_from_env;
use ash_tools::{
    HeartbeatConfig, HeartbeatTool, StatsTool, TaskFetcher, TasksConfig, ToolsError, VoiceConfig,
    VoiceTool,
};
use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Tools(#[from] ToolsError),

    #[error("Invalid JSON for {what}: {source}")]
    InvalidJson {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type CliResult<T> = Result<T, CliError>;

pub fn render(response: &ToolResponse) -> String {
    serde_json::to_string_pretty(&response.to_value()).unwrap_or_else(|_| response.message.clone())
}

fn parse_json(raw: &str, what: &'static str) -> CliResult<Value> {
    serde_json::from_str(raw).map_err(|source| CliError::InvalidJson { what, source })
}

fn read_file(path: &PathBuf) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })
}

/// Insert `value` under `key` when present.
fn put<T: Into<Value>>(object: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        object.insert(key.to_string(), value.into());
    }
}

#[derive(Subcommand, Debug)]
pub enum RiderCommand {
    /// Run a single action
    Action {
        /// Action name (see `ash rider list`)
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        height: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        roll: Option<f64>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        period: Option<f64>,
    },
    /// Run a sequence of actions given as a JSON array
    Sequence {
        /// Inline JSON array of {"action": ..., ...} steps
        #[arg(long, conflicts_with = "file")]
        steps: Option<String>,
        /// File containing the JSON array
        #[arg(long)]
        file: Option<PathBuf>,
        /// Seconds to pause between steps
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
    },
    /// List available actions
    List,
}

pub async fn run_rider(command: RiderCommand) -> CliResult<ToolResponse> {
    let input = match &command {
        RiderCommand::List => json!({"action": "list_actions"}),
        RiderCommand::Action {
            name,
            height,
            roll,
            enabled,
            period,
        } => {
            let mut object = Map::new();
            object.insert("action".into(), Value::from(name.clone()));
            put(&mut object, "height", *height);
            put(&mut object, "roll", *roll);
            put(&mut object, "enabled", *enabled);
            put(&mut object, "period", *period);
            Value::Object(object)
        }
        RiderCommand::Sequence { steps, file, delay } => {
            let raw = match (steps, file) {
                (Some(inline), _) => inline.clone(),
                (None, Some(path)) => read_file(path)?,
                (None, None) => "[]".to_string(),
            };
            let sequence = parse_json(&raw, "sequence")?;
            json!({"action": "sequence", "sequence": sequence, "delay_between": delay})
        }
    };

    let tool = RiderPiTool::from_config(&BridgeConfig::from_env()?);
    Ok(tool.call(input).await)
}

#[derive(Args, Debug)]
pub struct HeartbeatArgs {
    /// Emotional temperature (warm, scorching, tender, race, ...)
    #[arg(long)]
    pub temperature: String,
    #[arg(long)]
    pub whisper: Option<String>,
    /// single, double, triple or cluster
    #[arg(long, default_value = "single")]
    pub pattern: String,
    /// User or channel id (default: DEFAULT_USER_ID)
    #[arg(long)]
    pub target: Option<String>,
    /// user or channel
    #[arg(long, default_value = "user")]
    pub target_type: String,
    /// Leave out time, music and weather
    #[arg(long)]
    pub no_context: bool,
}

pub async fn run_heartbeat(args: HeartbeatArgs) -> CliResult<ToolResponse> {
    let mut input = Map::new();
    input.insert("temperature".into(), Value::from(args.temperature));
    put(&mut input, "whisper", args.whisper);
    input.insert("pattern".into(), Value::from(args.pattern));
    put(&mut input, "target", args.target);
    input.insert("target_type".into(), Value::from(args.target_type));
    input.insert("include_context".into(), Value::from(!args.no_context));

    let tool = HeartbeatTool::new(HeartbeatConfig::from_env()?);
    Ok(tool.call(Value::Object(input)).await)
}

#[derive(Args, Debug)]
pub struct VoiceArgs {
    #[arg(long)]
    pub text: String,
    /// User id (DM) or channel id
    #[arg(long)]
    pub target: String,
    /// auto, user or channel
    #[arg(long, default_value = "auto")]
    pub target_type: String,
    #[arg(long)]
    pub voice_id: Option<String>,
    #[arg(long)]
    pub model_id: Option<String>,
    #[arg(long)]
    pub stability: Option<f64>,
    #[arg(long)]
    pub similarity_boost: Option<f64>,
    #[arg(long)]
    pub style: Option<f64>,
    #[arg(long)]
    pub use_speaker_boost: Option<bool>,
    #[arg(long)]
    pub reply_to: Option<String>,
}

pub async fn run_voice(args: VoiceArgs) -> CliResult<ToolResponse> {
    let mut input = Map::new();
    input.insert("text".into(), Value::from(args.text));
    input.insert("target".into(), Value::from(args.target));
    input.insert("target_type".into(), Value::from(args.target_type));
    put(&mut input, "voice_id", args.voice_id);
    put(&mut input, "model_id", args.model_id);
    put(&mut input, "stability", args.stability);
    put(&mut input, "similarity_boost", args.similarity_boost);
    put(&mut input, "style", args.style);
    put(&mut input, "use_speaker_boost", args.use_speaker_boost);
    put(&mut input, "reply_to_message_id", args.reply_to);

    let tool = VoiceTool::new(VoiceConfig::from_env()?);
    Ok(tool.call(Value::Object(input)).await)
}

pub async fn run_tasks(channel: Option<String>) -> CliResult<ToolResponse> {
    let fetcher = TaskFetcher::new(TasksConfig::from_env()?);
    Ok(fetcher.fetch(channel.as_deref()).await)
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// today, week, month, all or custom
    #[arg(default_value = "today")]
    pub timeframe: String,
    /// Start of a custom range
    pub start: Option<String>,
    /// End of a custom range (exclusive)
    pub end: Option<String>,
    /// Database file (default: LETTA_USAGE_DB or letta_usage.db)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub async fn run_stats(args: StatsArgs) -> CliResult<ToolResponse> {
    let tool = StatsTool::new(args.db.unwrap_or_else(db_path_from_env));
    let mut input = Map::new();
    input.insert("timeframe".into(), Value::from(args.timeframe));
    put(&mut input, "start", args.start);
    put(&mut input, "end", args.end);
    Ok(tool.call(Value::Object(input)).await)
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Archival memory export (JSON array)
    pub file: PathBuf,
    /// Memory id to summarize; repeat for several
    #[arg(long = "id", required = true)]
    pub ids: Vec<String>,
    /// Replacement text
    #[arg(long, conflicts_with = "summary_file")]
    pub summary: Option<String>,
    /// File holding the replacement text
    #[arg(long)]
    pub summary_file: Option<PathBuf>,
}

pub fn run_clean_memories(args: CleanArgs) -> CliResult<ToolResponse> {
    let summary = match (&args.summary, &args.summary_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_file(path)?,
        (None, None) => DEFAULT_SUMMARY.to_string(),
    };

    let report = clean_file(&args.file, &args.ids, &summary)?;
    let message = format!("Updated {} of {} requested entries", report.updated, args.ids.len());
    let response = if report.missing_ids.is_empty() {
        ToolResponse::success(message)
    } else {
        ToolResponse::partial(message)
    };
    Ok(response
        .with_field("file", args.file.display().to_string())
        .with_field("total_entries", report.total_entries)
        .with_field("updated", report.updated)
        .with_field("missing_ids", report.missing_ids)
        .with_field("characters_saved", report.characters_saved))
}

/// Register every tool whose configuration is present in the environment.
pub fn build_registry() -> InMemoryToolRegistry {
    let mut registry = InMemoryToolRegistry::new();

    match BridgeConfig::from_env() {
        Ok(config) => registry.register(Arc::new(RiderPiTool::from_config(&config))),
        Err(e) => warn!(tool = "rider_pi", error = %e, "Tool unavailable"),
    }
    match HeartbeatConfig::from_env() {
        Ok(config) => registry.register(Arc::new(HeartbeatTool::new(config))),
        Err(e) => warn!(tool = "send_heartbeat", error = %e, "Tool unavailable"),
    }
    match VoiceConfig::from_env() {
        Ok(config) => registry.register(Arc::new(VoiceTool::new(config))),
        Err(e) => warn!(tool = "send_voice_message", error = %e, "Tool unavailable"),
    }
    match TasksConfig::from_env() {
        Ok(config) => registry.register(Arc::new(TaskFetcher::new(config))),
        Err(e) => warn!(tool = "fetch_tasks", error = %e, "Tool unavailable"),
    }
    registry.register(Arc::new(StatsTool::from_env()));

    registry
}

pub fn run_tools() -> ToolResponse {
    let registry = build_registry();
    let tools: Map<String, Value> = registry
        .describe()
        .into_iter()
        .map(|(name, description)| (name, Value::from(description)))
        .collect();
    ToolResponse::success(format!("{} tools available", tools.len())).with_field("tools", tools)
}

pub async fn run_call(tool: &str, raw_input: &str) -> CliResult<ToolResponse> {
    let input = parse_json(raw_input, "tool input")?;
    Ok(build_registry().try_dispatch(tool, input).await)
}
