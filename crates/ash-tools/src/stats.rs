//! Usage statistics from the local run log.
//!
//! Every agent run is recorded as a row in the `runs` table of a SQLite
//! database. This sums credits and call counts over a time window.

use crate::error::{ToolsError, ToolsResult};
use ash_core::config::get_env_string;
use ash_core::tool::parse_input;
use ash_core::{Tool, ToolResponse};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime};
use rusqlite::{Connection, OpenFlags, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

pub const TOOL_NAME: &str = "usage_stats";
pub const DEFAULT_DB_PATH: &str = "letta_usage.db";

/// Timestamps in the run log are ISO-8601 without offset and compare as text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Database location from `LETTA_USAGE_DB`, or the default file name.
pub fn db_path_from_env() -> PathBuf {
    get_env_string("LETTA_USAGE_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

/// Window the totals are computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeframe {
    /// Since local midnight
    Today,
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
    All,
    /// `start <= timestamp < end`, both as stored in the log
    Custom { start: String, end: String },
}

impl Timeframe {
    /// Parse a timeframe name; `custom` needs both bounds.
    pub fn parse(name: &str, start: Option<&str>, end: Option<&str>) -> ToolsResult<Self> {
        match name {
            "today" => Ok(Timeframe::Today),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "all" => Ok(Timeframe::All),
            "custom" => match (start, end) {
                (Some(start), Some(end)) => Ok(Timeframe::Custom {
                    start: start.to_string(),
                    end: end.to_string(),
                }),
                _ => Err(ToolsError::validation(
                    "Custom timeframe needs a start and an end",
                )),
            },
            other => Err(ToolsError::validation(format!(
                "Unknown timeframe '{other}'. Use today, week, month, all or custom"
            ))),
        }
    }

    /// SQL filter and bound parameters relative to `now`.
    fn filter(&self, now: NaiveDateTime) -> (&'static str, Vec<String>) {
        let since = |t: NaiveDateTime| vec![t.format(TIMESTAMP_FORMAT).to_string()];
        match self {
            Timeframe::Today => {
                let midnight = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
                ("WHERE timestamp >= ?", since(midnight))
            }
            Timeframe::Week => ("WHERE timestamp >= ?", since(now - Duration::days(7))),
            Timeframe::Month => ("WHERE timestamp >= ?", since(now - Duration::days(30))),
            Timeframe::All => ("", Vec::new()),
            Timeframe::Custom { start, end } => (
                "WHERE timestamp >= ? AND timestamp < ?",
                vec![start.clone(), end.clone()],
            ),
        }
    }
}

/// Totals over a timeframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStats {
    /// Total credits, tool calls included
    pub credits: f64,
    pub runs: i64,
    pub api_calls: f64,
    pub tool_calls: i64,
    /// Credits of the runs themselves
    pub base_credits: f64,
    pub tool_call_credits: f64,
}

/// Sum the run log at `db_path` over `timeframe`.
///
/// # Errors
///
/// `NotFound` when the database file does not exist; the file is never
/// created.
pub fn query_usage(db_path: &Path, timeframe: &Timeframe, now: NaiveDateTime) -> ToolsResult<UsageStats> {
    if !db_path.exists() {
        return Err(ToolsError::NotFound(format!(
            "Database not found at {}",
            db_path.display()
        )));
    }
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let (where_clause, params) = timeframe.filter(now);
    let sql = format!(
        "SELECT
           COALESCE(SUM(total_credits), 0),
           COUNT(*),
           COALESCE(SUM(api_calls), 0),
           COALESCE(SUM(tool_calls), 0),
           COALESCE(SUM(credits), 0),
           COALESCE(SUM(tool_call_credits), 0)
         FROM runs {where_clause}"
    );

    let stats = conn.query_row(&sql, params_from_iter(params.iter()), |row| {
        Ok(UsageStats {
            credits: row.get(0)?,
            runs: row.get(1)?,
            api_calls: row.get(2)?,
            tool_calls: row.get::<_, f64>(3)? as i64,
            base_credits: row.get(4)?,
            tool_call_credits: row.get(5)?,
        })
    })?;
    Ok(stats)
}

#[derive(Debug, Deserialize)]
struct StatsRequest {
    #[serde(default = "default_timeframe")]
    timeframe: String,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

fn default_timeframe() -> String {
    "today".to_string()
}

/// The usage statistics tool.
pub struct StatsTool {
    db_path: PathBuf,
}

impl StatsTool {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(db_path_from_env())
    }

    pub async fn stats(&self, timeframe: Timeframe) -> ToolResponse {
        let db_path = self.db_path.clone();
        let label = match &timeframe {
            Timeframe::Today => "today".to_string(),
            Timeframe::Week => "week".to_string(),
            Timeframe::Month => "month".to_string(),
            Timeframe::All => "all".to_string(),
            Timeframe::Custom { start, end } => format!("{start} - {end}"),
        };
        let now = Local::now().naive_local();

        let result = tokio::task::spawn_blocking(move || query_usage(&db_path, &timeframe, now)).await;
        match result {
            Ok(Ok(stats)) => {
                let mut response = ToolResponse::success(format!("Usage for {label}"));
                if let Ok(Value::Object(fields)) = serde_json::to_value(&stats) {
                    for (key, value) in fields {
                        response.insert(key, value);
                    }
                }
                response
            }
            Ok(Err(e)) => ToolResponse::error(e.to_string()),
            Err(e) => ToolResponse::error(format!("Stats query aborted: {e}")),
        }
    }
}

#[async_trait]
impl Tool for StatsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Summarize credits, runs and call counts from the usage log"
    }

    fn input_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "timeframe": {"type": "string", "enum": ["today", "week", "month", "all", "custom"]},
                "start": {"type": "string"},
                "end": {"type": "string"}
            }
        }))
    }

    async fn call(&self, input: Value) -> ToolResponse {
        let input = if input.is_null() { json!({}) } else { input };
        let request = match parse_input::<StatsRequest>(input) {
            Ok(request) => request,
            Err(response) => return response,
        };
        match Timeframe::parse(&request.timeframe, request.start.as_deref(), request.end.as_deref()) {
            Ok(timeframe) => self.stats(timeframe).await,
            Err(e) => ToolResponse::error(e.to_string()),
        }
    }
}
