//! Fenced JSON blocks embedded in chat messages.
//!
//! Bots on the channel exchange structured data as Markdown code fences
//! tagged `json`. Only the first block of a message is considered.

use serde_json::Value;

const OPEN_FENCE: &str = "```json";
const CLOSE_FENCE: &str = "```";

/// Return the trimmed body of the first ```` ```json ```` block, if it is closed.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find(OPEN_FENCE)? + OPEN_FENCE.len();
    let rest = &text[start..];
    let end = rest.find(CLOSE_FENCE)?;
    Some(rest[..end].trim())
}

/// Decode the first fenced JSON block.
///
/// `None` when the text has no (closed) block, `Some(Err(..))` when the
/// block is present but is not valid JSON.
pub fn decode_json_block(text: &str) -> Option<Result<Value, serde_json::Error>> {
    extract_json_block(text).map(serde_json::from_str)
}

/// Wrap a value into a fenced, pretty-printed JSON block.
pub fn render_json_block(value: &Value) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("{OPEN_FENCE}\n{body}\n{CLOSE_FENCE}")
}
