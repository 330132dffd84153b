//! Archival memory cleanup.
//!
//! Rewrites selected entries of an exported archival memory file, replacing
//! their content with a short summary. Used to scrub memories that carry
//! material which should not be replayed verbatim.

use crate::error::{ToolsError, ToolsResult};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Replacement text used when no summary is supplied.
pub const DEFAULT_SUMMARY: &str = "Memory summarized: the original entry held a full voice script. \
Tone tags like [sighs] or [whispering] belong only in text passed to the send_voice_message tool \
and never appear in regular chat messages.";

/// What a cleanup run changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanReport {
    pub total_entries: usize,
    pub updated: usize,
    /// Requested ids that were not found, sorted
    pub missing_ids: Vec<String>,
    /// Characters removed across all updated entries; negative if the
    /// summary is longer than what it replaced
    pub characters_saved: i64,
}

/// Replace the content of every entry whose `id` is in `target_ids`.
///
/// Entries with a `metadata` object get `length`, `cleaned` and
/// `original_length` updated. Lengths count characters.
///
/// # Errors
///
/// Returns `Validation` when the root is not an array.
pub fn clean_entries(root: &mut Value, target_ids: &[String], summary: &str) -> ToolsResult<CleanReport> {
    let entries = root
        .as_array_mut()
        .ok_or_else(|| ToolsError::validation("Expected a JSON array at root level"))?;

    let wanted: BTreeSet<&str> = target_ids.iter().map(String::as_str).collect();
    let summary_len = summary.chars().count();
    let mut found = BTreeSet::new();
    let mut characters_saved = 0i64;

    for entry in entries.iter_mut() {
        let Some(id) = entry.get("id").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if !wanted.contains(id.as_str()) {
            continue;
        }

        let old_len = entry
            .get("content")
            .and_then(Value::as_str)
            .map(|c| c.chars().count())
            .unwrap_or(0);
        entry["content"] = Value::from(summary);
        if let Some(metadata) = entry.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert("length".into(), json!(summary_len));
            metadata.insert("cleaned".into(), json!(true));
            metadata.insert("original_length".into(), json!(old_len));
        }

        info!(%id, old_len, new_len = summary_len, "Cleaned memory entry");
        characters_saved += old_len as i64 - summary_len as i64;
        found.insert(id);
    }

    let missing_ids: Vec<String> = wanted
        .iter()
        .filter(|id| !found.contains(**id))
        .map(|id| id.to_string())
        .collect();
    if !missing_ids.is_empty() {
        warn!(?missing_ids, "Some memory ids were not found");
    }

    Ok(CleanReport {
        total_entries: entries.len(),
        updated: found.len(),
        missing_ids,
        characters_saved,
    })
}

/// Load `path`, clean it, and write it back pretty-printed.
///
/// The file is only rewritten when the root is a valid array.
pub fn clean_file(path: &Path, target_ids: &[String], summary: &str) -> ToolsResult<CleanReport> {
    let raw = std::fs::read_to_string(path)?;
    let mut root: Value = serde_json::from_str(&raw)?;
    let report = clean_entries(&mut root, target_ids, summary)?;
    std::fs::write(path, serde_json::to_string_pretty(&root)?)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn targeted_entries_are_replaced() {
        let mut root = json!([
            {"id": "a", "content": "0123456789", "metadata": {"length": 10}},
            {"id": "b", "content": "keep me"},
            {"id": "c", "content": "xyz"}
        ]);

        let report = clean_entries(&mut root, &ids(&["a", "c", "zzz"]), "sum").unwrap();

        assert_eq!(report.total_entries, 3);
        assert_eq!(report.updated, 2);
        assert_eq!(report.missing_ids, vec!["zzz".to_string()]);
        assert_eq!(report.characters_saved, (10 - 3) + (3 - 3));
        assert_eq!(root[0]["content"], "sum");
        assert_eq!(
            root[0]["metadata"],
            json!({"length": 3, "cleaned": true, "original_length": 10})
        );
        assert_eq!(root[1]["content"], "keep me");
        assert!(root[2].get("metadata").is_none());
    }

    #[test]
    fn non_array_root_is_rejected() {
        let mut root = json!({"id": "a"});
        let err = clean_entries(&mut root, &ids(&["a"]), "x").unwrap_err();
        assert_eq!(err.to_string(), "Expected a JSON array at root level");
    }

    #[test]
    fn file_round_trip_keeps_unicode_and_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archival_memories.json");
        std::fs::write(
            &path,
            r#"[{"id": "m1", "content": "Grüße 💜", "tags": ["ä"], "metadata": {"source": "x"}}]"#,
        )
        .unwrap();

        let report = clean_file(&path, &ids(&["m1"]), "kurz").unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.characters_saved, 7 - 4);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"ä\""));
        assert!(written.starts_with("[\n  {\n    \"id\": \"m1\""));
        let reread: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(reread[0]["metadata"]["original_length"], 7);
        assert_eq!(reread[0]["metadata"]["source"], "x");
    }

    #[test]
    fn invalid_file_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(&path, r#"{"not": "an array"}"#).unwrap();

        assert!(clean_file(&path, &ids(&["a"]), "x").is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"not": "an array"}"#
        );
    }
}
