//! Design History: generated designs the user accepted, newest first.
//!
//! Independent of undo/redo. Entries are added only by an accept and
//! dropped only by a full reset, so a rollback target survives any amount
//! of editing in between.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Prompt length shown in the history list.
pub const PROMPT_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignEntry {
    pub id: String,
    /// The accepted design, as generated.
    #[serde(rename = "fabricJSON")]
    pub document: Value,
    pub prompt: String,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl DesignEntry {
    /// Relative age for the history list: "Just now", "5m ago", "3h ago",
    /// or the calendar date once a day has passed.
    pub fn age_label(&self, now: OffsetDateTime) -> String {
        let minutes = (now - self.created_at).whole_minutes();
        match minutes {
            m if m < 1 => "Just now".to_string(),
            m if m < 60 => format!("{m}m ago"),
            m if m < 24 * 60 => format!("{}h ago", m / 60),
            _ => {
                let date = self.created_at.date();
                format!(
                    "{}-{:02}-{:02}",
                    date.year(),
                    u8::from(date.month()),
                    date.day()
                )
            }
        }
    }

    /// The prompt cut to `max` characters, with "..." when cut.
    pub fn truncated_prompt(&self, max: usize) -> String {
        match self.prompt.char_indices().nth(max) {
            Some((cut, _)) => format!("{}...", &self.prompt[..cut]),
            None => self.prompt.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DesignHistory {
    entries: Vec<DesignEntry>,
}

impl DesignHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted design. Ids are `design_<unix millis>`, bumped
    /// forward on collision.
    pub fn add(&mut self, document: Value, prompt: &str, at: OffsetDateTime) -> &DesignEntry {
        let mut millis = at.unix_timestamp_nanos() / 1_000_000;
        let mut id = format!("design_{millis}");
        while self.get(&id).is_some() {
            millis += 1;
            id = format!("design_{millis}");
        }
        log::debug!("design history: added {id}");
        self.entries.insert(
            0,
            DesignEntry {
                id,
                document,
                prompt: prompt.to_string(),
                created_at: at,
            },
        );
        &self.entries[0]
    }

    pub fn get(&self, id: &str) -> Option<&DesignEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Newest first.
    pub fn entries(&self) -> &[DesignEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&DesignEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use time::Duration;

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(secs)
    }

    #[test]
    fn newest_first_with_unique_ids() {
        let mut history = DesignHistory::new();
        history.add(json!({"objects": []}), "first", at(10));
        history.add(json!({"objects": []}), "second", at(10));
        let ids: Vec<&str> = history.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["design_10001", "design_10000"]);
        assert_eq!(history.latest().map(|e| e.prompt.as_str()), Some("second"));
    }

    #[test]
    fn age_labels() {
        let mut history = DesignHistory::new();
        let entry = history.add(json!({}), "p", at(0)).clone();
        assert_eq!(entry.age_label(at(30)), "Just now");
        assert_eq!(entry.age_label(at(5 * 60)), "5m ago");
        assert_eq!(entry.age_label(at(3 * 3600 + 59)), "3h ago");
        assert_eq!(entry.age_label(at(2 * 86_400)), "1970-01-01");
    }

    #[test]
    fn prompt_truncation_counts_chars() {
        let mut history = DesignHistory::new();
        let long = "é".repeat(60);
        let entry = history.add(json!({}), &long, at(0)).clone();
        let short = entry.truncated_prompt(PROMPT_PREVIEW_CHARS);
        assert_eq!(short.chars().count(), 53);
        assert!(short.ends_with("..."));

        let entry = history.add(json!({}), "tiny", at(1)).clone();
        assert_eq!(entry.truncated_prompt(PROMPT_PREVIEW_CHARS), "tiny");
    }

    #[test]
    fn serializes_with_wire_names() {
        let mut history = DesignHistory::new();
        let entry = history.add(json!({"objects": []}), "poster", at(0));
        let value = serde_json::to_value(entry).unwrap();
        assert_eq!(value["id"], json!("design_0"));
        assert_eq!(value["fabricJSON"], json!({"objects": []}));
        assert_eq!(value["timestamp"], json!("1970-01-01T00:00:00Z"));
    }
}
