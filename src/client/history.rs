//! Append-only conversation record.

use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::mcp::types::Role;

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Who spoke.
    pub role: Role,
    /// Full, untruncated content.
    pub content: String,
    /// Seconds since the log was created. Never decreases along the log.
    pub timestamp: f64,
    /// Free-form annotations such as `resource_uri` or `error`.
    pub metadata: Map<String, Value>,
}

/// Conversation history. Entries are only ever appended.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    started: Instant,
    entries: Vec<Message>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    /// Creates an empty log whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    /// Appends one entry stamped with the current monotonic time.
    pub fn add(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: Option<Map<String, Value>>,
    ) -> &Message {
        let content = content.into();
        tracing::debug!(
            %role,
            preview = %content.chars().take(100).collect::<String>(),
            "Added message to history"
        );

        let index = self.entries.len();
        self.entries.push(Message {
            role,
            content,
            timestamp: self.started.elapsed().as_secs_f64(),
            metadata: metadata.unwrap_or_default(),
        });
        &self.entries[index]
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// The most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grows_by_one_per_add_in_order() {
        let mut log = HistoryLog::new();
        let before = log.len();

        for i in 0..25 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            log.add(role, format!("turn {i}"), None);
        }

        assert_eq!(log.len(), before + 25);
        for (i, entry) in log.entries().iter().enumerate() {
            assert_eq!(entry.content, format!("turn {i}"));
        }
        assert!(log
            .entries()
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn keeps_metadata() {
        let mut log = HistoryLog::new();
        let mut metadata = Map::new();
        metadata.insert("resource_uri".to_string(), json!("echo://hi"));
        metadata.insert("is_resource".to_string(), json!(true));

        let entry = log.add(Role::User, "Resource echo: hi", Some(metadata));
        assert_eq!(entry.metadata["is_resource"], json!(true));
        assert_eq!(log.last().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn empty_metadata_by_default() {
        let mut log = HistoryLog::default();
        assert!(log.is_empty());
        assert!(log.add(Role::User, "q", None).metadata.is_empty());
    }
}
