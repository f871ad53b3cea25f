//! `EnhancedLogger` — an append-only, size-bounded log of structured events
//! describing what the runtime did and why.
//!
//! Grounded in the audit-trail pattern from the teacher's `SecurityPolicy`
//! (`AuditEntry` + a `Mutex`-guarded collection), generalized from a flat
//! `Vec` to a capacity-bounded `VecDeque` with FIFO eviction, and switched to
//! `parking_lot::Mutex` to match the rest of this runtime's locking choices.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_CAPACITY: usize = 2000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Lifecycle,
    Llm,
    Tool,
    Context,
    Tournament,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedLogEntry {
    pub timestamp: DateTime<Utc>,
    pub category: LogCategory,
    pub message: String,
    pub description: Option<String>,
    pub tool_name: Option<String>,
    /// Arguments passed to a tool call, with `tool_description` always
    /// stripped out — that field is surfaced only via `description`.
    pub tool_args: Option<Value>,
}

impl EnhancedLogEntry {
    pub fn new(category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            message: message.into(),
            description: None,
            tool_name: None,
            tool_args: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build a `category=tool` entry, stripping `tool_description` out of the
    /// displayed args and promoting it to the entry's `description` instead.
    pub fn for_tool_call(tool_name: impl Into<String>, mut args: Value, tool_description: Option<&str>) -> Self {
        if let Some(obj) = args.as_object_mut() {
            obj.remove("tool_description");
        }
        let name = tool_name.into();
        let mut entry = Self::new(LogCategory::Tool, format!("invoked '{name}'"))
            .with_tool_name_and_args(name, args);
        if let Some(desc) = tool_description {
            entry.description = Some(desc.to_string());
        }
        entry
    }

    fn with_tool_name_and_args(mut self, name: String, args: Value) -> Self {
        self.tool_name = Some(name);
        self.tool_args = Some(args);
        self
    }
}

/// Bounded, append-only event log. Oldest entries are evicted once `capacity`
/// is exceeded.
pub struct EnhancedLogger {
    entries: Mutex<VecDeque<EnhancedLogEntry>>,
    capacity: usize,
}

impl EnhancedLogger {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
        })
    }

    pub fn emit(&self, entry: EnhancedLogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Return up to `limit` most recent entries (newest last), optionally
    /// filtered to a single category.
    pub fn tail(&self, limit: usize, category: Option<LogCategory>) -> Vec<EnhancedLogEntry> {
        let entries = self.entries.lock();
        let filtered: Vec<&EnhancedLogEntry> = entries
            .iter()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .collect();
        let start = filtered.len().saturating_sub(limit);
        filtered[start..].iter().map(|e| (*e).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EnhancedLogger {
    fn default() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emit_and_tail_round_trip() {
        let logger = EnhancedLogger::new(10);
        logger.emit(EnhancedLogEntry::new(LogCategory::Lifecycle, "started"));
        logger.emit(EnhancedLogEntry::new(LogCategory::Llm, "completion received"));
        let tail = logger.tail(10, None);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].message, "started");
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let logger = EnhancedLogger::new(3);
        for i in 0..5 {
            logger.emit(EnhancedLogEntry::new(LogCategory::Tool, format!("entry {i}")));
        }
        assert_eq!(logger.len(), 3);
        let tail = logger.tail(10, None);
        assert_eq!(tail[0].message, "entry 2");
        assert_eq!(tail[2].message, "entry 4");
    }

    #[test]
    fn tail_filters_by_category() {
        let logger = EnhancedLogger::new(10);
        logger.emit(EnhancedLogEntry::new(LogCategory::Tool, "a"));
        logger.emit(EnhancedLogEntry::new(LogCategory::Error, "b"));
        logger.emit(EnhancedLogEntry::new(LogCategory::Tool, "c"));
        let errors = logger.tail(10, Some(LogCategory::Error));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "b");
    }

    #[test]
    fn for_tool_call_strips_description_from_args_and_promotes_it() {
        let entry = EnhancedLogEntry::for_tool_call(
            "file_write",
            json!({"path": "a.txt", "tool_description": "writing the greeting"}),
            Some("writing the greeting"),
        );
        assert_eq!(entry.description.as_deref(), Some("writing the greeting"));
        assert!(entry.tool_args.unwrap().get("tool_description").is_none());
    }
}
