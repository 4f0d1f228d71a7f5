//! Captured diagnostic log entries.
//!
//! Entries exist only for the lifetime of one invocation and are
//! appended in the exact order the sandboxed code emits them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Log severity as exposed to sandboxed code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `console.log`
    Log,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
}

impl LogLevel {
    /// Parse a level name coming from the sandbox shim.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "log" => Some(Self::Log),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One captured console emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    #[serde(rename = "type")]
    pub level: LogLevel,
    /// Value snapshots of the arguments, in call order
    pub args: Vec<Value>,
}

impl LogEntry {
    /// Create a new entry from already-snapshotted argument values.
    #[must_use]
    pub fn new(level: LogLevel, args: Vec<Value>) -> Self {
        Self { level, args }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_from_name() {
        assert_eq!(LogLevel::from_name("log"), Some(LogLevel::Log));
        assert_eq!(LogLevel::from_name("warn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_name("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_name("debug"), None);
    }

    #[test]
    fn test_entry_serializes_with_type_field() {
        let entry = LogEntry::new(LogLevel::Warn, vec![json!("careful"), json!(2)]);
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["type"], "warn");
        assert_eq!(v["args"][0], "careful");
        assert_eq!(v["args"][1], 2);
    }

    #[test]
    fn test_entry_round_trip() {
        let entry = LogEntry::new(LogLevel::Log, vec![json!({"a": 1})]);
        let json = serde_json::to_string(&entry).unwrap();
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
