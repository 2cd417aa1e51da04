//! # Event Constants
//!
//! Event types and severity levels shared by the logging collaborator. The
//! event type names are persisted verbatim into the datastore event log, so
//! they keep the names the downstream reports already filter on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event categories recorded by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogEventType {
    /// A run finished without doing work (no stale orders)
    ProcessFailed,
    /// The provider returned nothing for an order, or the provider call failed
    StatusRequestFailed,
    /// A mapping table problem: unmatched key, duplicate key or empty table
    GetMapStatusesDictionaryFailed,
    /// Fatal datastore failure during a run
    DataAccessError,
    /// Fatal failure that fits no other category
    MainProcessFailed,
}

impl LogEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEventType::ProcessFailed => "ProcessFailed",
            LogEventType::StatusRequestFailed => "StatusRequestFailed",
            LogEventType::GetMapStatusesDictionaryFailed => "GetMapStatusesDictionaryFailed",
            LogEventType::DataAccessError => "DataAccessError",
            LogEventType::MainProcessFailed => "MainProcessFailed",
        }
    }
}

impl fmt::Display for LogEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_are_stable() {
        assert_eq!(LogEventType::ProcessFailed.to_string(), "ProcessFailed");
        assert_eq!(
            LogEventType::GetMapStatusesDictionaryFailed.to_string(),
            "GetMapStatusesDictionaryFailed"
        );
        assert_eq!(
            serde_json::to_string(&LogEventType::MainProcessFailed).unwrap(),
            "\"MainProcessFailed\""
        );
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Fatal > LogLevel::Error);
        assert!(LogLevel::Warning > LogLevel::Info);
        assert_eq!(LogLevel::Warning.to_string(), "Warning");
    }
}
