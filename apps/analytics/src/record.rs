use std::panic::Location;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use crate::severity::Severity;

/// `strftime` layout shared by every rendering of a record's timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Function name recorded when the call site cannot be attributed to one.
pub const UNKNOWN_FUNCTION: &str = "<module>";

/// A single log event. Sinks only ever see it by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,
    pub function: String,
    pub level: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
}

impl LogRecord {
    /// Builds a record stamped now and located at the caller.
    #[track_caller]
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            timestamp: Local::now(),
            function: UNKNOWN_FUNCTION.to_string(),
            level,
            message: message.into(),
            file: file_name(location.file()),
            line: location.line(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        self.file = file_name(file);
        self.line = line;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Last path component, matching how source files are shown in log lines.
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_captures_caller_location() {
        let record = LogRecord::new(Severity::INFO, "hello");
        assert_eq!(record.file, "record.rs");
        assert!(record.line > 0);
        assert_eq!(record.function, UNKNOWN_FUNCTION);
    }

    #[test]
    fn with_location_keeps_only_the_file_name() {
        let record = LogRecord::new(Severity::INFO, "hello").with_location("src/bin/tool.rs", 7);
        assert_eq!(record.file, "tool.rs");
        assert_eq!(record.line, 7);
    }
}
