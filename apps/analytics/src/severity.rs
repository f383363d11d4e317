use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Ordered severity of a log record.
///
/// Stored as a number so that values outside the named set are still
/// representable; those compare numerically and render as `Level <n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(u8);

impl Severity {
    pub const DEBUG: Severity = Severity(10);
    pub const INFO: Severity = Severity(20);
    pub const WARNING: Severity = Severity(30);
    pub const ERROR: Severity = Severity(40);
    pub const CRITICAL: Severity = Severity(50);

    pub const fn from_number(value: u8) -> Self {
        Severity(value)
    }

    pub const fn as_number(self) -> u8 {
        self.0
    }

    /// Name of a known level, `None` for anything else.
    pub fn known_name(self) -> Option<&'static str> {
        match self {
            Severity::DEBUG => Some("DEBUG"),
            Severity::INFO => Some("INFO"),
            Severity::WARNING => Some("WARNING"),
            Severity::ERROR => Some("ERROR"),
            Severity::CRITICAL => Some("CRITICAL"),
            _ => None,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::INFO
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Level {}", self.0),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSeverityError(pub String);

impl fmt::Display for ParseSeverityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown severity {:?}", self.0)
    }
}

impl std::error::Error for ParseSeverityError {}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::DEBUG),
            "INFO" => Ok(Severity::INFO),
            "WARNING" | "WARN" => Ok(Severity::WARNING),
            "ERROR" => Ok(Severity::ERROR),
            "CRITICAL" => Ok(Severity::CRITICAL),
            _ => trimmed
                .parse::<u8>()
                .map(Severity)
                .map_err(|_| ParseSeverityError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::DEBUG,
            tracing::Level::INFO => Severity::INFO,
            tracing::Level::WARN => Severity::WARNING,
            tracing::Level::ERROR => Severity::ERROR,
        }
    }
}
