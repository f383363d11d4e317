//! Rendering of [`LogRecord`]s into text lines.
//!
//! Console output is colorized by severity through a lookup table; file output
//! uses the same field layout without escapes, or one JSON object per line.

use std::collections::BTreeMap;
use std::str::FromStr;

use colored::{ColoredString, Colorize};

use crate::error::ConfigError;
use crate::record::{LogRecord, TIMESTAMP_FORMAT};
use crate::severity::Severity;

/// Terminal display style for a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Grey,
    Yellow,
    Red,
    BoldRed,
    BoldBrightRed,
}

impl Style {
    pub fn paint(self, line: &str) -> ColoredString {
        match self {
            Style::Grey => line.white(),
            Style::Yellow => line.yellow(),
            Style::Red => line.red(),
            Style::BoldRed => line.red().bold(),
            Style::BoldBrightRed => line.bright_red().bold(),
        }
    }
}

/// Formats records as `<timestamp> - <function> - <level> - <message> (<file>:<line>)`.
///
/// A colored formatter wraps the line in the style looked up for the record's
/// severity; severities missing from the table get [`Style::Grey`].
#[derive(Debug, Clone)]
pub struct LevelFormatter {
    styles: Option<BTreeMap<Severity, Style>>,
}

impl LevelFormatter {
    /// Console formatter with the default severity table.
    pub fn colored() -> Self {
        let styles = BTreeMap::from([
            (Severity::DEBUG, Style::Grey),
            (Severity::INFO, Style::Grey),
            (Severity::WARNING, Style::Yellow),
            (Severity::ERROR, Style::Red),
            (Severity::CRITICAL, Style::BoldRed),
        ]);
        Self {
            styles: Some(styles),
        }
    }

    /// Same fields, no escape codes.
    pub fn plain() -> Self {
        Self { styles: None }
    }

    pub fn with_style(mut self, level: Severity, style: Style) -> Self {
        self.styles
            .get_or_insert_with(BTreeMap::new)
            .insert(level, style);
        self
    }

    pub fn style_for(&self, level: Severity) -> Style {
        self.styles
            .as_ref()
            .and_then(|styles| styles.get(&level).copied())
            .unwrap_or(Style::Grey)
    }

    pub fn render(&self, record: &LogRecord) -> String {
        let line = format!(
            "{} - {} - {} - {} ({}:{})",
            record.timestamp.format(TIMESTAMP_FORMAT),
            record.function,
            record.level,
            record.message,
            record.file,
            record.line,
        );
        match self.styles {
            Some(_) => self.style_for(record.level).paint(&line).to_string(),
            None => line,
        }
    }
}

/// On-disk layout of the rotating file sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Plain,
    Json,
}

impl FileFormat {
    pub fn render(self, record: &LogRecord) -> serde_json::Result<String> {
        match self {
            FileFormat::Plain => Ok(LevelFormatter::plain().render(record)),
            FileFormat::Json => serde_json::to_string(record),
        }
    }
}

impl FromStr for FileFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(FileFormat::Plain),
            "json" => Ok(FileFormat::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "file_format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn record(level: Severity) -> LogRecord {
        let timestamp = Local
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 45)
            .single()
            .expect("unambiguous local time");
        LogRecord::new(level, "disk almost full")
            .with_function("collect")
            .with_location("src/collector.rs", 42)
            .with_timestamp(timestamp)
    }

    const LINE: &str = "2024-05-01 12:30:45 - collect - WARNING - disk almost full (collector.rs:42)";

    #[test]
    fn every_named_level_renders_name_and_location() {
        colored::control::set_override(true);
        let formatter = LevelFormatter::colored();
        for level in [
            Severity::DEBUG,
            Severity::INFO,
            Severity::WARNING,
            Severity::ERROR,
            Severity::CRITICAL,
        ] {
            let line = formatter.render(&record(level));
            let name = level.known_name().expect("named level");
            assert!(line.contains(name), "{line}");
            assert!(line.contains("(collector.rs:42)"), "{line}");
            assert!(line.starts_with('\x1b'), "{line}");
        }
    }

    #[test]
    fn colored_line_uses_style_for_level() {
        colored::control::set_override(true);
        let formatter = LevelFormatter::colored();
        let line = formatter.render(&record(Severity::WARNING));
        assert_eq!(line, LINE.yellow().to_string());
        assert_eq!(formatter.style_for(Severity::ERROR), Style::Red);
        assert_eq!(formatter.style_for(Severity::CRITICAL), Style::BoldRed);
    }

    #[test]
    fn unknown_level_falls_back_to_grey() {
        colored::control::set_override(true);
        let formatter = LevelFormatter::colored();
        let level = Severity::from_number(35);
        assert_eq!(formatter.style_for(level), Style::Grey);
        let line = formatter.render(&record(level));
        let plain = LevelFormatter::plain().render(&record(level));
        assert!(plain.contains(" - Level 35 - disk almost full (collector.rs:42)"));
        assert_eq!(line, Style::Grey.paint(&plain).to_string());
    }

    #[test]
    fn plain_formatter_has_no_escapes() {
        let line = LevelFormatter::plain().render(&record(Severity::ERROR));
        assert_eq!(
            line,
            "2024-05-01 12:30:45 - collect - ERROR - disk almost full (collector.rs:42)"
        );
    }

    #[test]
    fn custom_style_overrides_default() {
        let formatter = LevelFormatter::colored().with_style(Severity::CRITICAL, Style::BoldBrightRed);
        assert_eq!(formatter.style_for(Severity::CRITICAL), Style::BoldBrightRed);
        assert_eq!(formatter.style_for(Severity::ERROR), Style::Red);
    }

    #[test]
    fn json_format_writes_one_object() {
        let line = FileFormat::Json.render(&record(Severity::INFO)).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["function"], "collect");
        assert_eq!(value["timestamp"], "2024-05-01 12:30:45");
        assert_eq!(value["line"], 42);
        assert!(!line.contains('\n'));
    }
}
