//! INI configuration file.
//!
//! ```ini
//! [Logging]
//! log_path = logs
//! log_name = analytics.log
//! level = debug
//! max_bytes = 1048576
//! backup_count = 3
//! file_format = json
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::facade::LogOptions;
use crate::format::FileFormat;
use crate::severity::Severity;

pub const DEFAULT_CONFIG_PATH: &str = "config.ini";
pub const LOGGING_SECTION: &str = "Logging";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Reads `path`. A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut current_section: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                config.sections.entry(name.clone()).or_default();
                current_section = Some(name);
                continue;
            }

            let Some(pos) = line.find(['=', ':']) else {
                return Err(ConfigError::Syntax {
                    line: index + 1,
                    content: raw.to_string(),
                });
            };
            let key = line[..pos].trim().to_lowercase();
            let value = line[pos + 1..].trim().trim_matches('"').to_string();

            match &current_section {
                None => {
                    config.globals.insert(key, value);
                }
                Some(section) => {
                    config
                        .sections
                        .entry(section.clone())
                        .or_default()
                        .insert(key, value);
                }
            }
        }
        Ok(config)
    }

    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    /// Builds facade options from the `[Logging]` section.
    pub fn log_options(&self) -> Result<LogOptions, ConfigError> {
        let mut options = LogOptions::default();
        if let Some(dir) = self.get_non_empty(LOGGING_SECTION, "log_path") {
            options.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(name) = self.get_non_empty(LOGGING_SECTION, "log_name") {
            options.log_name = Some(PathBuf::from(name));
        }
        if let Some(level) = self.parsed::<Severity>("level")? {
            options.level = level;
        }
        if let Some(max_bytes) = self.parsed::<u64>("max_bytes")? {
            options.rotation.max_bytes = max_bytes;
        }
        if let Some(backup_count) = self.parsed::<usize>("backup_count")? {
            options.rotation.backup_count = backup_count;
        }
        if let Some(format) = self.get_non_empty(LOGGING_SECTION, "file_format") {
            options.file_format = FileFormat::from_str(format)?;
        }
        Ok(options)
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get_non_empty(LOGGING_SECTION, key)
            .map(|value| {
                value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_globals_and_comments() {
        let config = Config::parse(
            "owner = data-team\n# comment\n; another\n\n[Logging]\nLevel: debug\nlog_name = \"run.log\"\n[Empty]\n",
        )
        .expect("parse");
        assert_eq!(config.globals.get("owner").map(String::as_str), Some("data-team"));
        assert_eq!(config.get("Logging", "level"), Some("debug"));
        assert_eq!(config.get("Logging", "LOG_NAME"), Some("run.log"));
        assert_eq!(config.section_names(), vec!["Empty", "Logging"]);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = Config::parse("[Logging]\nnot a pair\n").expect_err("syntax error");
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn missing_file_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = Config::load(&temp.path().join("config.ini")).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.log_options().expect("options"), LogOptions::default());
    }

    #[test]
    fn logging_section_overrides_defaults() {
        let config = Config::parse(
            "[Logging]\nlog_path = logs\nlog_name = analytics.log\nlevel = warning\nmax_bytes = 1024\nbackup_count = 2\nfile_format = json\n",
        )
        .expect("parse");
        let options = config.log_options().expect("options");
        assert_eq!(options.log_file(), Some(PathBuf::from("logs/analytics.log")));
        assert_eq!(options.level, Severity::WARNING);
        assert_eq!(options.rotation.max_bytes, 1024);
        assert_eq!(options.rotation.backup_count, 2);
        assert_eq!(options.file_format, FileFormat::Json);
    }

    #[test]
    fn invalid_value_names_the_key() {
        let config = Config::parse("[Logging]\nmax_bytes = lots\n").expect("parse");
        let err = config.log_options().expect_err("invalid");
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_bytes"));
    }
}
