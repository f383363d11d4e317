//! Size-bounded file sink.
//!
//! The active file is `path`; backups are `path.1` (newest) through
//! `path.<backup_count>` (oldest). Rotation happens before a write that would
//! reach `max_bytes`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::LoggingError;
use crate::format::FileFormat;
use crate::record::LogRecord;
use crate::severity::Severity;
use crate::sink::{Sink, SinkKind, Threshold};

pub const DEFAULT_MAX_BYTES: u64 = 200_000_000;
pub const DEFAULT_BACKUP_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

impl RotationPolicy {
    /// A zero size limit or zero backups means the file is never rotated.
    pub fn enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }
}

struct ActiveFile {
    file: File,
    size: u64,
}

pub struct RotatingFileSink {
    path: PathBuf,
    policy: RotationPolicy,
    format: FileFormat,
    threshold: Threshold,
    active: Mutex<ActiveFile>,
}

impl RotatingFileSink {
    /// Opens `path` for appending. The parent directory must already exist.
    pub fn open(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
        format: FileFormat,
        level: Severity,
    ) -> Result<Self, LoggingError> {
        let path = path.into();
        let active = open_append(&path).map_err(|source| LoggingError::OpenFile {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            policy,
            format,
            threshold: Threshold::new(level),
            active: Mutex::new(active),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn should_rotate(&self, active: &ActiveFile, incoming: u64) -> bool {
        self.policy.enabled() && active.size > 0 && active.size + incoming >= self.policy.max_bytes
    }

    fn rotate(&self, active: &mut ActiveFile) -> io::Result<()> {
        active.file.flush()?;
        for index in (1..self.policy.backup_count).rev() {
            let source = self.backup_path(index);
            if source.exists() {
                replace(&source, &self.backup_path(index + 1))?;
            }
        }
        replace(&self.path, &self.backup_path(1))?;
        *active = open_append(&self.path)?;
        Ok(())
    }
}

impl Sink for RotatingFileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn threshold(&self) -> Severity {
        self.threshold.get()
    }

    fn set_threshold(&self, level: Severity) {
        self.threshold.set(level);
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let mut line = self.format.render(record)?;
        line.push('\n');
        let incoming = line.len() as u64;

        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.should_rotate(&active, incoming) {
            self.rotate(&mut active)?;
        }
        active.file.write_all(line.as_bytes())?;
        active.size += incoming;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<ActiveFile> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok(ActiveFile { file, size })
}

fn replace(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit_message(sink: &RotatingFileSink, message: &str) {
        sink.emit(&LogRecord::new(Severity::INFO, message))
            .expect("emit");
    }

    fn log_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn appends_plain_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.log");
        let sink = RotatingFileSink::open(
            &path,
            RotationPolicy::default(),
            FileFormat::Plain,
            Severity::INFO,
        )
        .expect("open");
        emit_message(&sink, "first");
        emit_message(&sink, "second");

        let contents = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" - INFO - first (rotating.rs:"));
        assert!(!contents.contains('\x1b'));
    }

    #[test]
    fn keeps_at_most_backup_count_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.log");
        let policy = RotationPolicy {
            max_bytes: 100,
            backup_count: 2,
        };
        let sink =
            RotatingFileSink::open(&path, policy, FileFormat::Plain, Severity::INFO).expect("open");

        // Each rendered line is longer than 100 bytes, so every write after
        // the first rotates.
        let filler = "x".repeat(80);
        for index in 0..4 {
            emit_message(&sink, &format!("record-{index} {filler}"));
        }

        assert_eq!(log_files(temp.path()), vec!["run.log", "run.log.1", "run.log.2"]);
        let active = fs::read_to_string(&path).expect("active");
        let newest_backup = fs::read_to_string(temp.path().join("run.log.1")).expect("backup 1");
        let oldest_backup = fs::read_to_string(temp.path().join("run.log.2")).expect("backup 2");
        assert!(active.contains("record-3"));
        assert!(newest_backup.contains("record-2"));
        assert!(oldest_backup.contains("record-1"));
        assert!(!format!("{active}{newest_backup}{oldest_backup}").contains("record-0"));
    }

    #[test]
    fn concurrent_writers_never_split_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.log");
        let policy = RotationPolicy {
            max_bytes: 4_096,
            backup_count: 50,
        };
        let sink =
            RotatingFileSink::open(&path, policy, FileFormat::Plain, Severity::INFO).expect("open");

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let sink = &sink;
                scope.spawn(move || {
                    for index in 0..50 {
                        emit_message(sink, &format!("writer-{writer} record-{index} end"));
                    }
                });
            }
        });

        let mut lines = Vec::new();
        for name in log_files(temp.path()) {
            let contents = fs::read_to_string(temp.path().join(name)).expect("read");
            lines.extend(contents.lines().map(str::to_string));
        }
        assert_eq!(lines.len(), 400);
        for line in &lines {
            assert!(line.contains(" - INFO - writer-"), "{line}");
            assert!(line.ends_with(')'), "{line}");
            assert_eq!(line.matches(" end (rotating.rs:").count(), 1, "{line}");
        }
    }

    #[test]
    fn json_lines_are_counted_and_parseable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.jsonl");
        let sink = RotatingFileSink::open(
            &path,
            RotationPolicy::default(),
            FileFormat::Json,
            Severity::INFO,
        )
        .expect("open");
        emit_message(&sink, "structured");

        let contents = fs::read_to_string(&path).expect("read");
        let value: serde_json::Value =
            serde_json::from_str(contents.trim_end()).expect("json line");
        assert_eq!(value["message"], "structured");
    }

    #[test]
    fn zero_backups_never_rotates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.log");
        let policy = RotationPolicy {
            max_bytes: 10,
            backup_count: 0,
        };
        let sink =
            RotatingFileSink::open(&path, policy, FileFormat::Plain, Severity::INFO).expect("open");
        emit_message(&sink, "one");
        emit_message(&sink, "two");

        assert_eq!(log_files(temp.path()), vec!["run.log"]);
        assert_eq!(fs::read_to_string(&path).expect("read").lines().count(), 2);
    }

    #[test]
    fn existing_content_counts_toward_limit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run.log");
        fs::write(&path, "y".repeat(95)).expect("seed");
        let policy = RotationPolicy {
            max_bytes: 100,
            backup_count: 1,
        };
        let sink =
            RotatingFileSink::open(&path, policy, FileFormat::Plain, Severity::INFO).expect("open");
        emit_message(&sink, "fresh");

        assert_eq!(
            fs::read_to_string(temp.path().join("run.log.1")).expect("backup"),
            "y".repeat(95)
        );
        assert!(fs::read_to_string(&path).expect("active").contains("fresh"));
    }

    #[test]
    fn missing_directory_is_an_open_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("absent").join("run.log");
        let result =
            RotatingFileSink::open(&path, RotationPolicy::default(), FileFormat::Plain, Severity::INFO);
        assert!(matches!(result, Err(LoggingError::OpenFile { .. })));
    }
}
