use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use crate::format::LevelFormatter;
use crate::record::LogRecord;
use crate::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
}

/// A destination for formatted records.
///
/// Each sink owns its threshold and formatter and serializes its own writes,
/// so `emit` may be called from any thread.
pub trait Sink: Send + Sync {
    fn kind(&self) -> SinkKind;

    fn threshold(&self) -> Severity;

    fn set_threshold(&self, level: Severity);

    fn accepts(&self, level: Severity) -> bool {
        level >= self.threshold()
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()>;
}

/// Atomic severity threshold shared by the sink implementations.
#[derive(Debug)]
pub(crate) struct Threshold(AtomicU8);

impl Threshold {
    pub(crate) fn new(level: Severity) -> Self {
        Self(AtomicU8::new(level.as_number()))
    }

    pub(crate) fn get(&self) -> Severity {
        Severity::from_number(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, level: Severity) {
        self.0.store(level.as_number(), Ordering::Relaxed);
    }
}

/// Writes colorized lines to a terminal stream.
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
    formatter: LevelFormatter,
    threshold: Threshold,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(level: Severity) -> Self {
        Self::new(io::stdout(), level)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, level: Severity) -> Self {
        Self {
            out: Mutex::new(out),
            formatter: LevelFormatter::colored(),
            threshold: Threshold::new(level),
        }
    }

    pub fn with_formatter(mut self, formatter: LevelFormatter) -> Self {
        self.formatter = formatter;
        self
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    fn threshold(&self) -> Severity {
        self.threshold.get()
    }

    fn set_threshold(&self, level: Severity) {
        self.threshold.set(level);
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let line = self.formatter.render(record);
        // A panic while holding the lock leaves the writer usable.
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{line}")?;
        out.flush()
    }
}
