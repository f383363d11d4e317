use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::record::LogRecord;
use crate::severity::Severity;
use crate::sink::{Sink, SinkKind, Threshold};

/// Logging context: a severity threshold and an ordered list of sinks.
///
/// One instance is created per process and shared as `Arc<Logger>` with every
/// component that emits records.
pub struct Logger {
    threshold: Threshold,
    sinks: RwLock<Vec<Box<dyn Sink>>>,
    failures: AtomicU64,
    error_output: Mutex<Option<Box<dyn Write + Send>>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Unconfigured logger: no sinks, WARNING threshold.
    pub fn new() -> Self {
        Self {
            threshold: Threshold::new(Severity::WARNING),
            sinks: RwLock::new(Vec::new()),
            failures: AtomicU64::new(0),
            error_output: Mutex::new(None),
        }
    }

    pub fn level(&self) -> Severity {
        self.threshold.get()
    }

    pub fn set_level(&self, level: Severity) {
        self.threshold.set(level);
    }

    /// Moves the logger and every attached sink to `level`.
    pub fn set_level_all(&self, level: Severity) {
        self.set_level(level);
        for sink in self.read_sinks().iter() {
            sink.set_threshold(level);
        }
    }

    pub fn is_enabled(&self, level: Severity) -> bool {
        level >= self.level()
    }

    pub fn has_sinks(&self) -> bool {
        !self.read_sinks().is_empty()
    }

    pub fn sink_kinds(&self) -> Vec<SinkKind> {
        self.read_sinks().iter().map(|sink| sink.kind()).collect()
    }

    pub fn add_sink(&self, sink: Box<dyn Sink>) {
        self.write_sinks().push(sink);
    }

    /// Attaches the sinks built by `build` unless any sink is already attached.
    ///
    /// The check and the attach happen under one lock, so concurrent callers
    /// cannot both attach. Returns whether `build` ran.
    pub fn attach_if_empty<E, F>(&self, build: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<Vec<Box<dyn Sink>>, E>,
    {
        let mut sinks = self.write_sinks();
        if !sinks.is_empty() {
            return Ok(false);
        }
        sinks.extend(build()?);
        Ok(true)
    }

    /// Dispatches `record` to every sink whose threshold it meets.
    pub fn emit(&self, record: &LogRecord) {
        if !self.is_enabled(record.level) {
            return;
        }
        for sink in self.read_sinks().iter() {
            if sink.accepts(record.level) {
                if let Err(err) = sink.emit(record) {
                    self.record_failure(sink.kind(), &err);
                }
            }
        }
    }

    /// Where the first sink failure is reported. Must not feed back into
    /// this logger.
    pub fn set_error_output(&self, out: Box<dyn Write + Send>) {
        *self
            .error_output
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(out);
    }

    /// Number of sink writes that failed since creation.
    pub fn sink_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record_failure(&self, kind: SinkKind, err: &std::io::Error) {
        if self.failures.fetch_add(1, Ordering::Relaxed) > 0 {
            return;
        }
        let mut out = self
            .error_output
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(out) = out.as_mut() {
            let _ = writeln!(
                out,
                "logging: {kind:?} sink failed: {err}; further failures are only counted"
            );
        }
    }

    /// Emits `message` located at the caller.
    #[track_caller]
    pub fn log(&self, level: Severity, message: impl Into<String>) {
        if self.is_enabled(level) {
            self.emit(&LogRecord::new(level, message));
        }
    }

    fn read_sinks(&self) -> RwLockReadGuard<'_, Vec<Box<dyn Sink>>> {
        self.sinks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_sinks(&self) -> RwLockWriteGuard<'_, Vec<Box<dyn Sink>>> {
        self.sinks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
