//! One-call logging setup for the process.
//!
//! [`LoggingFacade::initialize`] creates the log directory, attaches sinks,
//! routes `tracing` events into the logger and takes over the process's
//! standard error, so panic reports and anything else written to fd 2 become
//! ERROR records. Repeated calls never duplicate sinks or chain redirectors.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};

use gag::Redirect;
use os_pipe::{PipeReader, PipeWriter};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::configure::{configure, LoggerConfig};
use crate::error::LoggingError;
use crate::format::FileFormat;
use crate::layer::LoggerLayer;
use crate::logger::Logger;
use crate::redirect::StreamRedirector;
use crate::rotating::RotationPolicy;
use crate::severity::Severity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Defaults to the current directory.
    pub log_dir: Option<PathBuf>,
    /// File name inside `log_dir`; `None` disables the file sink.
    pub log_name: Option<PathBuf>,
    pub level: Severity,
    pub rotation: RotationPolicy,
    pub file_format: FileFormat,
    /// Replace the process's standard error with the redirector.
    pub redirect_stderr: bool,
    /// Install the `tracing` bridge as the global subscriber.
    pub install_tracing: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_name: None,
            level: Severity::INFO,
            rotation: RotationPolicy::default(),
            file_format: FileFormat::Plain,
            redirect_stderr: true,
            install_tracing: true,
        }
    }
}

impl LogOptions {
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_name.as_ref().map(|name| self.log_dir().join(name))
    }
}

pub struct LoggingFacade {
    logger: Arc<Logger>,
    stderr: OnceLock<Arc<StreamRedirector>>,
    capture: Mutex<Option<StderrCapture>>,
    redirected: AtomicBool,
    tracing_installed: AtomicBool,
}

impl Default for LoggingFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingFacade {
    pub fn new() -> Self {
        Self::with_logger(Arc::new(Logger::new()))
    }

    pub fn with_logger(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            stderr: OnceLock::new(),
            capture: Mutex::new(None),
            redirected: AtomicBool::new(false),
            tracing_installed: AtomicBool::new(false),
        }
    }

    pub fn logger(&self) -> Arc<Logger> {
        Arc::clone(&self.logger)
    }

    pub fn is_redirected(&self) -> bool {
        self.redirected.load(Ordering::Acquire)
    }

    /// Redirector standing in for stderr, once redirection is installed.
    pub fn stderr(&self) -> Option<Arc<StreamRedirector>> {
        self.stderr.get().cloned()
    }

    pub fn initialize(&self, options: &LogOptions) -> Result<Arc<Logger>, LoggingError> {
        let dir = options.log_dir();
        fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let config = LoggerConfig {
            level: options.level,
            file_path: options.log_file(),
            rotation: options.rotation,
            file_format: options.file_format,
        };
        configure(&self.logger, &config)?;

        if options.install_tracing {
            self.install_tracing();
        }
        if options.redirect_stderr {
            self.redirect_stderr()?;
        }
        Ok(self.logger())
    }

    fn install_tracing(&self) {
        if self.tracing_installed.swap(true, Ordering::AcqRel) {
            return;
        }
        let result = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().ok())
            .with(LoggerLayer::new(self.logger()))
            .try_init();
        if result.is_err() {
            self.logger.log(
                Severity::DEBUG,
                "global tracing subscriber already set; keeping it",
            );
        }
    }

    /// Points fd 2 at a pipe drained into a [`StreamRedirector`].
    ///
    /// The original stderr is kept as the logger's error output. Only one
    /// facade per process can hold the redirection.
    fn redirect_stderr(&self) -> Result<(), LoggingError> {
        if self.redirected.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let redirector = Arc::new(StreamRedirector::new(self.logger()));
        match StderrCapture::start(Arc::clone(&redirector)) {
            Ok((capture, original)) => {
                self.logger.set_error_output(Box::new(original));
                *self
                    .capture
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(capture);
                let _ = self.stderr.set(redirector);
                Ok(())
            }
            Err(source) => {
                self.redirected.store(false, Ordering::Release);
                Err(LoggingError::Redirect(source))
            }
        }
    }
}

/// Live redirection of fd 2. Dropping it restores stderr and waits for the
/// reader to log what was still in the pipe.
struct StderrCapture {
    redirect: Option<Redirect<PipeWriter>>,
    reader: Option<JoinHandle<()>>,
}

impl StderrCapture {
    fn start(redirector: Arc<StreamRedirector>) -> io::Result<(Self, PipeWriter)> {
        let original = os_pipe::dup_stderr()?;
        let (read_end, write_end) = os_pipe::pipe()?;
        let redirect = Redirect::stderr(write_end)?;
        let reader = thread::Builder::new()
            .name("stderr-redirect".into())
            .spawn(move || drain(read_end, &redirector))?;
        Ok((
            Self {
                redirect: Some(redirect),
                reader: Some(reader),
            },
            original,
        ))
    }
}

impl Drop for StderrCapture {
    fn drop(&mut self) {
        // Closing the write end lets the reader see EOF.
        self.redirect.take();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Hands the redirector one line at a time so a pipe read never splits a line.
fn drain(read_end: PipeReader, redirector: &StreamRedirector) {
    let mut reader = BufReader::new(read_end);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => redirector.write_bytes(&line),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}
