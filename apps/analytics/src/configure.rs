use std::path::PathBuf;

use crate::error::LoggingError;
use crate::format::FileFormat;
use crate::logger::Logger;
use crate::rotating::{RotatingFileSink, RotationPolicy};
use crate::severity::Severity;
use crate::sink::{ConsoleSink, Sink};

/// Sink settings applied by [`configure`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggerConfig {
    pub level: Severity,
    /// Rotating file target; `None` means console only.
    pub file_path: Option<PathBuf>,
    pub rotation: RotationPolicy,
    pub file_format: FileFormat,
}

/// Sets the logger threshold and, on first use, attaches a stdout console sink
/// plus an optional rotating file sink.
///
/// Later calls only update the logger threshold. The file's directory must
/// already exist.
pub fn configure<'a>(logger: &'a Logger, config: &LoggerConfig) -> Result<&'a Logger, LoggingError> {
    logger.set_level(config.level);
    logger.attach_if_empty(|| build_sinks(config, || Box::new(ConsoleSink::stdout(config.level))))?;
    Ok(logger)
}

pub(crate) fn build_sinks(
    config: &LoggerConfig,
    console: impl FnOnce() -> Box<dyn Sink>,
) -> Result<Vec<Box<dyn Sink>>, LoggingError> {
    let mut sinks = vec![console()];
    if let Some(path) = config.file_path.as_ref().filter(|path| !path.as_os_str().is_empty()) {
        sinks.push(Box::new(RotatingFileSink::open(
            path.clone(),
            config.rotation,
            config.file_format,
            config.level,
        )?));
    }
    Ok(sinks)
}
