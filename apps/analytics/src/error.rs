use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("create log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("open log file {path}: {source}")]
    OpenFile { path: PathBuf, source: io::Error },
    #[error("redirect stderr: {0}")]
    Redirect(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("config line {line}: cannot parse {content:?}")]
    Syntax { line: usize, content: String },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}
