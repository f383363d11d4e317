//! Logging for the analytics service.
//!
//! - **Formatting**: [`format::LevelFormatter`] colors console lines by
//!   severity; file lines use the same layout without escapes.
//! - **Sinks**: a stdout [`sink::ConsoleSink`] and a size-rotated
//!   [`rotating::RotatingFileSink`], attached at most once by
//!   [`configure::configure`].
//! - **Redirection**: [`redirect::StreamRedirector`] turns raw stderr-style
//!   writes into ERROR records.
//! - **Setup**: [`facade::LoggingFacade`] wires the above together and routes
//!   `tracing` events through [`layer::LoggerLayer`].

pub mod config;
pub mod configure;
pub mod error;
pub mod facade;
pub mod format;
pub mod layer;
pub mod logger;
pub mod record;
pub mod redirect;
pub mod rotating;
pub mod severity;
pub mod sink;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use configure::{configure, LoggerConfig};
pub use error::{ConfigError, LoggingError};
pub use facade::{LogOptions, LoggingFacade};
pub use logger::Logger;
pub use record::LogRecord;
pub use severity::Severity;
