//! Bridge from `tracing` events to the [`Logger`].

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::logger::Logger;
use crate::record::LogRecord;
use crate::severity::Severity;

/// Converts every event into a [`LogRecord`].
///
/// The function name is taken from the innermost span, so functions annotated
/// with `#[tracing::instrument]` show up by name. An ERROR event with
/// `critical = true` is logged as CRITICAL.
pub struct LoggerLayer {
    logger: Arc<Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    // Thresholds change at runtime, so callsites are re-checked on every event.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let mut level = Severity::from(*metadata.level());
        if fields.critical && level == Severity::ERROR {
            level = Severity::CRITICAL;
        }
        if !self.logger.is_enabled(level) {
            return;
        }

        let function = ctx
            .event_span(event)
            .map(|span| span.name().to_string())
            .unwrap_or_else(|| metadata.target().to_string());
        let record = LogRecord::new(level, fields.into_message())
            .with_function(function)
            .with_location(metadata.file().unwrap_or("<unknown>"), metadata.line().unwrap_or(0));
        self.logger.emit(&record);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    extra: Vec<String>,
    critical: bool,
}

impl FieldCollector {
    fn into_message(self) -> String {
        let mut message = self.message;
        for field in self.extra {
            if !message.is_empty() {
                message.push(' ');
            }
            message.push_str(&field);
        }
        message
    }
}

impl Visit for FieldCollector {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "critical" {
            self.critical = value;
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.extra.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.extra.push(format!("{}={:?}", field.name(), value));
        }
    }
}
