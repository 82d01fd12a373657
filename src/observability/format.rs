//! Record layout for the fmt layer.
//!
//! Renders every `tracing` event, whether it comes from a [`Logger`] or from a
//! dependency, as one flat record:
//!
//! ```text
//! time, level, [source], msg, service, version, environment, <fields...>
//! ```
//!
//! Logger events carry their field set pre-serialized under
//! [`FIELDS_KEY`]; it is spread back into the record here, so any field name
//! survives the trip through `tracing`'s static field sets.
//!
//! [`Logger`]: crate::observability::Logger

use std::error::Error;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::config::{LogFormat, LoggerConfig};
use crate::observability::fields;
use crate::observability::logging::Fields;

/// Event field holding a logger's serialized field set.
pub(crate) const FIELDS_KEY: &str = "record.fields";

/// Event field holding the `file:line` of the logging call.
pub(crate) const SOURCE_KEY: &str = "record.source";

pub(crate) struct RecordFormat {
    format: LogFormat,
    add_source: bool,
    identity: Fields,
}

impl RecordFormat {
    pub(crate) fn new(config: &LoggerConfig) -> Self {
        let mut identity = Fields::new();
        identity.insert(fields::SERVICE.into(), config.service.clone().into());
        identity.insert(fields::VERSION.into(), config.version.clone().into());
        identity.insert(fields::ENVIRONMENT.into(), config.environment.clone().into());
        Self {
            format: config.format,
            add_source: config.add_source,
            identity,
        }
    }

    pub(crate) fn identity(&self) -> &Fields {
        &self.identity
    }
}

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let mut record = Fields::new();
        record.insert(
            fields::TIME.into(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        record.insert(fields::LEVEL.into(), metadata.level().as_str().into());
        if self.add_source {
            let source = visitor.source.take().or_else(|| {
                metadata
                    .file()
                    .zip(metadata.line())
                    .map(|(file, line)| format!("{file}:{line}"))
            });
            if let Some(source) = source {
                record.insert(fields::SOURCE.into(), source.into());
            }
        }
        record.insert(fields::MESSAGE.into(), visitor.message.into());
        record.extend(self.identity.clone());
        if !visitor.from_logger {
            record.insert(fields::TARGET.into(), metadata.target().into());
        }
        for (key, value) in visitor.fields {
            record.insert(key, value);
        }

        let line = match self.format {
            LogFormat::Json => Value::Object(record).to_string(),
            LogFormat::Text => render_text(&record),
        };
        writeln!(writer, "{line}")
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    source: Option<String>,
    from_logger: bool,
    fields: Fields,
}

impl RecordVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            SOURCE_KEY => self.source = Some(value.to_string()),
            FIELDS_KEY => {
                self.from_logger = true;
                if let Ok(Value::Object(logged)) = serde_json::from_str(value) {
                    self.fields.extend(logged);
                }
            }
            _ => self.insert(field, value.into()),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.insert(field, value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.record_str(field, &rendered);
        }
    }
}

/// `key=value` pairs; values are quoted when they are empty or contain
/// whitespace, `=` or `"`.
fn render_text(record: &Fields) -> String {
    let mut line = String::new();
    for (key, value) in record {
        if !line.is_empty() {
            line.push(' ');
        }
        let value = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        line.push_str(key);
        line.push('=');
        if needs_quoting(&value) {
            line.push_str(&format!("{value:?}"));
        } else {
            line.push_str(&value);
        }
    }
    line
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}
