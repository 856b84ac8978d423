//! Log subscriber setup and the JSON line format.
//!
//! Log format (`logging.format: json`):
//! ```json
//! {"ts":"2024-12-28T15:04:05.123Z","level":"info","type":"access","msg":"GET /links 200","ctx":{"service":"golinks","request_id":"..."},"data":{}}
//! ```
//!
//! With `logging.dir` set, events are appended to `<dir>/golinks.<env>.log`
//! instead of stdout.

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Failure to install the log subscriber.
#[derive(Debug)]
pub enum InitError {
    /// The log file could not be opened.
    File { path: PathBuf, error: io::Error },
    /// A global subscriber is already set.
    Subscriber(TryInitError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::File { path, error } => {
                write!(f, "cannot open log file '{}': {}", path.display(), error)
            }
            InitError::Subscriber(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::File { error, .. } => Some(error),
            InitError::Subscriber(error) => Some(error),
        }
    }
}

/// Install the global subscriber for environment `env`.
///
/// Fails if the log file cannot be opened or a global subscriber is already set.
pub fn init(config: &LoggingConfig, env: &str) -> Result<(), InitError> {
    let filter = EnvFilter::new(config.filter());
    let (writer, ansi) = match config.file_path(env) {
        Some(path) => {
            let file = open_log_file(&path).map_err(|error| InitError::File { path, error })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stdout), true),
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry
            .with(layer.event_format(JsonFormatter::new(config.service_name.clone())))
            .try_init(),
    }
    .map_err(InitError::Subscriber)
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Custom JSON formatter for tracing.
pub struct JsonFormatter {
    service_name: String,
}

impl JsonFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, level: &Level, target: &str, mut visitor: FieldVisitor) -> serde_json::Value {
        let level_name = match *level {
            Level::TRACE | Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };

        let log_type = if target == "access" {
            "access"
        } else if *level == Level::ERROR {
            "error"
        } else {
            "app"
        };

        let msg = if log_type == "access" {
            let field = |name: &str| {
                visitor
                    .fields
                    .get(name)
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "?".to_string())
            };
            format!("{} {} {}", field("method"), field("path"), field("status"))
        } else {
            visitor.message.take().unwrap_or_default()
        };

        let mut ctx = serde_json::Map::new();
        ctx.insert("service".into(), serde_json::json!(self.service_name));
        if let Some(request_id) = visitor.fields.remove("request_id") {
            ctx.insert("request_id".into(), request_id);
        }

        serde_json::json!({
            "ts": iso8601_now(),
            "level": level_name,
            "type": log_type,
            "msg": msg,
            "ctx": ctx,
            "data": visitor.fields,
        })
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
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
        let meta = event.metadata();

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let entry = self.entry(meta.level(), meta.target(), visitor);
        writeln!(writer, "{}", serde_json::to_string(&entry).unwrap_or_default())
    }
}

/// Field visitor for collecting tracing fields.
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, serde_json::Value>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: HashMap::new(),
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let text = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(text.trim_matches('"').to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(text));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso8601_now() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    iso8601(since_epoch.as_secs(), since_epoch.subsec_millis())
}

fn iso8601(secs: u64, millis: u32) -> String {
    let days = (secs / 86_400) as i64;
    let day_secs = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year,
        month,
        day,
        day_secs / 3600,
        (day_secs % 3600) / 60,
        day_secs % 60,
        millis
    )
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601() {
        assert_eq!(iso8601(0, 0), "1970-01-01T00:00:00.000Z");
        // 2024-02-29 12:34:56 UTC
        assert_eq!(iso8601(1_709_210_096, 789), "2024-02-29T12:34:56.789Z");
        // 2000-03-01 00:00:00 UTC
        assert_eq!(iso8601(951_868_800, 5), "2000-03-01T00:00:00.005Z");
    }

    #[test]
    fn test_iso8601_now_shape() {
        let ts = iso8601_now();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn test_access_entry() {
        let formatter = JsonFormatter::new("golinks");
        let mut visitor = FieldVisitor::new();
        visitor.fields.insert("method".into(), serde_json::json!("GET"));
        visitor.fields.insert("path".into(), serde_json::json!("/links"));
        visitor.fields.insert("status".into(), serde_json::json!(200));
        visitor
            .fields
            .insert("request_id".into(), serde_json::json!("abc"));

        let entry = formatter.entry(&Level::INFO, "access", visitor);

        assert_eq!(entry["type"], "access");
        assert_eq!(entry["level"], "info");
        assert_eq!(entry["msg"], "GET /links 200");
        assert_eq!(entry["ctx"]["service"], "golinks");
        assert_eq!(entry["ctx"]["request_id"], "abc");
        assert!(entry["data"].get("request_id").is_none());
        assert_eq!(entry["data"]["status"], 200);
    }

    #[test]
    fn test_events_appended_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("golinks.testing.log");

        for id in ["r1", "r2"] {
            let file = open_log_file(&path).unwrap();
            let subscriber = tracing_subscriber::registry().with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .event_format(JsonFormatter::new("golinks")),
            );
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(
                    target: "access",
                    method = "GET",
                    path = "/go",
                    status = 301u16,
                    request_id = id,
                    "request completed"
                );
            });
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "access");
        assert_eq!(lines[0]["msg"], "GET /go 301");
        assert_eq!(lines[0]["ctx"]["request_id"], "r1");
        assert_eq!(lines[1]["ctx"]["request_id"], "r2");
    }

    #[test]
    fn test_error_entry() {
        let formatter = JsonFormatter::new("golinks");
        let mut visitor = FieldVisitor::new();
        visitor.message = Some("store failed".into());
        visitor.fields.insert("status".into(), serde_json::json!(500));

        let entry = formatter.entry(&Level::ERROR, "golinks::router", visitor);

        assert_eq!(entry["type"], "error");
        assert_eq!(entry["level"], "error");
        assert_eq!(entry["msg"], "store failed");
        assert!(entry["ctx"].get("request_id").is_none());
    }
}
