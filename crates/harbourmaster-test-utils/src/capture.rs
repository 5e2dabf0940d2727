//! Capture `tracing` events so tests can assert on observability records.
//!
//! [`RecordCapture`] is a `tracing_subscriber` layer that stores every event
//! with its structured fields. Install it with `set_default` for the scope
//! of a test:
//!
//! ```ignore
//! let capture = RecordCapture::new();
//! let _guard = tracing_subscriber::registry().with(capture.clone()).set_default();
//! // ... exercise code ...
//! assert_eq!(capture.with_field("status").len(), 1);
//! ```

use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One captured event.
#[derive(Debug, Clone)]
pub struct Record {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Structured fields other than `message`, in emission order.
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// Rendered value of the named field, if the event carried it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A `tracing` layer that captures events into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordCapture {
    records: Arc<Mutex<Vec<Record>>>,
}

impl RecordCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every captured event.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Captured events that carry the named field.
    pub fn with_field(&self, name: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.field(name).is_some())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Subscriber> Layer<S> for RecordCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut records) = self.records.lock() {
            records.push(Record {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}
