//! In-memory capture of tracing events for assertions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event: level, message and its structured fields.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Severity.
    pub level: Level,
    /// The `message` field.
    pub message: String,
    /// Remaining fields, rendered to strings (string values unquoted).
    pub fields: BTreeMap<&'static str, String>,
}

impl CapturedEvent {
    /// Rendered value of a structured field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Shared handle to the events recorded by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().clone()
    }

    fn matching(&self, pred: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.0.lock().iter().filter(|e| pred(e)).cloned().collect()
    }

    /// Whether an event at `level` has a message containing `needle`.
    #[must_use]
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        !self
            .matching(|e| e.level == level && e.message.contains(needle))
            .is_empty()
    }

    /// Number of events at `level`.
    #[must_use]
    pub fn count_at_level(&self, level: Level) -> usize {
        self.matching(|e| e.level == level).len()
    }

    /// Events carrying `name = value`.
    #[must_use]
    pub fn events_with_field(&self, name: &str, value: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.field(name) == Some(value))
    }
}

#[derive(Default)]
struct Recorder {
    message: String,
    fields: BTreeMap<&'static str, String>,
}

impl Recorder {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            let _ = self.fields.insert(field.name(), value);
        }
    }
}

impl Visit for Recorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

struct CaptureLayer(CapturedLogs);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = Recorder::default();
        event.record(&mut recorder);
        self.0.0.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message: recorder.message,
            fields: recorder.fields,
        });
    }
}

/// Record every event on the current thread until the guard drops.
///
/// Async tests must use the current-thread runtime for events to land here.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(CaptureLayer(logs.clone()))
        .set_default();
    (logs, guard)
}
