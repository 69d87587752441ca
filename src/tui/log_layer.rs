use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::app::{LogBuffer, LogEntry};

/// Maximum number of log entries to keep in buffer
const DEFAULT_BUFFER_CAPACITY: usize = 500;

/// Tracing layer that captures log events into the log panel buffer
pub struct TuiLogLayer {
    buffer: LogBuffer,
    capacity: usize,
    /// Minimum level to capture (default: INFO)
    min_level: Level,
}

impl TuiLogLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            capacity: DEFAULT_BUFFER_CAPACITY,
            min_level: Level::INFO,
        }
    }

    /// Fresh empty buffer sized for this layer
    pub fn buffer() -> LogBuffer {
        Arc::new(Mutex::new(VecDeque::with_capacity(DEFAULT_BUFFER_CAPACITY)))
    }
}

impl<S> Layer<S> for TuiLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.level() > &self.min_level {
            return;
        }

        let mut message = String::new();
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp: chrono::Utc::now(),
            level: *metadata.level(),
            message,
        };

        // Skip the entry rather than block a measurement task on the UI's lock
        if let Ok(mut buffer) = self.buffer.try_lock() {
            while buffer.len() >= self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(entry);
        }
    }
}

/// Collects the message plus `key=value` pairs for every other field
struct MessageVisitor<'a>(&'a mut String);

impl MessageVisitor<'_> {
    fn push_field(&mut self, name: &str, value: String) {
        if name == "message" {
            if self.0.is_empty() {
                *self.0 = value;
            } else {
                *self.0 = format!("{} {}", value, self.0);
            }
        } else if self.0.is_empty() {
            *self.0 = format!("{}={}", name, value);
        } else {
            self.0.push_str(&format!(" {}={}", name, value));
        }
    }
}

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let mut text = format!("{:?}", value);
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            text = text[1..text.len() - 1].to_string();
        }
        self.push_field(field.name(), text);
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push_field(field.name(), value.to_string());
    }
}
