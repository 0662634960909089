//! Status events for corpus operations.
//!
//! Corpus operations never fail on unresolved imports or references; they
//! report them here instead. A corpus carries one [`EventCallback`] with a
//! report threshold, and every event is mirrored to `tracing`.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

// ============================================================================
// EVENT TYPES
// ============================================================================

/// Severity of a reported event, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusLevel {
    Error,
    Warning,
    Info,
    Progress,
}

impl StatusLevel {
    /// Whether an event at `self` passes a callback registered at `threshold`.
    pub fn reaches(self, threshold: StatusLevel) -> bool {
        self <= threshold
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusLevel::Error => "error",
            StatusLevel::Warning => "warning",
            StatusLevel::Info => "info",
            StatusLevel::Progress => "progress",
        };
        f.write_str(name)
    }
}

/// A recorded event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub level: StatusLevel,
    pub message: Arc<str>,
}

/// Sink for status events.
pub trait EventCallback: Send + Sync {
    fn report(&self, level: StatusLevel, message: &str);
}

impl<F> EventCallback for F
where
    F: Fn(StatusLevel, &str) + Send + Sync,
{
    fn report(&self, level: StatusLevel, message: &str) {
        self(level, message)
    }
}

// ============================================================================
// EVENT CODES
// ============================================================================

/// Stable codes prefixed to event messages.
pub mod codes {
    /// An import path did not resolve to a document.
    pub const UNRESOLVED_IMPORT: &str = "E1001";
    /// A symbol reference did not resolve.
    pub const UNRESOLVED_REFERENCE: &str = "E1002";
    /// The storage adapter failed to load a document.
    pub const DOCUMENT_LOAD_FAILED: &str = "E1003";
}

// ============================================================================
// EVENT COLLECTOR
// ============================================================================

/// Collects events reported to it. Cheap to clone; clones share storage.
#[derive(Clone, Debug, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.count(StatusLevel::Error)
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.count(StatusLevel::Warning)
    }

    fn count(&self, level: StatusLevel) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    /// Events whose message contains `needle`.
    pub fn messages_containing(&self, needle: &str) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.message.contains(needle))
            .cloned()
            .collect()
    }

    /// Check if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Take all events, leaving the collector empty.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventCallback for EventCollector {
    fn report(&self, level: StatusLevel, message: &str) {
        self.events.lock().push(Event {
            level,
            message: Arc::from(message),
        });
    }
}

// ============================================================================
// EVENT SINK
// ============================================================================

/// The callback a corpus reports to, with its threshold.
#[derive(Clone)]
pub(crate) struct EventSink {
    callback: Option<Arc<dyn EventCallback>>,
    threshold: StatusLevel,
}

impl Default for EventSink {
    fn default() -> Self {
        Self {
            callback: None,
            threshold: StatusLevel::Warning,
        }
    }
}

impl EventSink {
    pub(crate) fn new(callback: Arc<dyn EventCallback>, threshold: StatusLevel) -> Self {
        Self {
            callback: Some(callback),
            threshold,
        }
    }

    /// Report an event about `document`.
    pub(crate) fn emit(&self, level: StatusLevel, code: &str, document: &str, message: &str) {
        match level {
            StatusLevel::Error => tracing::error!(code, document, "{message}"),
            StatusLevel::Warning => tracing::warn!(code, document, "{message}"),
            StatusLevel::Info => tracing::info!(code, document, "{message}"),
            StatusLevel::Progress => tracing::debug!(code, document, "{message}"),
        }

        if let Some(callback) = &self.callback {
            if level.reaches(self.threshold) {
                callback.report(level, &format!("{code}: {message} (in {document})"));
            }
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("has_callback", &self.callback.is_some())
            .field("threshold", &self.threshold)
            .finish()
    }
}
