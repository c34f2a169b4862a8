//! Progress sink trait and implementations.

use crate::core::{ProgressEvent, ProgressEventKind};
use crate::errors::SinkError;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Destination for progress events, e.g. the package manager IPC channel.
///
/// Sinks are best-effort: an `Err` is logged by the reporter and never
/// changes the pipeline result.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the event could not be delivered.
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError>;
}

/// A sink that discards all events.
///
/// Used in offline mode, where nobody listens.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn emit(&self, _event: &ProgressEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ProgressSink for LoggingProgressSink {
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        let (key, value) = event.signal_pair();
        if self.level == Level::DEBUG {
            debug!(pkg_type = %event.pkg_type, pkgid = %event.pkg_id, key = %key, value = %value, "Progress signal");
        } else {
            info!(pkg_type = %event.pkg_type, pkgid = %event.pkg_id, key = %key, value = %value, "Progress signal");
        }
        Ok(())
    }
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: RwLock<Vec<ProgressEvent>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the kinds of the collected events, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ProgressEventKind> {
        self.events.read().iter().map(|e| e.kind).collect()
    }

    /// Returns the percentages of all `Progress` events, in order.
    #[must_use]
    pub fn percentages(&self) -> Vec<u8> {
        self.events.read().iter().filter_map(|e| e.percent).collect()
    }

    /// Counts events of one kind.
    #[must_use]
    pub fn count(&self, kind: ProgressEventKind) -> usize {
        self.events.read().iter().filter(|e| e.kind == kind).count()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl ProgressSink for CollectingProgressSink {
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        self.events.write().push(event.clone());
        Ok(())
    }
}
