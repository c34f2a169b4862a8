//! Progress reporting side channel.
//!
//! The pipeline drives a [`ProgressReporter`], which enforces the signal
//! ordering and forwards events to a pluggable [`ProgressSink`].

mod progress;
mod sink;

pub use progress::{progress_percent, ProgressReporter, ReporterState};
#[cfg(test)]
pub use sink::MockProgressSink;
pub use sink::{CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink};
