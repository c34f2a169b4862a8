//! Progress events sent over the signalling side channel.

use super::{PipelineResult, StepStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    /// The request started.
    Started,
    /// Percentage update.
    Progress,
    /// The request failed; carries the status and message.
    Error,
    /// The request ended.
    Finished,
}

impl fmt::Display for ProgressEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "start"),
            Self::Progress => write!(f, "install_percent"),
            Self::Error => write!(f, "error"),
            Self::Finished => write!(f, "end"),
        }
    }
}

/// A single event emitted by the [`ProgressReporter`](crate::reporter::ProgressReporter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Event kind.
    pub kind: ProgressEventKind,
    /// Package type label (backend kind).
    pub pkg_type: String,
    /// Package id, possibly empty if not yet known.
    pub pkg_id: String,
    /// Progress percentage for `Progress` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    /// Failure status for `Error` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    /// Final result for `Finished` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineResult>,
    /// Human readable message for `Error` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the event was created (ISO 8601).
    pub timestamp: String,
}

impl ProgressEvent {
    fn new(kind: ProgressEventKind, pkg_type: &str, pkg_id: &str) -> Self {
        Self {
            kind,
            pkg_type: pkg_type.to_string(),
            pkg_id: pkg_id.to_string(),
            percent: None,
            status: None,
            result: None,
            message: None,
            timestamp: crate::utils::iso_timestamp(),
        }
    }

    /// Creates a `Started` event.
    #[must_use]
    pub fn started(pkg_type: &str, pkg_id: &str) -> Self {
        Self::new(ProgressEventKind::Started, pkg_type, pkg_id)
    }

    /// Creates a `Progress` event.
    #[must_use]
    pub fn progress(percent: u8, pkg_type: &str, pkg_id: &str) -> Self {
        let mut event = Self::new(ProgressEventKind::Progress, pkg_type, pkg_id);
        event.percent = Some(percent.min(100));
        event
    }

    /// Creates an `Error` event.
    #[must_use]
    pub fn error(status: StepStatus, message: &str, pkg_type: &str, pkg_id: &str) -> Self {
        let mut event = Self::new(ProgressEventKind::Error, pkg_type, pkg_id);
        event.status = Some(status);
        event.message = Some(message.to_string());
        event
    }

    /// Creates a `Finished` event.
    #[must_use]
    pub fn finished(result: PipelineResult, pkg_type: &str, pkg_id: &str) -> Self {
        let mut event = Self::new(ProgressEventKind::Finished, pkg_type, pkg_id);
        event.result = Some(result);
        event
    }

    /// Key/value pairs in the shape platform package managers expect.
    #[must_use]
    pub fn signal_pair(&self) -> (String, String) {
        let value = match self.kind {
            ProgressEventKind::Started => "install".to_string(),
            ProgressEventKind::Progress => self.percent.unwrap_or(0).to_string(),
            ProgressEventKind::Error => {
                let code = self.status.map_or(0, |s| s.code());
                match &self.message {
                    Some(message) if !message.is_empty() => format!("{code}:{message}"),
                    _ => code.to_string(),
                }
            }
            ProgressEventKind::Finished => {
                if self.result.is_some_and(|r| r.is_ok()) {
                    "ok".to_string()
                } else {
                    "fail".to_string()
                }
            }
        };
        (self.kind.to_string(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_clamped() {
        let event = ProgressEvent::progress(150, "tpk", "org.example.app");
        assert_eq!(event.percent, Some(100));
    }

    #[test]
    fn test_signal_pairs() {
        let started = ProgressEvent::started("tpk", "pkg");
        assert_eq!(started.signal_pair(), ("start".to_string(), "install".to_string()));

        let progress = ProgressEvent::progress(40, "tpk", "pkg");
        assert_eq!(progress.signal_pair(), ("install_percent".to_string(), "40".to_string()));

        let error = ProgressEvent::error(StepStatus::SignatureError, "bad signature", "tpk", "pkg");
        assert_eq!(error.signal_pair(), ("error".to_string(), "6:bad signature".to_string()));

        let finished = ProgressEvent::finished(PipelineResult::UndoError, "tpk", "pkg");
        assert_eq!(finished.signal_pair(), ("end".to_string(), "fail".to_string()));
    }

    #[test]
    fn test_event_serialization_skips_empty_fields() {
        let event = ProgressEvent::started("wgt", "pkg");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "started");
        assert!(json.get("percent").is_none());
        assert!(json.get("message").is_none());
    }
}
