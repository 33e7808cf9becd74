//! Typed events extracted from log lines.

use serde::Serialize;

/// Outcome of an AI analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiOutcome {
    Alert,
    Cancelled,
}

impl AiOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiOutcome::Alert => "alert",
            AiOutcome::Cancelled => "cancelled",
        }
    }
}

/// Global AI lifecycle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Timeout,
    Restarted,
    Starting,
    Started,
    ServerError,
    NotResponding,
    Error,
}

/// A completed AI analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AiResult {
    pub camera: String,
    pub outcome: AiOutcome,
    pub object: String,
    pub detail: String,
    pub duration_ms: f64,
    /// The line the result came from, used for distinct-only emission.
    pub raw: String,
}

/// Disk usage reported by a retention (delete) line.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub folder: String,
    pub disk_free_bytes: f64,
    /// Absent when the folder has no hours-based limit.
    pub hours_used_percent: Option<f64>,
    pub size_used_percent: f64,
}

/// An event produced by a classified line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Lifecycle(Lifecycle),
    Trigger { camera: String },
    Push { camera: String, status: String, detail: String },
    Ai(AiResult),
    Signal { camera: String, up: bool, detail: String },
    Profile { name: String },
    Disk(DiskUsage),
    LogError { message: String },
    LogWarning { message: String },
}
