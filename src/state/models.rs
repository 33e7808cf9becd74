//! Aggregate state model types.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::parser::AiOutcome;

/// Latest AI analysis for one camera and outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiRecord {
    pub camera: String,
    pub outcome: AiOutcome,
    pub duration_ms: f64,
    pub object: String,
    pub detail: String,
    pub alert_count: u64,
    pub latest_raw_line: String,
}

/// Camera connectivity as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    Up,
    Down,
}

impl CameraState {
    /// Exposed value: 0 = up, 1 = down.
    pub fn value(&self) -> f64 {
        match self {
            CameraState::Up => 0.0,
            CameraState::Down => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraStatus {
    pub state: CameraState,
    pub detail: String,
}

/// Disk usage of one storage folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskStats {
    pub disk_free_bytes: f64,
    pub hours_used_percent: Option<f64>,
    pub size_used_percent: f64,
}

/// Global AI lifecycle counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LifecycleCounters {
    pub timeout: u64,
    pub restarted: u64,
    pub starting: u64,
    pub started: u64,
    pub server_error: u64,
    pub not_responding: u64,
    pub error: u64,
}

/// Key of the push notification counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PushKey {
    pub camera: String,
    pub status: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushCount {
    #[serde(flatten)]
    pub key: PushKey,
    pub count: u64,
}

/// Point-in-time copy of the aggregate state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub ai: Vec<AiRecord>,
    pub cameras: BTreeMap<String, CameraStatus>,
    pub disks: BTreeMap<String, DiskStats>,
    pub counters: LifecycleCounters,
    pub triggers: BTreeMap<String, u64>,
    pub pushes: Vec<PushCount>,
    pub log_errors: BTreeMap<String, u64>,
    pub log_error_total: u64,
    pub log_warnings: BTreeMap<String, u64>,
    pub log_warning_total: u64,
    /// Unparsed lines of the most recent scan only.
    pub parse_errors: BTreeMap<String, u64>,
    pub parse_error_total: u64,
    pub profiles: BTreeMap<String, u8>,
}
