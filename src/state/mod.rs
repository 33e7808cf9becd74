//! Process-lifetime aggregate state.
//!
//! Every classified event is folded into [`AggregateState`]. Folds never fail;
//! malformed lines are rejected by the parser before they get here.

mod models;

pub use models::*;

use std::collections::{BTreeMap, HashMap};

use crate::parser::{AiOutcome, AiResult, DiskUsage, Lifecycle, LineEvent};

type AiKey = (String, AiOutcome);

/// All counters and mappings derived from the log.
#[derive(Debug, Default)]
pub struct AggregateState {
    ai: BTreeMap<AiKey, AiRecord>,
    /// Raw line last emitted per camera and outcome, for distinct emission.
    latest_emitted: HashMap<AiKey, String>,
    cameras: BTreeMap<String, CameraStatus>,
    disks: BTreeMap<String, DiskStats>,
    counters: LifecycleCounters,
    triggers: BTreeMap<String, u64>,
    pushes: BTreeMap<PushKey, u64>,
    log_errors: BTreeMap<String, u64>,
    log_error_total: u64,
    log_warnings: BTreeMap<String, u64>,
    log_warning_total: u64,
    parse_errors: BTreeMap<String, u64>,
    parse_error_total: u64,
    profiles: BTreeMap<String, u8>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new scan. Parse errors only describe the most recent scan.
    pub fn begin_scan(&mut self) {
        self.parse_errors.clear();
        self.parse_error_total = 0;
    }

    /// Apply one event.
    pub fn fold(&mut self, event: LineEvent) {
        match event {
            LineEvent::Lifecycle(marker) => self.fold_lifecycle(marker),
            LineEvent::Trigger { camera } => self.fold_trigger(camera),
            LineEvent::Push { camera, status, detail } => {
                self.fold_push(PushKey { camera, status, detail })
            }
            LineEvent::Ai(result) => self.fold_ai(result),
            LineEvent::Signal { camera, up, detail } => self.fold_signal(camera, up, detail),
            LineEvent::Profile { name } => self.fold_profile(name),
            LineEvent::Disk(usage) => self.fold_disk(usage),
            LineEvent::LogError { message } => {
                *self.log_errors.entry(message).or_insert(0) += 1;
                self.log_error_total += 1;
            }
            LineEvent::LogWarning { message } => {
                *self.log_warnings.entry(message).or_insert(0) += 1;
                self.log_warning_total += 1;
            }
        }
    }

    /// Record a line no rule could parse.
    pub fn record_parse_error(&mut self, raw: &str) {
        *self.parse_errors.entry(raw.to_string()).or_insert(0) += 1;
        self.parse_error_total += 1;
    }

    fn fold_lifecycle(&mut self, marker: Lifecycle) {
        let c = &mut self.counters;
        let counter = match marker {
            Lifecycle::Timeout => &mut c.timeout,
            Lifecycle::Restarted => &mut c.restarted,
            Lifecycle::Starting => &mut c.starting,
            Lifecycle::Started => &mut c.started,
            Lifecycle::ServerError => &mut c.server_error,
            Lifecycle::NotResponding => &mut c.not_responding,
            Lifecycle::Error => &mut c.error,
        };
        *counter += 1;
    }

    fn fold_trigger(&mut self, camera: String) {
        *self.triggers.entry(camera.clone()).or_insert(0) += 1;
        self.set_camera(camera, CameraState::Up, "trigger".to_string());
    }

    fn fold_push(&mut self, key: PushKey) {
        *self.pushes.entry(key).or_insert(0) += 1;
    }

    fn fold_ai(&mut self, result: AiResult) {
        let key = (result.camera.clone(), result.outcome);
        let alert_count = self.ai.get(&key).map_or(0, |r| r.alert_count) + 1;

        self.set_camera(result.camera.clone(), CameraState::Up, "object".to_string());
        self.ai.insert(
            key,
            AiRecord {
                camera: result.camera,
                outcome: result.outcome,
                duration_ms: result.duration_ms,
                object: result.object,
                detail: result.detail,
                alert_count,
                latest_raw_line: result.raw,
            },
        );
    }

    fn fold_signal(&mut self, camera: String, up: bool, detail: String) {
        let state = if up { CameraState::Up } else { CameraState::Down };
        self.set_camera(camera, state, detail);
    }

    fn fold_profile(&mut self, name: String) {
        for value in self.profiles.values_mut() {
            *value = 0;
        }
        self.profiles.insert(name, 1);
    }

    fn fold_disk(&mut self, usage: DiskUsage) {
        self.disks.insert(
            usage.folder,
            DiskStats {
                disk_free_bytes: usage.disk_free_bytes,
                hours_used_percent: usage.hours_used_percent,
                size_used_percent: usage.size_used_percent,
            },
        );
    }

    fn set_camera(&mut self, camera: String, state: CameraState, detail: String) {
        self.cameras.insert(camera, CameraStatus { state, detail });
    }

    /// Copy out every mapping and counter.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ai: self.ai.values().cloned().collect(),
            cameras: self.cameras.clone(),
            disks: self.disks.clone(),
            counters: self.counters.clone(),
            triggers: self.triggers.clone(),
            pushes: self
                .pushes
                .iter()
                .map(|(key, count)| PushCount {
                    key: key.clone(),
                    count: *count,
                })
                .collect(),
            log_errors: self.log_errors.clone(),
            log_error_total: self.log_error_total,
            log_warnings: self.log_warnings.clone(),
            log_warning_total: self.log_warning_total,
            parse_errors: self.parse_errors.clone(),
            parse_error_total: self.parse_error_total,
            profiles: self.profiles.clone(),
        }
    }

    /// AI records whose underlying line changed since they were last taken,
    /// restricted to cameras accepted by `include`. Advances the distinct
    /// cursor for every record returned.
    pub fn take_distinct(&mut self, include: impl Fn(&str) -> bool) -> Vec<AiRecord> {
        let mut changed = Vec::new();

        for (key, record) in &self.ai {
            if !include(&record.camera) {
                continue;
            }
            if self.latest_emitted.get(key) == Some(&record.latest_raw_line) {
                continue;
            }
            self.latest_emitted
                .insert(key.clone(), record.latest_raw_line.clone());
            changed.push(record.clone());
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ai(camera: &str, outcome: AiOutcome, duration_ms: f64, raw: &str) -> LineEvent {
        LineEvent::Ai(AiResult {
            camera: camera.to_string(),
            outcome,
            object: "person".to_string(),
            detail: "85".to_string(),
            duration_ms,
            raw: raw.to_string(),
        })
    }

    #[test]
    fn test_ai_counts_per_outcome() {
        let mut state = AggregateState::new();
        state.fold(ai("CAM1", AiOutcome::Alert, 95.0, "a"));
        state.fold(ai("CAM1", AiOutcome::Alert, 120.0, "b"));
        state.fold(ai("CAM1", AiOutcome::Cancelled, 40.0, "c"));

        let snap = state.snapshot();
        assert_eq!(snap.ai.len(), 2);
        let alert = snap.ai.iter().find(|r| r.outcome == AiOutcome::Alert).unwrap();
        assert_eq!(alert.alert_count, 2);
        assert_eq!(alert.duration_ms, 120.0);
        assert_eq!(alert.latest_raw_line, "b");
        let cancelled = snap.ai.iter().find(|r| r.outcome == AiOutcome::Cancelled).unwrap();
        assert_eq!(cancelled.alert_count, 1);

        assert_eq!(
            snap.cameras["CAM1"],
            CameraStatus { state: CameraState::Up, detail: "object".to_string() }
        );
    }

    #[test]
    fn test_lifecycle_only_touches_its_counter() {
        let mut state = AggregateState::new();
        state.fold(LineEvent::Lifecycle(Lifecycle::Restarted));

        let snap = state.snapshot();
        assert_eq!(
            snap.counters,
            LifecycleCounters { restarted: 1, ..Default::default() }
        );
        assert_eq!(
            snap,
            Snapshot { counters: snap.counters.clone(), ..Default::default() }
        );
    }

    #[test]
    fn test_signal_and_trigger_status() {
        let mut state = AggregateState::new();
        state.fold(LineEvent::Signal {
            camera: "Garage".to_string(),
            up: false,
            detail: "network retry".to_string(),
        });
        assert_eq!(state.snapshot().cameras["Garage"].state, CameraState::Down);

        state.fold(LineEvent::Trigger { camera: "Garage".to_string() });
        let snap = state.snapshot();
        assert_eq!(snap.cameras["Garage"].state, CameraState::Up);
        assert_eq!(snap.cameras["Garage"].detail, "trigger");
        assert_eq!(snap.triggers["Garage"], 1);
    }

    #[test]
    fn test_profile_is_one_hot() {
        let mut state = AggregateState::new();
        state.fold(LineEvent::Profile { name: "Home".to_string() });
        state.fold(LineEvent::Profile { name: "Away".to_string() });

        let profiles = state.snapshot().profiles;
        assert_eq!(profiles["Home"], 0);
        assert_eq!(profiles["Away"], 1);
    }

    #[test]
    fn test_disk_replaces_previous_stats() {
        let mut state = AggregateState::new();
        state.fold(LineEvent::Disk(DiskUsage {
            folder: "New".to_string(),
            disk_free_bytes: 10.0,
            hours_used_percent: Some(50.0),
            size_used_percent: 20.0,
        }));
        state.fold(LineEvent::Disk(DiskUsage {
            folder: "New".to_string(),
            disk_free_bytes: 8.0,
            hours_used_percent: None,
            size_used_percent: 25.0,
        }));

        let disk = &state.snapshot().disks["New"];
        assert_eq!(disk.disk_free_bytes, 8.0);
        assert_eq!(disk.hours_used_percent, None);
    }

    #[test]
    fn test_push_and_log_counters() {
        let mut state = AggregateState::new();
        for _ in 0..2 {
            state.fold(LineEvent::Push {
                camera: "Drive".to_string(),
                status: "sent".to_string(),
                detail: "phone".to_string(),
            });
            state.fold(LineEvent::LogError { message: "boom".to_string() });
        }
        state.fold(LineEvent::LogWarning { message: "slow".to_string() });

        let snap = state.snapshot();
        assert_eq!(snap.pushes.len(), 1);
        assert_eq!(snap.pushes[0].count, 2);
        assert_eq!(snap.log_errors["boom"], 2);
        assert_eq!(snap.log_error_total, 2);
        assert_eq!(snap.log_warning_total, 1);
    }

    #[test]
    fn test_parse_errors_reset_per_scan() {
        let mut state = AggregateState::new();
        state.fold(LineEvent::LogError { message: "boom".to_string() });
        state.record_parse_error("garbage text");
        state.record_parse_error("garbage text");
        assert_eq!(state.snapshot().parse_error_total, 2);

        state.begin_scan();
        let snap = state.snapshot();
        assert_eq!(snap.parse_error_total, 0);
        assert!(snap.parse_errors.is_empty());
        // Lifetime counters survive.
        assert_eq!(snap.log_error_total, 1);
    }

    #[test]
    fn test_take_distinct() {
        let mut state = AggregateState::new();
        state.fold(ai("CAM1", AiOutcome::Alert, 95.0, "a"));
        state.fold(ai("CAM2", AiOutcome::Alert, 50.0, "x"));

        assert_eq!(state.take_distinct(|_| true).len(), 2);
        assert!(state.take_distinct(|_| true).is_empty());

        state.fold(ai("CAM1", AiOutcome::Alert, 110.0, "b"));
        let changed = state.take_distinct(|_| true);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].duration_ms, 110.0);
    }

    #[test]
    fn test_take_distinct_respects_filter() {
        let mut state = AggregateState::new();
        state.fold(ai("CAM1", AiOutcome::Alert, 95.0, "a"));
        state.fold(ai("CAM2", AiOutcome::Alert, 50.0, "x"));

        let changed = state.take_distinct(|camera| camera == "CAM2");
        assert_eq!(changed.len(), 1);
        // CAM1 was filtered out, so its cursor did not advance.
        assert_eq!(state.take_distinct(|_| true).len(), 1);
    }
}
