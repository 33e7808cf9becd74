//! Rendering of a scan report into Prometheus metric families.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};

use super::*;
use crate::config::CameraFilter;
use crate::tailer::ScanReport;

/// Families accumulated for one collection. Families without samples are dropped.
#[derive(Default)]
struct Families(Vec<MetricFamily>);

impl Families {
    fn gauge(&mut self, spec: &MetricSpec, fill: impl FnOnce(&GaugeVec)) {
        let opts = Opts::new(spec.name, spec.help).namespace(NAMESPACE);
        match GaugeVec::new(opts, spec.labels) {
            Ok(vec) => {
                fill(&vec);
                self.push(vec.collect());
            }
            Err(e) => tracing::error!("Unable to build metric {}: {}", spec.fq_name(), e),
        }
    }

    fn counter(&mut self, spec: &MetricSpec, fill: impl FnOnce(&CounterVec)) {
        let opts = Opts::new(spec.name, spec.help).namespace(NAMESPACE);
        match CounterVec::new(opts, spec.labels) {
            Ok(vec) => {
                fill(&vec);
                self.push(vec.collect());
            }
            Err(e) => tracing::error!("Unable to build metric {}: {}", spec.fq_name(), e),
        }
    }

    fn push(&mut self, families: Vec<MetricFamily>) {
        self.0
            .extend(families.into_iter().filter(|f| !f.get_metric().is_empty()));
    }
}

/// Render every series of a successful scan.
pub fn render(report: &ScanReport, cameras: &CameraFilter) -> Vec<MetricFamily> {
    let snap = &report.snapshot;
    let mut out = Families::default();

    let ai = || snap.ai.iter().filter(|r| cameras.allows(&r.camera));

    out.gauge(&AI_DURATION, |v| {
        for r in ai() {
            v.with_label_values(&[r.camera.as_str(), r.outcome.as_str(), r.object.as_str(), r.detail.as_str()])
                .set(r.duration_ms);
        }
    });
    out.gauge(&AI_COUNT, |v| {
        for r in ai() {
            v.with_label_values(&[r.camera.as_str(), r.outcome.as_str()])
                .set(r.alert_count as f64);
        }
    });
    out.gauge(&AI_DURATION_DISTINCT, |v| {
        for r in &report.distinct {
            v.with_label_values(&[r.camera.as_str(), r.outcome.as_str(), r.object.as_str(), r.detail.as_str()])
                .set(r.duration_ms);
        }
    });

    let counters = &snap.counters;
    for (spec, value) in [
        (&AI_RESTARTED, counters.restarted),
        (&AI_TIMEOUT, counters.timeout),
        (&AI_SERVER_ERROR, counters.server_error),
        (&AI_NOT_RESPONDING, counters.not_responding),
        (&AI_STARTING, counters.starting),
        (&AI_STARTED, counters.started),
        (&AI_ERROR, counters.error),
    ] {
        out.gauge(spec, |v| v.with_label_values(&[]).set(value as f64));
    }

    out.gauge(&CAMERA_STATUS, |v| {
        for (camera, status) in snap.cameras.iter().filter(|(c, _)| cameras.allows(c)) {
            v.with_label_values(&[camera.as_str(), status.detail.as_str()])
                .set(status.state.value());
        }
    });
    out.gauge(&TRIGGERS, |v| {
        for (camera, count) in snap.triggers.iter().filter(|(c, _)| cameras.allows(c)) {
            v.with_label_values(&[camera.as_str()]).set(*count as f64);
        }
    });
    out.gauge(&PUSH_NOTIFICATIONS, |v| {
        for push in snap.pushes.iter().filter(|p| cameras.allows(&p.key.camera)) {
            let key = &push.key;
            v.with_label_values(&[key.camera.as_str(), key.status.as_str(), key.detail.as_str()])
                .set(push.count as f64);
        }
    });

    keyed_with_placeholder(&mut out, &LOG_ERROR, &snap.log_errors);
    out.gauge(&LOG_ERROR_TOTAL, |v| v.with_label_values(&[]).set(snap.log_error_total as f64));
    keyed_with_placeholder(&mut out, &LOG_WARNING, &snap.log_warnings);
    out.gauge(&LOG_WARNING_TOTAL, |v| v.with_label_values(&[]).set(snap.log_warning_total as f64));
    keyed_with_placeholder(&mut out, &PARSE_ERRORS, &snap.parse_errors);
    out.gauge(&PARSE_ERRORS_TOTAL, |v| v.with_label_values(&[]).set(snap.parse_error_total as f64));

    out.gauge(&FOLDER_DISK_FREE, |v| {
        for (folder, disk) in &snap.disks {
            v.with_label_values(&[folder.as_str()]).set(disk.disk_free_bytes);
        }
    });
    out.gauge(&FOLDER_USED, |v| {
        for (folder, disk) in &snap.disks {
            v.with_label_values(&[folder.as_str()]).set(disk.size_used_percent);
        }
    });
    out.gauge(&HOURS_USED, |v| {
        for (folder, disk) in &snap.disks {
            if let Some(hours) = disk.hours_used_percent {
                v.with_label_values(&[folder.as_str()]).set(hours);
            }
        }
    });

    out.gauge(&PROFILE, |v| {
        for (profile, active) in &snap.profiles {
            v.with_label_values(&[profile.as_str()]).set(f64::from(*active));
        }
    });

    out.counter(&EXPORTER_ERRORS, |v| {
        v.with_label_values(&[SUBSYSTEM]).inc_by(0.0);
        for rule in &report.field_errors {
            v.with_label_values(&[*rule]).inc();
        }
    });

    out.0
}

/// Series emitted when the scan itself failed.
pub fn render_failure() -> Vec<MetricFamily> {
    let mut out = Families::default();
    out.counter(&EXPORTER_ERRORS, |v| v.with_label_values(&[SUBSYSTEM]).inc());
    out.0
}

pub fn render_duration(elapsed: Duration) -> Vec<MetricFamily> {
    let mut out = Families::default();
    out.gauge(&COLLECTOR_DURATION, |v| {
        v.with_label_values(&[SUBSYSTEM]).set(elapsed.as_secs_f64());
    });
    out.0
}

/// Keyed counts, or a single empty-label zero sample when there are none.
fn keyed_with_placeholder(
    out: &mut Families,
    spec: &MetricSpec,
    counts: &std::collections::BTreeMap<String, u64>,
) {
    out.gauge(spec, |v| {
        if counts.is_empty() {
            v.with_label_values(&[""]).set(0.0);
        }
        for (key, count) in counts {
            v.with_label_values(&[key.as_str()]).set(*count as f64);
        }
    });
}
