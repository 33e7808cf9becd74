//! Prometheus exposition of the aggregated log state.
//!
//! [`BlueIrisCollector`] performs one log scan per collection and renders the
//! resulting report into every metric family listed in [`METRICS`].

mod render;

pub use render::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::Registry;

use crate::config::CameraFilter;
use crate::tailer::LogScanner;

pub const NAMESPACE: &str = "blueiris";

/// Label value used for the collector and error series of the log scan.
pub const SUBSYSTEM: &str = "BlueIris";

/// Static description of one exposed metric family.
#[derive(Debug)]
pub struct MetricSpec {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl MetricSpec {
    const fn new(name: &'static str, help: &'static str, labels: &'static [&'static str]) -> Self {
        Self { name, help, labels }
    }

    pub fn fq_name(&self) -> String {
        format!("{}_{}", NAMESPACE, self.name)
    }
}

const AI_LABELS: &[&str] = &["camera", "type", "object", "detail"];

pub const AI_DURATION: MetricSpec = MetricSpec::new("ai_duration", "Duration of Blue Iris AI analysis", AI_LABELS);
pub const AI_COUNT: MetricSpec = MetricSpec::new("ai_count", "Count of Blue Iris AI analysis", &["camera", "type"]);
pub const AI_DURATION_DISTINCT: MetricSpec =
    MetricSpec::new("ai_duration_distinct", "Duration of Blue Iris AI analysis once", AI_LABELS);
pub const AI_RESTARTED: MetricSpec = MetricSpec::new("ai_restarted", "Times Blue Iris restarted the AI", &[]);
pub const AI_TIMEOUT: MetricSpec = MetricSpec::new("ai_timeout", "Count of AI timeouts", &[]);
pub const AI_SERVER_ERROR: MetricSpec = MetricSpec::new("ai_servererror", "Count of AI server errors", &[]);
pub const AI_NOT_RESPONDING: MetricSpec = MetricSpec::new("ai_notresponding", "Count of AI not responding", &[]);
pub const AI_STARTING: MetricSpec = MetricSpec::new("ai_starting", "Times the AI is being started", &[]);
pub const AI_STARTED: MetricSpec = MetricSpec::new("ai_started", "Times the AI has been started", &[]);
pub const AI_ERROR: MetricSpec = MetricSpec::new("ai_error", "Count of AI errors", &[]);
pub const CAMERA_STATUS: MetricSpec =
    MetricSpec::new("camera_status", "Status of each camera. 0 = up, 1 = down", &["camera", "detail"]);
pub const TRIGGERS: MetricSpec = MetricSpec::new("triggers", "Count of camera triggers", &["camera"]);
pub const PUSH_NOTIFICATIONS: MetricSpec = MetricSpec::new(
    "push_notifications",
    "Count of push notifications sent",
    &["camera", "status", "detail"],
);
pub const LOG_ERROR: MetricSpec = MetricSpec::new("logerror", "Count of unique errors in the logs", &["message"]);
pub const LOG_ERROR_TOTAL: MetricSpec = MetricSpec::new("logerror_total", "Count all errors in the logs", &[]);
pub const LOG_WARNING: MetricSpec =
    MetricSpec::new("logwarning", "Count of unique warnings in the logs", &["message"]);
pub const LOG_WARNING_TOTAL: MetricSpec = MetricSpec::new("logwarning_total", "Count all warnings in the logs", &[]);
pub const PARSE_ERRORS: MetricSpec =
    MetricSpec::new("parse_errors", "Log lines that could not be parsed in the last scan", &["raw_line"]);
pub const PARSE_ERRORS_TOTAL: MetricSpec =
    MetricSpec::new("parse_errors_total", "Count of unparsed log lines in the last scan", &[]);
pub const FOLDER_DISK_FREE: MetricSpec =
    MetricSpec::new("folder_disk_free", "Free disk space of the storage folder in bytes", &["folder"]);
pub const FOLDER_USED: MetricSpec =
    MetricSpec::new("folder_used", "Percent of the folder size limit in use", &["folder"]);
pub const HOURS_USED: MetricSpec = MetricSpec::new("hours_used", "Percent of the folder hours limit in use", &["folder"]);
pub const PROFILE: MetricSpec = MetricSpec::new("profile", "Active profile. 1 = active, 0 = inactive", &["profile"]);
pub const COLLECTOR_DURATION: MetricSpec =
    MetricSpec::new("collector_duration_seconds", "Collector time duration.", &["collector"]);
/// The only counter; every other family is a gauge.
pub const EXPORTER_ERRORS: MetricSpec = MetricSpec::new("exporter_errors", "blueiris_exporter errors", &["function"]);

/// Every metric family the exporter can produce.
pub const METRICS: &[&MetricSpec] = &[
    &AI_DURATION,
    &AI_COUNT,
    &AI_DURATION_DISTINCT,
    &AI_RESTARTED,
    &AI_TIMEOUT,
    &AI_SERVER_ERROR,
    &AI_NOT_RESPONDING,
    &AI_STARTING,
    &AI_STARTED,
    &AI_ERROR,
    &CAMERA_STATUS,
    &TRIGGERS,
    &PUSH_NOTIFICATIONS,
    &LOG_ERROR,
    &LOG_ERROR_TOTAL,
    &LOG_WARNING,
    &LOG_WARNING_TOTAL,
    &PARSE_ERRORS,
    &PARSE_ERRORS_TOTAL,
    &FOLDER_DISK_FREE,
    &FOLDER_USED,
    &HOURS_USED,
    &PROFILE,
    &COLLECTOR_DURATION,
    &EXPORTER_ERRORS,
];

/// Collector scanning the log once per scrape.
pub struct BlueIrisCollector {
    scanner: Arc<LogScanner>,
    cameras: CameraFilter,
    descs: Vec<Desc>,
}

impl BlueIrisCollector {
    pub fn new(scanner: Arc<LogScanner>, cameras: CameraFilter) -> prometheus::Result<Self> {
        let descs = METRICS
            .iter()
            .map(|spec| {
                Desc::new(
                    spec.fq_name(),
                    spec.help.to_string(),
                    spec.labels.iter().map(|l| l.to_string()).collect(),
                    HashMap::new(),
                )
            })
            .collect::<prometheus::Result<Vec<_>>>()?;

        Ok(Self {
            scanner,
            cameras,
            descs,
        })
    }

    /// Scan the log and render all families, including scrape timing.
    pub fn collect_families(&self) -> Vec<MetricFamily> {
        let started = Instant::now();

        let mut families = match self.scanner.scan() {
            Ok(report) => {
                tracing::debug!(
                    "Rendering scan of {} ({} new lines, {:?})",
                    report.file.display(),
                    report.lines_folded,
                    report.elapsed
                );
                render(&report, &self.cameras)
            }
            Err(e) => {
                tracing::error!("Error scanning Blue Iris logs in {}: {}", self.scanner.log_dir().display(), e);
                render_failure()
            }
        };

        families.extend(render_duration(started.elapsed()));
        families
    }
}

impl Collector for BlueIrisCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.collect_families()
    }
}

/// Registry holding the log collector and, on Linux, process metrics.
pub fn build_registry(scanner: Arc<LogScanner>, cameras: CameraFilter) -> prometheus::Result<Registry> {
    let registry = Registry::new();
    registry.register(Box::new(BlueIrisCollector::new(scanner, cameras)?))?;

    #[cfg(target_os = "linux")]
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique() {
        let names: HashSet<_> = METRICS.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), METRICS.len());
    }

    #[test]
    fn test_collector_registers() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = Arc::new(LogScanner::new(dir.path(), CameraFilter::default()));
        let collector = BlueIrisCollector::new(scanner.clone(), CameraFilter::default()).unwrap();
        assert_eq!(collector.desc().len(), METRICS.len());

        let registry = build_registry(scanner, CameraFilter::default()).unwrap();
        let families = registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "blueiris_exporter_errors"));
    }

    #[test]
    fn test_failed_scan_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = Arc::new(LogScanner::new(dir.path().join("missing"), CameraFilter::default()));
        let collector = BlueIrisCollector::new(scanner, CameraFilter::default()).unwrap();

        let families = collector.collect_families();
        let names: Vec<_> = families.iter().map(|f| f.get_name()).collect();
        assert_eq!(names, ["blueiris_exporter_errors", "blueiris_collector_duration_seconds"]);

        let errors = &families[0].get_metric()[0];
        assert_eq!(errors.get_counter().get_value(), 1.0);
        assert_eq!(errors.get_label()[0].get_value(), SUBSYSTEM);
    }
}
