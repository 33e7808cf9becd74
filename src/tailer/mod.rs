//! Incremental scanning of the Blue Iris log directory.
//!
//! [`LogScanner::scan`] finds the active log file, skips lines already seen by
//! a previous scan, classifies the rest and folds them into the aggregate
//! state. The whole scan runs under one write lock so readers only ever see
//! state from before or after a complete scan.

mod cursor;
mod discover;

pub use cursor::*;
pub use discover::*;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use crate::config::CameraFilter;
use crate::parser::{classify, rule_name, LineError};
use crate::state::{AggregateState, AiRecord, Snapshot};

/// Scrape-fatal scan errors. State is left untouched when one occurs.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("unable to read log directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no log files in {0}")]
    NoLogFiles(PathBuf),
    #[error("unable to read log file {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Immutable result of one scan, handed to every metric renderer.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub snapshot: Snapshot,
    /// AI records that changed since the previous scan, for distinct emission.
    pub distinct: Vec<AiRecord>,
    /// Rules that rejected at least one line because of a bad field.
    pub field_errors: BTreeSet<&'static str>,
    pub file: PathBuf,
    pub lines_folded: usize,
    pub elapsed: Duration,
}

/// Scanner status as served by the state API.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatus {
    pub log_dir: PathBuf,
    pub file: Option<String>,
    pub last_scan: Option<DateTime<Utc>>,
    pub snapshot: Snapshot,
}

#[derive(Debug)]
struct ScanState {
    cursor: ResumeCursor,
    aggregate: AggregateState,
    last_scan: Option<DateTime<Utc>>,
}

/// Scan driver owning the cross-scrape state.
pub struct LogScanner {
    log_dir: PathBuf,
    cameras: CameraFilter,
    state: RwLock<ScanState>,
}

impl LogScanner {
    pub fn new(log_dir: impl Into<PathBuf>, cameras: CameraFilter) -> Self {
        Self {
            log_dir: log_dir.into(),
            cameras,
            state: RwLock::new(ScanState {
                cursor: ResumeCursor::default(),
                aggregate: AggregateState::new(),
                last_scan: None,
            }),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Scan unseen lines of the active log file and fold them.
    pub fn scan(&self) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let mut guard = self.state.write();
        let ScanState {
            cursor,
            aggregate,
            last_scan,
        } = &mut *guard;

        let path = newest_file(&self.log_dir)?;
        let lines = read_lines(&path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let point = cursor.resume_point(&file_name, &lines);
        if let (Some(previous), ResumePoint::From(_)) = (&cursor.file_name, point) {
            if previous != &file_name {
                tracing::info!("Log rotated from {} to {}", previous, file_name);
            }
        }
        cursor.open(&file_name);
        aggregate.begin_scan();

        let mut field_errors = BTreeSet::new();
        let mut lines_folded = 0;

        match point {
            ResumePoint::Baseline => {
                if let Some((index, line)) = last_non_blank(&lines) {
                    cursor.advance(index, line);
                }
                tracing::info!(
                    "Armed log cursor on {} at line {} without replaying history",
                    file_name,
                    cursor.line_index
                );
            }
            ResumePoint::From(start) => {
                for (index, line) in lines.iter().enumerate().skip(start) {
                    if line.trim().is_empty() {
                        continue;
                    }
                    fold_line(aggregate, line, &mut field_errors);
                    cursor.advance(index, line);
                    lines_folded += 1;
                }
            }
        }

        let snapshot = aggregate.snapshot();
        let distinct = aggregate.take_distinct(|camera| self.cameras.allows(camera));
        let elapsed = started.elapsed();
        *last_scan = Some(Utc::now());

        tracing::debug!(
            "Scanned {}: {} lines folded, {} parse errors in {:?}",
            file_name,
            lines_folded,
            snapshot.parse_error_total,
            elapsed
        );

        Ok(ScanReport {
            snapshot,
            distinct,
            field_errors,
            file: path,
            lines_folded,
            elapsed,
        })
    }

    /// Current state without scanning. Blocks while a scan is running.
    pub fn status(&self) -> ScanStatus {
        let state = self.state.read();
        ScanStatus {
            log_dir: self.log_dir.clone(),
            file: state.cursor.file_name.clone(),
            last_scan: state.last_scan,
            snapshot: state.aggregate.snapshot(),
        }
    }
}

fn fold_line(aggregate: &mut AggregateState, line: &str, field_errors: &mut BTreeSet<&'static str>) {
    match classify(line) {
        Ok(Some(event)) => aggregate.fold(event),
        Ok(None) => tracing::trace!("Nothing to fold from {:?} line: {}", rule_name(line), line),
        Err(LineError::Unparsed) => aggregate.record_parse_error(line),
        Err(LineError::Field { rule, source }) => {
            tracing::warn!("Skipping line ({}: {}): {}", rule, source, line);
            field_errors.insert(rule);
        }
    }
}

/// Read every line, decoding invalid UTF-8 lossily and dropping `\r`.
fn read_lines(path: &Path) -> Result<Vec<String>, ScanError> {
    let unreadable = |source| ScanError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(unreadable)?;
        if n == 0 {
            break;
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(lines)
}

fn last_non_blank(lines: &[String]) -> Option<(usize, &str)> {
    lines
        .iter()
        .enumerate()
        .rev()
        .find(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index, line.as_str()))
}
