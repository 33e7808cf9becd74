//! Ordered line classification rules.
//!
//! Each rule pairs a cheap structural marker test with the extractor for that
//! line kind. Rules are tried in order and the first whose marker matches
//! decides the outcome, even when its extractor then fails.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::event::*;
use super::units::to_bytes;
use super::{FieldError, LineError};

/// Result of classifying one line. `Ok(None)` means the line was recognized
/// but carries nothing to fold.
pub type Classified = Result<Option<LineEvent>, LineError>;

struct Rule {
    name: &'static str,
    applies: fn(&str) -> bool,
    extract: fn(&str) -> Classified,
}

const RULES: &[Rule] = &[
    Rule { name: "lifecycle", applies: is_lifecycle, extract: extract_lifecycle },
    Rule { name: "trigger", applies: is_trigger, extract: extract_trigger },
    Rule { name: "push", applies: is_push, extract: extract_push },
    Rule { name: "ai_duration", applies: is_ai, extract: extract_ai },
    Rule { name: "signal", applies: is_signal, extract: extract_signal },
    Rule { name: "profile", applies: is_profile, extract: extract_profile },
    Rule { name: "disk_usage", applies: is_disk, extract: extract_disk },
    Rule { name: "log_error", applies: is_error, extract: extract_error },
    Rule { name: "log_warning", applies: is_warning, extract: extract_warning },
];

const TRIGGER_MARKERS: [&str; 5] = ["EXTERNAL", "MOTION", "DIO", "Triggered", "Re-triggered"];

/// Classify a raw log line and extract its event.
pub fn classify(line: &str) -> Classified {
    match RULES.iter().find(|rule| (rule.applies)(line)) {
        Some(rule) => (rule.extract)(line),
        None => Err(LineError::Unparsed),
    }
}

/// Name of the rule that claims a line, if any.
pub fn rule_name(line: &str) -> Option<&'static str> {
    RULES.iter().find(|rule| (rule.applies)(line)).map(|rule| rule.name)
}

/// Collapse every run of whitespace into a single space.
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// AI lifecycle markers
// ============================================================================

fn lifecycle_marker(line: &str) -> Option<Lifecycle> {
    let trimmed = line.trim_end();

    let marker = if trimmed.ends_with("AI: timeout") {
        Lifecycle::Timeout
    } else if line.contains("AI has been restarted") {
        Lifecycle::Restarted
    } else if line.contains("AI: is being started") || line.contains("AI is being restarted") {
        Lifecycle::Starting
    } else if line.contains("AI: has been started") || line.contains("AI has been started") {
        Lifecycle::Started
    } else if line.contains("DeepStack: Server error") {
        Lifecycle::ServerError
    } else if trimmed.ends_with("AI: not responding") {
        Lifecycle::NotResponding
    } else if line.contains("AI: error") {
        Lifecycle::Error
    } else {
        return None;
    };

    Some(marker)
}

fn is_lifecycle(line: &str) -> bool {
    lifecycle_marker(line).is_some()
}

fn extract_lifecycle(line: &str) -> Classified {
    Ok(lifecycle_marker(line).map(LineEvent::Lifecycle))
}

// ============================================================================
// Triggers, pushes and signals
// ============================================================================

fn is_trigger(line: &str) -> bool {
    TRIGGER_MARKERS.iter().any(|m| line.contains(m))
}

fn extract_trigger(line: &str) -> Classified {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?P<camera>[^\s\\]+)\s+(?:EXTERNAL|MOTION|DIO|Re-triggered|Triggered)").unwrap()
    });

    let caps = re.captures(line).ok_or(LineError::Unparsed)?;
    Ok(Some(LineEvent::Trigger {
        camera: caps["camera"].to_string(),
    }))
}

fn is_push(line: &str) -> bool {
    line.contains("Push:")
}

fn extract_push(line: &str) -> Classified {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?P<camera>[^\s\\]+)\s+Push:\s(?P<status>.+)\sto\s(?P<detail>.+)").unwrap()
    });

    let caps = re.captures(line).ok_or(LineError::Unparsed)?;
    Ok(Some(LineEvent::Push {
        camera: caps["camera"].to_string(),
        status: caps["status"].trim().to_string(),
        detail: caps["detail"].trim().to_string(),
    }))
}

fn is_signal(line: &str) -> bool {
    line.contains("Signal:")
}

fn extract_signal(line: &str) -> Classified {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?P<camera>[^\s\\]+)\s+Signal:\s*(?P<status>\S.*)").unwrap()
    });

    let caps = re.captures(line).ok_or(LineError::Unparsed)?;
    let status = caps["status"].trim();
    let up = status.contains("restored") || line.starts_with('4');

    Ok(Some(LineEvent::Signal {
        camera: caps["camera"].to_string(),
        up,
        detail: status.to_string(),
    }))
}

// ============================================================================
// AI analysis results
// ============================================================================

fn is_ai(line: &str) -> bool {
    line.contains("AI:") || line.contains("DeepStack:")
}

fn extract_ai(line: &str) -> Classified {
    static STRICT: OnceLock<Regex> = OnceLock::new();
    static LOOSE: OnceLock<Regex> = OnceLock::new();

    // camera, marker, optional tag, object, then a detail that may list
    // several objects, closed by the % or ] followed by any bracketed extras
    // and the millisecond duration
    let strict = STRICT.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<camera>[^\s\\]+) (?:AI|DeepStack): ",
            r"(?:\[Objects\] |Alert |\[[^\]]*\] )?",
            r"(?P<object>cancelled|[A-Za-z][A-Za-z ]*?)[ :] ?",
            r"\[?(?P<detail>.*?)[%\]]\]? ?",
            r"(?:\[[^\]]*\] ?)*",
            r"\[?(?P<duration>-?[0-9][0-9.]*)\]? ?ms",
        ))
        .unwrap()
    });
    let loose = LOOSE.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<camera>[^\s\\]+) (?:AI|DeepStack): ",
            r"(?:\[Objects\] |Alert |\[[^\]]*\] )?",
            r"(?P<object>cancelled|[A-Za-z]+)[ :]",
        ))
        .unwrap()
    });

    let normalized = normalize_whitespace(line);

    let Some(caps) = strict.captures(&normalized) else {
        // Recognized analysis line without a timing; nothing to record.
        if loose.is_match(&normalized) {
            return Ok(None);
        }
        return Err(LineError::Unparsed);
    };

    let duration_ms = parse_duration(&caps["duration"]).map_err(|source| LineError::Field {
        rule: "ai_duration",
        source,
    })?;

    let outcome = if normalized.contains("cancelled") || normalized.contains("canceled") {
        AiOutcome::Cancelled
    } else {
        AiOutcome::Alert
    };

    Ok(Some(LineEvent::Ai(AiResult {
        camera: caps["camera"].to_string(),
        outcome,
        object: caps["object"].trim().to_string(),
        detail: caps["detail"].trim().to_string(),
        duration_ms,
        raw: line.to_string(),
    })))
}

fn parse_duration(s: &str) -> Result<f64, FieldError> {
    let value: f64 = s.parse().map_err(|_| FieldError::Duration(s.to_string()))?;
    if value.is_nan() {
        return Err(FieldError::Duration(s.to_string()));
    }
    if value < 0.0 {
        return Err(FieldError::NegativeDuration(value));
    }
    Ok(value)
}

// ============================================================================
// Profile changes
// ============================================================================

fn is_profile(line: &str) -> bool {
    line.contains("Current profile:")
}

fn extract_profile(line: &str) -> Classified {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:^|\s)App\s+Current profile:\s*(?P<profile>\S.*)").unwrap()
    });

    let caps = re.captures(line).ok_or(LineError::Unparsed)?;
    Ok(Some(LineEvent::Profile {
        name: caps["profile"].trim().to_string(),
    }))
}

// ============================================================================
// Disk retention
// ============================================================================

fn is_disk(line: &str) -> bool {
    line.starts_with("0 ") && line.contains("Delete: ")
}

fn extract_disk(line: &str) -> Classified {
    static WITH_HOURS: OnceLock<Regex> = OnceLock::new();
    static SIZE_ONLY: OnceLock<Regex> = OnceLock::new();
    static SUMMARY: OnceLock<Regex> = OnceLock::new();

    let with_hours = WITH_HOURS.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<folder>[^\s\\]+)\s+Delete:.*\[",
            r"(?P<hours_used>[0-9.]+)/(?P<hours_total>[0-9.]+)\s*hrs,\s*",
            r"(?P<used>[0-9.]+)\s?(?P<used_unit>[A-Za-z]*)/(?P<limit>[0-9.]+)\s?(?P<limit_unit>[A-Za-z]*),\s*",
            r"(?P<free>[0-9.]+)\s?(?P<free_unit>[A-Za-z]*)\s+free\]",
        ))
        .unwrap()
    });
    let size_only = SIZE_ONLY.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<folder>[^\s\\]+)\s+Delete:.*\[",
            r"(?P<used>[0-9.]+)\s?(?P<used_unit>[A-Za-z]*)/(?P<limit>[0-9.]+)\s?(?P<limit_unit>[A-Za-z]*),\s*",
            r"(?P<free>[0-9.]+)\s?(?P<free_unit>[A-Za-z]*)\s+free\]",
        ))
        .unwrap()
    });
    let summary = SUMMARY.get_or_init(|| Regex::new(r"Delete:.*\b[0-9]+\s+items?\b").unwrap());

    let field = |source: FieldError| LineError::Field {
        rule: "disk_usage",
        source,
    };

    if let Some(caps) = with_hours.captures(line) {
        let hours_used = parse_number(&caps["hours_used"]).map_err(field)?;
        let hours_total = parse_number(&caps["hours_total"]).map_err(field)?;
        let mut usage = disk_usage(&caps).map_err(field)?;
        usage.hours_used_percent = Some(percent(hours_used, hours_total));
        return Ok(Some(LineEvent::Disk(usage)));
    }

    if let Some(caps) = size_only.captures(line) {
        let usage = disk_usage(&caps).map_err(field)?;
        return Ok(Some(LineEvent::Disk(usage)));
    }

    if summary.is_match(line) {
        return Ok(None);
    }

    Err(LineError::Unparsed)
}

/// Build the size part of a disk event. A used value without its own unit
/// inherits the limit's unit; a missing limit or free unit means bytes.
fn disk_usage(caps: &Captures) -> Result<DiskUsage, FieldError> {
    let limit_unit = unit_or_bytes(&caps["limit_unit"]);
    let used_unit = match &caps["used_unit"] {
        "" => limit_unit,
        unit => unit,
    };

    let used = to_bytes(&caps["used"], used_unit)?;
    let limit = to_bytes(&caps["limit"], limit_unit)?;
    let free = to_bytes(&caps["free"], unit_or_bytes(&caps["free_unit"]))?;

    Ok(DiskUsage {
        folder: caps["folder"].to_string(),
        disk_free_bytes: free,
        hours_used_percent: None,
        size_used_percent: percent(used, limit),
    })
}

fn unit_or_bytes(unit: &str) -> &str {
    if unit.is_empty() {
        "B"
    } else {
        unit
    }
}

fn parse_number(s: &str) -> Result<f64, FieldError> {
    s.parse().map_err(|_| FieldError::Number(s.to_string()))
}

fn percent(used: f64, total: f64) -> f64 {
    if total > 0.0 {
        (used / total) * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// Numbered errors and warnings
// ============================================================================

fn message_after_gap(line: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^.*\s\s\s(?P<message>.*)$").unwrap());

    re.captures(line).map(|caps| caps["message"].trim_end().to_string())
}

fn is_error(line: &str) -> bool {
    line.starts_with('2')
}

fn is_warning(line: &str) -> bool {
    line.starts_with('1') && !line.starts_with("10")
}

fn extract_error(line: &str) -> Classified {
    let message = message_after_gap(line).ok_or(LineError::Unparsed)?;
    Ok(Some(LineEvent::LogError { message }))
}

fn extract_warning(line: &str) -> Classified {
    let message = message_after_gap(line).ok_or(LineError::Unparsed)?;
    Ok(Some(LineEvent::LogWarning { message }))
}
