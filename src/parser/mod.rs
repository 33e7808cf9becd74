//! Blue Iris log line parsing.
//!
//! Classifies raw log lines against an ordered cascade of rules and extracts
//! typed events from the first rule that matches.

mod event;
mod rules;
mod units;

pub use event::*;
pub use rules::*;

use thiserror::Error;

/// Unit conversion errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("unknown size unit {0:?} (expected B, K, M, G, T, KB, MB, GB or TB)")]
    UnknownUnit(String),
    #[error("invalid size value {0:?}")]
    InvalidNumber(String),
}

/// A numeric field of a structurally matched line that could not be used.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("invalid duration {0:?}")]
    Duration(String),
    #[error("negative duration {0}")]
    NegativeDuration(f64),
    #[error("invalid number {0:?}")]
    Number(String),
    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Why a line produced no event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineError {
    /// No rule matched, or a rule matched structurally but its pattern did not.
    #[error("unparsed line")]
    Unparsed,
    /// A rule matched but one of its fields was unusable; the line is skipped.
    #[error("{rule}: {source}")]
    Field {
        rule: &'static str,
        #[source]
        source: FieldError,
    },
}
