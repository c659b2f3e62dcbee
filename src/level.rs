//! Severity model shared by the accumulator, the trigger level, and both
//! logging front-ends.
//!
//! Threshold comparisons are always done on the numeric rank, never on the
//! level name: a record carrying an unrecognized name still has a usable
//! rank, and custom ranks have no name at all.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Canonical numeric ranks for the named severity levels.
pub mod rank {
    pub const TRACE: i64 = 5;
    pub const DEBUG: i64 = 10;
    pub const INFO: i64 = 20;
    pub const SUCCESS: i64 = 25;
    pub const WARNING: i64 = 30;
    pub const ERROR: i64 = 40;
    pub const CRITICAL: i64 = 50;
}

const NAMED_LEVELS: &[(&str, i64)] = &[
    ("TRACE", rank::TRACE),
    ("DEBUG", rank::DEBUG),
    ("INFO", rank::INFO),
    ("SUCCESS", rank::SUCCESS),
    ("WARNING", rank::WARNING),
    ("ERROR", rank::ERROR),
    ("CRITICAL", rank::CRITICAL),
];

/// A severity level: a display name plus the numeric rank used for all
/// threshold comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Severity {
    name: String,
    rank: i64,
}

impl Severity {
    /// Resolves a level name to its canonical severity.
    ///
    /// Matching is case-insensitive; `WARN` is accepted as an alias of
    /// `WARNING`. Returns `None` for unrecognized names so callers can fall
    /// back to a raw numeric rank.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let canonical = if upper == "WARN" { "WARNING" } else { upper.as_str() };
        NAMED_LEVELS
            .iter()
            .find(|(n, _)| *n == canonical)
            .map(|(n, r)| Self {
                name: (*n).to_string(),
                rank: *r,
            })
    }

    /// Builds a severity from a bare numeric rank. Used when a record's
    /// level name has no mapping in the canonical table.
    pub fn from_raw(rank: i64) -> Self {
        Self {
            name: format!("LEVEL {rank}"),
            rank,
        }
    }

    pub fn from_tracing(level: &tracing::Level) -> Self {
        let name = match *level {
            tracing::Level::TRACE => "TRACE",
            tracing::Level::DEBUG => "DEBUG",
            tracing::Level::INFO => "INFO",
            tracing::Level::WARN => "WARNING",
            tracing::Level::ERROR => "ERROR",
        };
        // Names above are always present in the canonical table.
        Self::from_name(name).unwrap_or_else(|| Self::from_raw(rank::INFO))
    }

    pub fn from_log(level: log::Level) -> Self {
        Self::from_name(level.as_str()).unwrap_or_else(|| Self::from_raw(log_rank(level)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> i64 {
        self.rank
    }
}

/// Maps a legacy `log` level onto the canonical rank scale.
pub fn log_rank(level: log::Level) -> i64 {
    match level {
        log::Level::Error => rank::ERROR,
        log::Level::Warn => rank::WARNING,
        log::Level::Info => rank::INFO,
        log::Level::Debug => rank::DEBUG,
        log::Level::Trace => rank::TRACE,
    }
}

/// Accepted input forms for the notification trigger level.
///
/// Callers may pass a bare rank, a level name, or a full [`Severity`]; all
/// are normalized to a rank at the boundary. Unrecognized names are a
/// configuration error, reported rather than coerced.
#[derive(Debug, Clone)]
pub enum LevelSpec {
    Rank(i64),
    Name(String),
    Level(Severity),
}

impl LevelSpec {
    /// Normalizes the spec to a numeric rank.
    pub fn resolve(self) -> Result<i64, ConfigError> {
        match self {
            LevelSpec::Rank(rank) => Ok(rank),
            LevelSpec::Name(name) => Severity::from_name(&name)
                .map(|s| s.rank)
                .ok_or(ConfigError::InvalidLevelName(name)),
            LevelSpec::Level(severity) => Ok(severity.rank),
        }
    }
}

impl From<i64> for LevelSpec {
    fn from(rank: i64) -> Self {
        LevelSpec::Rank(rank)
    }
}

impl From<&str> for LevelSpec {
    fn from(name: &str) -> Self {
        LevelSpec::Name(name.to_string())
    }
}

impl From<String> for LevelSpec {
    fn from(name: String) -> Self {
        LevelSpec::Name(name)
    }
}

impl From<Severity> for LevelSpec {
    fn from(severity: Severity) -> Self {
        LevelSpec::Level(severity)
    }
}
