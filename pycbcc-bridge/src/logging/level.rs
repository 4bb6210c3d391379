use std::fmt;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

use crate::error::Error;

/// Engine-side log severity.
///
/// Ordered so that `Off < Trace < ... < Critical`; gating compares against this
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Off,
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Numeric level understood by Python's `logging` module.
    ///
    /// `Trace` maps to 5, which `logging` has no name for; records at that level
    /// show up as `Level 5` unless the caller registers a name.
    pub fn to_external(self) -> u32 {
        match self {
            LogLevel::Off => 0,
            LogLevel::Trace => 5,
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warn => 30,
            LogLevel::Error => 40,
            LogLevel::Critical => 50,
        }
    }

    /// Inverse of [`to_external`](Self::to_external). Anything outside the
    /// seven known codes is `Off`.
    pub fn from_external(code: i64) -> LogLevel {
        match code {
            5 => LogLevel::Trace,
            10 => LogLevel::Debug,
            20 => LogLevel::Info,
            30 => LogLevel::Warn,
            40 => LogLevel::Error,
            50 => LogLevel::Critical,
            _ => LogLevel::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "err",
            LogLevel::Critical => "critical",
        }
    }

    /// `tracing` has no level above `ERROR`, so `Critical` gates like `Error`.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument(
                "unable to determine log level from an empty string".to_string(),
            ));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "err" | "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(Error::InvalidArgument(format!(
                "unknown log level {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for level in LogLevel::ALL {
            assert_eq!(LogLevel::from_external(level.to_external() as i64), level);
        }
    }

    #[test]
    fn unknown_codes_are_off() {
        for code in [-1, 1, 15, 25, 49, 51, 1000] {
            assert_eq!(LogLevel::from_external(code), LogLevel::Off);
        }
    }

    #[test]
    fn parse_accepts_aliases_and_case() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" error ".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Critical);
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert!(matches!("".parse::<LogLevel>(), Err(Error::InvalidArgument(_))));
        assert!(matches!("loud".parse::<LogLevel>(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn ordering_gates_severity() {
        assert!(LogLevel::Off < LogLevel::Trace);
        assert!(LogLevel::Error < LogLevel::Critical);
        assert_eq!(LogLevel::Critical.to_level_filter(), LevelFilter::ERROR);
    }
}
