//! Logging settings read from the environment when the extension is imported.

use std::path::PathBuf;

use crate::error::Result;
use crate::logging::{self, LogLevel, LoggerRegistry};

pub const LOG_LEVEL_ENV: &str = "PYCBCC_LOG_LEVEL";
pub const PROTOCOL_LOG_ENV: &str = "PYCBCC_PROTOCOL_LOG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingEnv {
    /// Raw level string; parsed when applied.
    pub log_level: Option<String>,
    pub protocol_log: Option<PathBuf>,
}

impl LoggingEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            log_level: non_blank(LOG_LEVEL_ENV),
            protocol_log: non_blank(PROTOCOL_LOG_ENV).map(PathBuf::from),
        }
    }

    /// Create the loggers these settings ask for.
    ///
    /// Returns the console level that was applied, if any.
    pub fn apply(&self, registry: &LoggerRegistry) -> Result<Option<LogLevel>> {
        if let Some(path) = &self.protocol_log {
            logging::enable_protocol_logger(path.clone())?;
        }
        match &self.log_level {
            Some(level) => {
                logging::create_console_logger(registry, level)?;
                Ok(registry.current_level())
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> LoggingEnv {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingEnv::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn blank_values_are_unset() {
        let cfg = env(&[(LOG_LEVEL_ENV, "  "), (PROTOCOL_LOG_ENV, "")]);
        assert_eq!(cfg, LoggingEnv::default());
        let registry = LoggerRegistry::detached();
        assert_eq!(cfg.apply(&registry).unwrap(), None);
        assert!(!registry.is_initialized());
    }

    #[test]
    fn log_level_creates_console_logger() {
        let cfg = env(&[(LOG_LEVEL_ENV, "debug")]);
        let registry = LoggerRegistry::detached();
        assert_eq!(cfg.apply(&registry).unwrap(), Some(LogLevel::Debug));
        assert!(registry.is_initialized());
    }

    #[test]
    fn bad_level_is_invalid_argument() {
        let cfg = env(&[(LOG_LEVEL_ENV, "chatty")]);
        let registry = LoggerRegistry::detached();
        assert!(matches!(cfg.apply(&registry), Err(Error::InvalidArgument(_))));
        assert!(!registry.is_initialized());
    }
}
