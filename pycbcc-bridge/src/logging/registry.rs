//! The process-wide logger.
//!
//! The engine's logging backend is a singleton: once a logger has been created
//! it stays for the life of the process. [`LoggerRegistry`] enforces that with a
//! set-once cell and reports a second attempt as [`Error::AlreadyInitialized`]
//! instead of silently replacing the first logger.

use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt as tfmt, reload};

use super::{LogLevel, LogSink, SinkLayer};
use crate::error::{Error, Result};

/// Settings for [`LoggerRegistry::create_file_logger`].
#[derive(Clone, Default)]
pub struct LoggerConfig {
    /// Also write formatted records to stderr.
    pub console: bool,
    /// Forward every record to this sink.
    pub sink: Option<Arc<dyn LogSink>>,
    /// Append formatted records to this file.
    pub filename: Option<PathBuf>,
    pub level: LogLevel,
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("console", &self.console)
            .field("sink", &self.sink.as_ref().map(|_| "<sink>"))
            .field("filename", &self.filename)
            .field("level", &self.level)
            .finish()
    }
}

type LevelHandle = reload::Handle<LevelFilter, Registry>;

struct ActiveLogger {
    dispatch: Dispatch,
    level_handle: LevelHandle,
    level: Mutex<LogLevel>,
}

/// Owner of the single engine logger.
///
/// [`LoggerRegistry::global`] is the instance the extension module uses; it
/// installs its dispatcher as the `tracing` global default. Detached registries
/// keep their dispatcher to themselves and are entered with
/// [`in_scope`](Self::in_scope).
pub struct LoggerRegistry {
    active: OnceLock<ActiveLogger>,
    init_lock: Mutex<()>,
    install_global: bool,
}

static GLOBAL_LOGGER: LoggerRegistry = LoggerRegistry {
    active: OnceLock::new(),
    init_lock: parking_lot::const_mutex(()),
    install_global: true,
};

impl LoggerRegistry {
    pub fn global() -> &'static LoggerRegistry {
        &GLOBAL_LOGGER
    }

    pub fn detached() -> Self {
        Self {
            active: OnceLock::new(),
            init_lock: Mutex::new(()),
            install_global: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.get().is_some()
    }

    /// Build and install a logger from `config`.
    ///
    /// Fails with [`Error::AlreadyInitialized`] if this registry already holds a
    /// logger, or (for the global registry) if some other `tracing` subscriber
    /// already owns the global default.
    pub fn create_file_logger(&self, config: LoggerConfig) -> Result<()> {
        let guard = self.init_lock.lock();
        if self.is_initialized() {
            return Err(already_initialized());
        }

        let (dispatch, level_handle) = build_dispatch(&config)?;
        if self.install_global {
            tracing::dispatcher::set_global_default(dispatch.clone()).map_err(|_| {
                Error::AlreadyInitialized(
                    "a tracing subscriber is already installed for this process".to_string(),
                )
            })?;
        }

        self.active
            .set(ActiveLogger {
                dispatch,
                level_handle,
                level: Mutex::new(config.level),
            })
            .map_err(|_| already_initialized())?;
        drop(guard);

        tracing::debug!(level = %config.level, console = config.console, "engine logger created");
        Ok(())
    }

    /// Create a stderr logger at the default level; callers usually follow up
    /// with [`set_log_levels`](Self::set_log_levels).
    pub fn create_console_logger(&self) -> Result<()> {
        self.create_file_logger(LoggerConfig {
            console: true,
            ..LoggerConfig::default()
        })
    }

    /// Re-gate the active logger.
    pub fn set_log_levels(&self, level: LogLevel) -> Result<()> {
        let active = self.active.get().ok_or_else(|| {
            Error::InvalidArgument("cannot set log level before a logger exists".to_string())
        })?;
        active
            .level_handle
            .reload(level.to_level_filter())
            .map_err(|e| Error::Internal(format!("failed to update log level: {e}")))?;
        *active.level.lock() = level;
        Ok(())
    }

    pub fn current_level(&self) -> Option<LogLevel> {
        self.active.get().map(|active| *active.level.lock())
    }

    pub fn dispatch(&self) -> Option<&Dispatch> {
        self.active.get().map(|active| &active.dispatch)
    }

    /// Run `f` with this registry's logger as the thread's current dispatcher.
    /// Without a logger, `f` runs under whatever dispatcher is already current.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match self.dispatch() {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

fn already_initialized() -> Error {
    Error::AlreadyInitialized(
        "Cannot create logger.  Another logger has already been initialized.".to_string(),
    )
}

fn build_dispatch(config: &LoggerConfig) -> Result<(Dispatch, LevelHandle)> {
    let (filter, level_handle) = reload::Layer::new(config.level.to_level_filter());

    let file_layer = match &config.filename {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };
    let console_layer = config
        .console
        .then(|| tfmt::layer().with_writer(std::io::stderr));
    let sink_layer = config.sink.clone().map(SinkLayer::new);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .with(sink_layer);
    Ok((Dispatch::new(subscriber), level_handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogRecord;

    fn collecting_sink() -> (Arc<Mutex<Vec<LogRecord>>>, Arc<dyn LogSink>) {
        let seen: Arc<Mutex<Vec<LogRecord>>> = Arc::default();
        let sink = {
            let seen = seen.clone();
            move |record: &LogRecord| seen.lock().push(record.clone())
        };
        (seen, Arc::new(sink))
    }

    #[test]
    fn second_initialization_is_rejected() {
        let registry = LoggerRegistry::detached();
        assert!(!registry.is_initialized());
        registry.create_console_logger().unwrap();
        assert!(registry.is_initialized());

        let err = registry.create_file_logger(LoggerConfig::default()).unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));
        let err = registry.create_console_logger().unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));
    }

    #[test]
    fn level_changes_regate_the_sink() {
        let (seen, sink) = collecting_sink();
        let registry = LoggerRegistry::detached();
        registry
            .create_file_logger(LoggerConfig {
                sink: Some(sink),
                level: LogLevel::Warn,
                ..LoggerConfig::default()
            })
            .unwrap();

        registry.in_scope(|| {
            tracing::info!("hidden");
            tracing::error!("shown");
        });
        registry.set_log_levels(LogLevel::Debug).unwrap();
        assert_eq!(registry.current_level(), Some(LogLevel::Debug));
        registry.in_scope(|| tracing::debug!("now visible"));

        let messages: Vec<_> = seen.lock().iter().map(|r| r.message.clone()).collect();
        assert_eq!(messages, vec!["shown", "now visible"]);
    }

    #[test]
    fn set_level_without_logger_fails() {
        let registry = LoggerRegistry::detached();
        let err = registry.set_log_levels(LogLevel::Info).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(registry.current_level(), None);
    }

    #[test]
    fn file_logger_appends_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        let registry = LoggerRegistry::detached();
        registry
            .create_file_logger(LoggerConfig {
                filename: Some(path.clone()),
                level: LogLevel::Info,
                ..LoggerConfig::default()
            })
            .unwrap();

        registry.in_scope(|| tracing::info!(bucket = "travel-sample", "opened"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("opened"), "log file: {contents}");
        assert!(contents.contains("travel-sample"));
    }
}
