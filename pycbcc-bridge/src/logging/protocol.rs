//! Wire-protocol trace log.
//!
//! Separate from the main logger: it can be enabled at any time, regardless of
//! whether an engine logger exists, and a later call replaces the earlier file.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ProtocolLoggerConfig {
    pub filename: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => f.write_str("send"),
            Direction::Received => f.write_str("recv"),
        }
    }
}

pub struct ProtocolLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl ProtocolLogger {
    pub fn open(config: &ProtocolLoggerConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.filename)?;
        Ok(Self {
            path: config.filename.clone(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line: timestamp, direction, payload (lossy UTF-8).
    pub fn record(&self, direction: Direction, payload: &[u8]) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut writer = self.writer.lock();
        writeln!(
            writer,
            "{timestamp} [{direction}] {}",
            String::from_utf8_lossy(payload)
        )?;
        writer.flush()?;
        Ok(())
    }
}

static PROTOCOL_LOGGER: RwLock<Option<Arc<ProtocolLogger>>> = parking_lot::const_rwlock(None);

/// Open `config.filename` and make it the active protocol log.
pub fn create_protocol_logger(config: ProtocolLoggerConfig) -> Result<()> {
    let logger = Arc::new(ProtocolLogger::open(&config)?);
    *PROTOCOL_LOGGER.write() = Some(logger);
    Ok(())
}

pub fn protocol_logger_active() -> bool {
    PROTOCOL_LOGGER.read().is_some()
}

/// Record a protocol exchange if a protocol logger is active.
pub fn protocol_trace(direction: Direction, payload: &[u8]) {
    let logger = PROTOCOL_LOGGER.read().clone();
    if let Some(logger) = logger {
        if let Err(e) = logger.record(direction, payload) {
            tracing::warn!(path = %logger.path().display(), error = %e, "protocol log write failed");
        }
    }
}
