//! File-backed message sink with size-based rotation.

use crate::config::LogConfig;
use crate::error::LogError;
use crate::sanitize::sanitize;
use chrono::{DateTime, Utc};
use herald_core::{MessageKind, MessageSink};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Buffers diagnostics in memory and appends them to per-kind log files.
///
/// Messages are sanitized on arrival and written on [`MessageSink::flush`]
/// (or drop). Each entry is a GMT timestamp line, the message, and three
/// blank lines. A file larger than `max_size` is renamed to
/// `{file}.{YYYYMMDDTHHMMSS}.log` before the next entry is written.
///
/// ```no_run
/// use herald_core::{MessageKind, MessageSink};
/// use herald_log::{FileSink, LogConfig};
///
/// let sink = FileSink::new(LogConfig::in_dir("/var/log/herald"));
/// sink.message(MessageKind::Error, "Controller Error: disk full");
/// sink.flush();
/// ```
#[derive(Debug)]
pub struct FileSink {
    config: LogConfig,
    pending: Mutex<Vec<(MessageKind, String)>>,
}

impl FileSink {
    /// Creates a sink. Nothing touches the disk until the first flush.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The sink's configuration.
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Number of messages waiting for a flush.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Writes every pending message.
    ///
    /// A message that cannot be written is dropped; the others are still
    /// written. Returns the number written.
    ///
    /// # Errors
    ///
    /// Returns the first failure after attempting every message.
    pub fn write_pending(&self) -> Result<usize, LogError> {
        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return Ok(0);
        }

        fs::create_dir_all(&self.config.storage)
            .map_err(|e| LogError::create_dir(&self.config.storage, e))?;

        let now = Utc::now();
        let mut written = 0;
        let mut first_error = None;
        for (kind, text) in batch {
            let path = self.config.path_for(kind);
            match append_entry(&path, &format_entry(now, &text), self.config.max_size, now) {
                Ok(()) => written += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        debug!(written, storage = %self.config.storage.display(), "log entries written");
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

impl MessageSink for FileSink {
    fn message(&self, kind: MessageKind, text: &str) {
        let clean = sanitize(text);
        if clean.is_empty() {
            return;
        }
        self.pending.lock().push((kind, clean));
    }

    fn flush(&self) {
        if let Err(e) = self.write_pending() {
            warn!(error = %e, "failed to write diagnostics");
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// One log entry: timestamp line, message, three blank lines.
pub(crate) fn format_entry(at: DateTime<Utc>, message: &str) -> String {
    format!("{}\n{message}\n\n\n\n", at.format("%a, %d %b %Y %H:%M:%S GMT"))
}

/// Name a full log file is moved to.
pub(crate) fn rotated_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.log", at.format("%Y%m%dT%H%M%S")));
    path.with_file_name(name)
}

/// Moves `path` aside if it is larger than `max_size`.
///
/// Returns the new name when a rotation happened.
pub(crate) fn rotate_if_needed(
    path: &Path,
    max_size: u64,
    at: DateTime<Utc>,
) -> Result<Option<PathBuf>, LogError> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(None),
    };
    if size <= max_size {
        return Ok(None);
    }

    let target = rotated_path(path, at);
    fs::rename(path, &target).map_err(|e| LogError::rotate(path, &target, e))?;
    debug!(from = %path.display(), to = %target.display(), size, "log file rotated");
    Ok(Some(target))
}

fn append_entry(path: &Path, entry: &str, max_size: u64, at: DateTime<Utc>) -> Result<(), LogError> {
    rotate_if_needed(path, max_size, at)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogError::write(path, e))?;
    file.write_all(entry.as_bytes())
        .map_err(|e| LogError::write(path, e))
}
