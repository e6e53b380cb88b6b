//! Tracing writer for the optional file log layer.
//!
//! [`FileMakeWriter`] appends every formatted event to one file. The file
//! layer should be configured with `.with_ansi(false)` so no ANSI
//! stripping is needed.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// [`MakeWriter`](tracing_subscriber::fmt::MakeWriter) for the file layer.
#[derive(Clone)]
pub struct FileMakeWriter {
    file: Arc<Mutex<File>>,
}

impl FileMakeWriter {
    /// Opens `path` for appending, creating parent directories.
    ///
    /// Returns `None` (after a warning on stderr) if the file cannot be opened.
    pub fn open(path: &Path) -> Option<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Warning: cannot create log directory {}: {e}", parent.display());
                return None;
            }
        }

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Self {
                file: Arc::new(Mutex::new(file)),
            }),
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {e}", path.display());
                None
            }
        }
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FileMakeWriter {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: Arc::clone(&self.file),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Per-event writer for file output.
///
/// Buffers bytes from the tracing formatter. On [`Drop`], appends
/// the buffer to the log file under a lock.
pub struct FileWriter {
    file: Arc<Mutex<File>>,
    buf: Vec<u8>,
}

impl Write for FileWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }

        let mut file = self.file.lock();
        let _ = file.write_all(&self.buf);
        let _ = file.flush();
    }
}
