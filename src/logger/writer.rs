//! File sink for the fmt layer.
//!
//! Once a write to the log file fails, every later event goes to stderr so
//! that logging never takes the service down.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::logger::config::FileConfig;

struct SinkState {
    file: BufWriter<File>,
    fallback: bool,
}

#[derive(Clone)]
pub struct LogFileWriter {
    state: Arc<Mutex<SinkState>>,
}

fn open_log_file(path: &Path, append: bool) -> io::Result<BufWriter<File>> {
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options.open(path).map(BufWriter::new)
}

impl LogFileWriter {
    /// Opens (and creates the parent directory of) the configured log file.
    pub fn new(config: &FileConfig) -> io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = open_log_file(&config.path, config.append)?;
        Ok(Self {
            state: Arc::new(Mutex::new(SinkState {
                file,
                fallback: false,
            })),
        })
    }

    #[cfg(test)]
    pub fn is_in_fallback_mode(&self) -> bool {
        self.state.lock().map(|s| s.fallback).unwrap_or(true)
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileGuard {
            state: Arc::clone(&self.state),
        }
    }
}

pub struct LogFileGuard {
    state: Arc<Mutex<SinkState>>,
}

impl Write for LogFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        if state.fallback {
            return io::stderr().write(buf);
        }
        match state.file.write(buf) {
            Ok(written) => Ok(written),
            Err(e) => {
                state.fallback = true;
                eprintln!("[logger] file write failed, falling back to stderr: {e}");
                io::stderr().write(buf)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;
        if state.fallback {
            io::stderr().flush()
        } else {
            state.file.flush()
        }
    }
}

/// The fmt layer takes one guard per event and never flushes it.
impl Drop for LogFileGuard {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
