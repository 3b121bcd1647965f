//! Sink for received messages
//!
//! Messages are written one per line, flushed as they arrive so that a
//! process reading our output sees them immediately.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

/// Line writer shared between the listener task and the main flow
pub struct MessageWriter {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl MessageWriter {
    /// Write to any sink
    pub fn new<W: Write + Send + 'static>(sink: W) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Write to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write to `path`, creating or truncating it
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Output file is not writable: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Write to `path` if given, otherwise to standard output
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::create(path),
            None => Ok(Self::stdout()),
        }
    }

    /// Write one message line and flush
    pub fn write_message(&self, message: &str) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(sink, "{}", message).and_then(|_| sink.flush()) {
            tracing::error!("Failed to write message to output: {}", e);
        }
    }

    /// Flush buffered output
    pub fn flush(&self) -> io::Result<()> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}
