//! Record destinations.
//!
//! Every destination is a `tracing-subscriber` [`MakeWriter`]. The fmt layer
//! formats a whole record before handing it over in a single write, so
//! concurrent requests never interleave inside a line.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};

use crate::config::{LogOutput, LoggerConfig};
use crate::observability::logging::LoggerError;

/// Build the writer named by `config.output`.
///
/// Files are opened for append and created, along with missing parent
/// directories, when absent. They are never rotated.
pub fn make_writer(config: &LoggerConfig) -> Result<BoxMakeWriter, LoggerError> {
    match config.output {
        LogOutput::Stdout => Ok(BoxMakeWriter::new(io::stdout)),
        LogOutput::Stderr => Ok(BoxMakeWriter::new(io::stderr)),
        LogOutput::File => open_file(config.file_path.trim()).map(BoxMakeWriter::new),
    }
}

fn open_file(path: &str) -> Result<RollingFileAppender, LoggerError> {
    if path.is_empty() {
        return Err(LoggerError::MissingFilePath);
    }
    let path = Path::new(path);
    let file_name = path.file_name().ok_or(LoggerError::MissingFilePath)?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|source| LoggerError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
}

/// In-memory capture of emitted records.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to the logger.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raw lines in emission order.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Lines parsed as JSON objects; lines that are not JSON are skipped.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Records whose `msg` equals `message`.
    pub fn records_with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["msg"] == message)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Writer handed out by [`MemorySink`] for one record.
pub struct MemoryWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for MemoryWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemorySink {
    type Writer = MemoryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MemoryWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_output_without_path_is_rejected() {
        let config = LoggerConfig {
            output: LogOutput::File,
            ..LoggerConfig::default()
        };
        assert!(matches!(make_writer(&config), Err(LoggerError::MissingFilePath)));
    }

    #[test]
    fn unopenable_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("logs");
        std::fs::create_dir(&occupied).unwrap();

        let config = LoggerConfig {
            output: LogOutput::File,
            file_path: occupied.display().to_string(),
            ..LoggerConfig::default()
        };
        assert!(matches!(make_writer(&config), Err(LoggerError::OpenFile { .. })));
    }

    #[test]
    fn file_writer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "existing\n").unwrap();

        let config = LoggerConfig {
            output: LogOutput::File,
            file_path: path.display().to_string(),
            ..LoggerConfig::default()
        };
        let writer = make_writer(&config).unwrap();
        writer.make_writer().write_all(b"first\n").unwrap();
        writer.make_writer().write_all(b"second\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nfirst\nsecond\n");
    }

    #[test]
    fn memory_sink_clones_share_buffer() {
        let capture = MemorySink::new();
        let writer = capture.clone();
        writer.make_writer().write_all(b"{\"msg\":\"hello\"}\n").unwrap();
        writer.make_writer().write_all(b"not json\n").unwrap();

        assert_eq!(capture.lines().len(), 2);
        assert_eq!(capture.records().len(), 1);
        assert_eq!(capture.records_with_message("hello").len(), 1);
    }
}
