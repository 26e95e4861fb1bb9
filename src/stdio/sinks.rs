//! Stock [`Sink`] implementations.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::debug;

use super::sink::{Sink, SinkRef, WriterSlot};

/// The real process standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_str(&self, text: &str) -> io::Result<()> {
        io::stdout().lock().write_all(text.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// The real process standard error.
#[derive(Debug, Default)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn write_str(&self, text: &str) -> io::Result<()> {
        io::stderr().lock().write_all(text.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }

    fn name(&self) -> &str {
        "stderr"
    }
}

/// Keeps every write in memory, one entry per call.
#[derive(Debug)]
pub struct MemorySink {
    name: String,
    writes: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Each write, in the order it was received.
    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contents(&self) -> String {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .concat()
    }

    pub fn clear(&self) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for MemorySink {
    fn write_str(&self, text: &str) -> io::Result<()> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Appends every write to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("FileSink opened at {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_str(&self, text: &str) -> io::Result<()> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(text.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Prefixes each write and forwards it to an inner writer.
///
/// The inner writer is exposed as the `inner` attribute.
#[derive(Debug)]
pub struct PrefixSink {
    prefix: String,
    inner: WriterSlot,
}

impl PrefixSink {
    pub fn new(prefix: impl Into<String>, inner: SinkRef) -> Self {
        Self {
            prefix: prefix.into(),
            inner: WriterSlot::new("inner", inner),
        }
    }

    pub fn inner(&self) -> &WriterSlot {
        &self.inner
    }
}

impl Sink for PrefixSink {
    fn write_str(&self, text: &str) -> io::Result<()> {
        self.inner.write_str(&format!("{}{}", self.prefix, text))
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }

    fn name(&self) -> &str {
        "prefix"
    }

    fn writer_attributes(&self) -> Vec<(&'static str, &WriterSlot)> {
        vec![(self.inner.attribute(), &self.inner)]
    }
}

/// Rejects every write with the configured error kind.
#[derive(Debug)]
pub struct FailingSink {
    kind: io::ErrorKind,
}

impl FailingSink {
    pub fn new(kind: io::ErrorKind) -> Self {
        Self { kind }
    }
}

impl Sink for FailingSink {
    fn write_str(&self, _text: &str) -> io::Result<()> {
        Err(io::Error::new(self.kind, "sink rejected write"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn memory_sink_keeps_each_write() {
        let sink = MemorySink::new("mem");
        sink.write_str("a").unwrap();
        sink.write_str("bc").unwrap();
        assert_eq!(sink.writes(), vec!["a".to_string(), "bc".to_string()]);
        assert_eq!(sink.contents(), "abc");
        sink.clear();
        assert!(sink.writes().is_empty());
    }

    #[test]
    fn file_sink_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.log");
        let sink = FileSink::open(&path).unwrap();
        sink.write_str("hello ").unwrap();
        sink.write_str("world").unwrap();
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn prefix_sink_exposes_inner_writer() {
        let target = Arc::new(MemorySink::new("target"));
        let wrapper = PrefixSink::new("> ", target.clone());
        wrapper.write_str("line\n").unwrap();
        assert_eq!(target.contents(), "> line\n");

        let attrs = wrapper.writer_attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].0, "inner");
        let expected: SinkRef = target;
        assert!(attrs[0].1.holds(&expected));
    }

    #[test]
    fn failing_sink_reports_kind() {
        let sink = FailingSink::new(io::ErrorKind::BrokenPipe);
        let err = sink.write_str("x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
