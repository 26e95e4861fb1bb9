use std::io;

use log::{LevelFilter, Metadata, Record};

use crate::data_capture::types::Channel;
use crate::stdio::{self, SinkRef, WriterSlot};

/// A structured-logging handler that formats records onto a writer.
///
/// The writer lives in a [`WriterSlot`] named `writer`, which is what a
/// capture session looks at when it redirects logging output.
#[derive(Debug)]
pub struct Handler {
    name: String,
    level: LevelFilter,
    writer: WriterSlot,
}

impl Handler {
    pub fn new(name: impl Into<String>, level: LevelFilter, sink: SinkRef) -> Self {
        Self {
            name: name.into(),
            level,
            writer: WriterSlot::new("writer", sink),
        }
    }

    /// A handler writing to whatever sink `channel` currently has installed.
    pub fn for_channel(name: impl Into<String>, level: LevelFilter, channel: Channel) -> Self {
        Self::new(name, level, stdio::current_sink(channel))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn writer(&self) -> &WriterSlot {
        &self.writer
    }

    pub fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    /// Formats `record` and writes it, if the handler's level admits it.
    pub fn handle(&self, record: &Record<'_>) -> io::Result<()> {
        if !self.enabled(record.metadata()) {
            return Ok(());
        }
        self.writer.write_str(&Self::format(record))
    }

    pub fn format(record: &Record<'_>) -> String {
        format!("{} {}: {}\n", record.level(), record.target(), record.args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdio::MemorySink;
    use log::Level;
    use std::sync::Arc;

    #[test]
    fn formats_level_target_and_message() {
        let sink = Arc::new(MemorySink::new("mem"));
        let handler = Handler::new("test", LevelFilter::Info, sink.clone());

        handler
            .handle(
                &Record::builder()
                    .level(Level::Warn)
                    .target("app::db")
                    .args(format_args!("slow query {}ms", 120))
                    .build(),
            )
            .unwrap();

        assert_eq!(sink.contents(), "WARN app::db: slow query 120ms\n");
    }

    #[test]
    fn records_below_level_are_dropped() {
        let sink = Arc::new(MemorySink::new("mem"));
        let handler = Handler::new("test", LevelFilter::Info, sink.clone());

        handler
            .handle(
                &Record::builder()
                    .level(Level::Debug)
                    .target("app")
                    .args(format_args!("noise"))
                    .build(),
            )
            .unwrap();

        assert!(sink.writes().is_empty());
        assert_eq!(handler.level(), LevelFilter::Info);
        assert_eq!(handler.writer().attribute(), "writer");
    }
}
