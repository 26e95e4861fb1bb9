pub mod sink;
pub mod sinks;
pub mod streams;

pub use sink::{same_sink, Sink, SinkRef, WriterSlot};
pub use sinks::{FailingSink, FileSink, MemorySink, PrefixSink, StderrSink, StdoutSink};
pub use streams::{current_sink, process_slot, set_sink, stderr, stdout, StdStream};
