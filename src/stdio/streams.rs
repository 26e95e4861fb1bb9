//! Process-wide output handles.
//!
//! Code that wants its output to be capturable writes through
//! [`stdout()`]/[`stderr()`] (or the `stdout!`/`stderr!` macros) instead of
//! `std::io` directly. Each handle resolves the channel's slot on every
//! write, so a redirection installed after the handle was created still
//! applies.

use std::io;
use std::sync::{Arc, OnceLock};

use log::debug;

use super::sink::{SinkRef, WriterSlot};
use super::sinks::{StderrSink, StdoutSink};
use crate::data_capture::types::Channel;

static STDOUT_SLOT: OnceLock<WriterSlot> = OnceLock::new();
static STDERR_SLOT: OnceLock<WriterSlot> = OnceLock::new();

/// The process-wide slot for `channel`.
pub fn process_slot(channel: Channel) -> &'static WriterSlot {
    match channel {
        Channel::Output => {
            STDOUT_SLOT.get_or_init(|| WriterSlot::new("stdout", Arc::new(StdoutSink)))
        }
        Channel::Error => {
            STDERR_SLOT.get_or_init(|| WriterSlot::new("stderr", Arc::new(StderrSink)))
        }
    }
}

/// The sink currently installed for `channel`.
pub fn current_sink(channel: Channel) -> SinkRef {
    process_slot(channel).get()
}

/// Swaps the sink for `channel` and returns the previous one.
///
/// Meant for test setup outside an active capture; a capture session keeps
/// its own record of what to put back.
pub fn set_sink(channel: Channel, sink: SinkRef) -> SinkRef {
    debug!("Replacing process {} sink with {}", channel, sink.name());
    process_slot(channel).replace(sink)
}

/// A handle to one process channel.
///
/// Byte writes through [`io::Write`] are decoded as UTF-8. A character
/// split across two calls is held back until its remaining bytes arrive,
/// so each forwarded write is whole text.
#[derive(Debug, Clone)]
pub struct StdStream {
    channel: Channel,
    pending: Vec<u8>,
}

impl StdStream {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            pending: Vec::new(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn write_str(&self, text: &str) -> io::Result<()> {
        process_slot(self.channel).write_str(text)
    }

    /// Bytes of an incomplete character waiting for the rest of it.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

impl io::Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let carried = self.pending.len();
        self.pending.extend_from_slice(buf);

        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                self.pending.truncate(carried);
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        };
        if complete > 0 {
            let text = std::str::from_utf8(&self.pending[..complete])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if let Err(e) = self.write_str(text) {
                self.pending.truncate(carried);
                return Err(e);
            }
            self.pending.drain(..complete);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        process_slot(self.channel).flush()
    }
}

pub fn stdout() -> StdStream {
    StdStream::new(Channel::Output)
}

pub fn stderr() -> StdStream {
    StdStream::new(Channel::Error)
}

/// Formats to the process output channel as a single write.
/// Evaluates to `io::Result<()>`.
#[macro_export]
macro_rules! stdout {
    ($($arg:tt)*) => {
        $crate::stdio::stdout().write_str(&::std::format!($($arg)*))
    };
}

/// Like [`stdout!`] with a trailing newline, still as a single write.
#[macro_export]
macro_rules! stdoutln {
    () => {
        $crate::stdio::stdout().write_str("\n")
    };
    ($($arg:tt)*) => {
        $crate::stdio::stdout().write_str(&::std::format!("{}\n", ::std::format_args!($($arg)*)))
    };
}

/// Formats to the process error channel as a single write.
/// Evaluates to `io::Result<()>`.
#[macro_export]
macro_rules! stderr {
    ($($arg:tt)*) => {
        $crate::stdio::stderr().write_str(&::std::format!($($arg)*))
    };
}

#[macro_export]
macro_rules! stderrln {
    () => {
        $crate::stdio::stderr().write_str("\n")
    };
    ($($arg:tt)*) => {
        $crate::stdio::stderr().write_str(&::std::format!("{}\n", ::std::format_args!($($arg)*)))
    };
}
