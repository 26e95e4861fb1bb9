use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error_handling::types::CaptureError;
use crate::stdio::{Sink, SinkRef};

use super::timestamp::TimestampSource;
use super::types::{Channel, Record};

/// Stands in for a real sink while a channel is captured.
///
/// Every write is stamped and kept in a min-heap keyed by timestamp. With
/// passthrough enabled the write is also forwarded, unchanged, to the sink
/// that was replaced.
pub struct RecordedSink {
    channel: Channel,
    real: SinkRef,
    clock: Arc<TimestampSource>,
    records: Mutex<BinaryHeap<Reverse<Record>>>,
    capturing: AtomicBool,
    passthrough: bool,
}

impl RecordedSink {
    pub fn new(
        channel: Channel,
        real: SinkRef,
        clock: Arc<TimestampSource>,
        passthrough: bool,
    ) -> Self {
        Self {
            channel,
            real,
            clock,
            records: Mutex::new(BinaryHeap::new()),
            capturing: AtomicBool::new(false),
            passthrough,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The sink this one replaced.
    pub fn real(&self) -> &SinkRef {
        &self.real
    }

    pub fn passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub(crate) fn set_capturing(&self, capturing: bool) {
        self.capturing.store(capturing, Ordering::Release);
    }

    /// Records `text` (while capturing) and forwards it when passthrough is on.
    ///
    /// Stamping and insertion happen under the heap lock; the forward happens
    /// after the lock is released.
    pub fn record(&self, text: &str) -> Result<(), CaptureError> {
        if self.is_capturing() {
            let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            let timestamp = self.clock.next();
            records.push(Reverse(Record {
                timestamp,
                text: text.to_string(),
            }));
        }
        if self.passthrough {
            self.real
                .write_str(text)
                .map_err(CaptureError::PassthroughWriteFailed)?;
        }
        Ok(())
    }

    /// All records in timestamp order. Each call is a fresh pass.
    pub fn records(&self) -> Vec<Record> {
        let heap = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        heap.into_sorted_vec()
            .into_iter()
            .rev()
            .map(|Reverse(record)| record)
            .collect()
    }

    /// Recorded text fragments in timestamp order.
    pub fn iterate(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.text).collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|Reverse(r)| r.text.len() as u64)
            .sum()
    }
}

impl Sink for RecordedSink {
    fn write_str(&self, text: &str) -> io::Result<()> {
        self.record(text).map_err(io::Error::from)
    }

    fn flush(&self) -> io::Result<()> {
        self.real.flush()
    }

    fn name(&self) -> &str {
        "recorded"
    }
}

impl std::fmt::Debug for RecordedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordedSink")
            .field("channel", &self.channel)
            .field("real", &self.real.name())
            .field("capturing", &self.is_capturing())
            .field("passthrough", &self.passthrough)
            .field("records", &self.len())
            .finish()
    }
}
