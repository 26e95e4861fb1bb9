use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds elapsed since the first time any capture clock was read.
fn clock_nanos() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Issues strictly increasing timestamps.
///
/// Reads the monotonic clock; when the clock has not advanced past the last
/// issued value, the last value plus one is issued instead. Shared between
/// every sink of a session so records from different channels compare
/// exactly.
///
/// Values saturate at `u64::MAX`; once there, further calls keep returning
/// it. The clock itself takes centuries to get close.
#[derive(Debug, Default)]
pub struct TimestampSource {
    last: AtomicU64,
}

impl TimestampSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = clock_nanos();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = if now > last { now } else { last.saturating_add(1) };
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }

    /// A source that behaves as if `value` had already been issued.
    pub(crate) fn starting_at(value: u64) -> Self {
        Self {
            last: AtomicU64::new(value),
        }
    }

    /// Last value handed out, or 0 when nothing has been issued yet.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}
