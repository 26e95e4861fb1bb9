use std::io;
use std::sync::{Arc, PoisonError, RwLock};

/// Anything text can be written to.
///
/// Implementations are shared between threads behind a [`SinkRef`], so all
/// methods take `&self` and do their own locking.
pub trait Sink: Send + Sync {
    fn write_str(&self, text: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Short human-readable name used in logs and redirection locations.
    fn name(&self) -> &str;

    /// Writer references this sink holds directly, by attribute name.
    ///
    /// Wrappers that forward to another sink expose the slot they forward
    /// through here so a redirection can reach one level inside them.
    fn writer_attributes(&self) -> Vec<(&'static str, &WriterSlot)> {
        Vec::new()
    }
}

pub type SinkRef = Arc<dyn Sink>;

/// Reference identity of two sinks, ignoring vtable differences.
pub fn same_sink(a: &SinkRef, b: &SinkRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// A named place that holds a writer and can have it swapped out.
pub struct WriterSlot {
    attribute: &'static str,
    sink: RwLock<SinkRef>,
}

impl WriterSlot {
    pub fn new(attribute: &'static str, sink: SinkRef) -> Self {
        Self {
            attribute,
            sink: RwLock::new(sink),
        }
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn get(&self) -> SinkRef {
        Arc::clone(&self.sink.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Installs `sink` and hands back whatever was there before.
    pub fn replace(&self, sink: SinkRef) -> SinkRef {
        let mut guard = self.sink.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, sink)
    }

    pub fn holds(&self, sink: &SinkRef) -> bool {
        same_sink(&self.get(), sink)
    }

    /// Writes through the current sink. The slot lock is released before the
    /// write so a sink may itself be swapped while writing.
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        self.get().write_str(text)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.get().flush()
    }
}

impl std::fmt::Debug for WriterSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSlot")
            .field("attribute", &self.attribute)
            .field("sink", &self.get().name())
            .finish()
    }
}
