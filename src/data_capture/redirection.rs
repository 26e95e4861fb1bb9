//! Swapping writers for a [`RecordedSink`] and putting them back.
//!
//! A redirection is recorded as where the writer was found (holder plus
//! attribute) and what was there, so restoring is a replay of the recorded
//! entries.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use log::{debug, error, trace, warn};
use uuid::Uuid;

use crate::error_handling::types::CaptureError;
use crate::logging::{self, Handler};
use crate::stdio::{self, same_sink, SinkRef, WriterSlot};

use super::recorded_sink::RecordedSink;
use super::types::Channel;

/// Sessions currently holding each channel, indexed by `Channel as usize`.
static CLAIMS: Mutex<[Option<Uuid>; 2]> = Mutex::new([None, None]);

/// The object holding a redirected writer.
pub enum Holder {
    /// The process-wide handle for a channel.
    Process(Channel),
    /// A logging handler's own writer.
    Handler(Arc<Handler>),
    /// A wrapper installed as a logging handler's writer.
    Wrapper { handler: Arc<Handler>, wrapper: SinkRef },
}

/// One substituted writer reference.
pub struct Redirection {
    location: String,
    holder: Holder,
    attribute: &'static str,
    original: SinkRef,
}

impl Redirection {
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn holder(&self) -> &Holder {
        &self.holder
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn original(&self) -> &SinkRef {
        &self.original
    }

    fn slot(&self) -> Option<&WriterSlot> {
        match &self.holder {
            Holder::Process(channel) => Some(stdio::process_slot(*channel)),
            Holder::Handler(handler) => Some(handler.writer()),
            Holder::Wrapper { wrapper, .. } => wrapper
                .writer_attributes()
                .into_iter()
                .find(|(name, _)| *name == self.attribute)
                .map(|(_, slot)| slot),
        }
    }
}

impl std::fmt::Debug for Redirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redirection")
            .field("location", &self.location)
            .field("attribute", &self.attribute)
            .field("original", &self.original.name())
            .finish()
    }
}

/// The redirections installed for one channel of one session.
///
/// Restoring consumes the registry, so each set of entries is put back
/// exactly once.
#[derive(Debug)]
pub struct RedirectionRegistry {
    session_id: Uuid,
    channel: Channel,
    recorded: Arc<RecordedSink>,
    entries: Vec<Redirection>,
}

impl RedirectionRegistry {
    /// Replaces every known writer bound to `recorded`'s real sink with
    /// `recorded`.
    ///
    /// The process-wide handle is always replaced. With `include_logging`,
    /// each registered handler is searched as well: its own writer first,
    /// then one level into that writer's attributes. Handlers where the real
    /// sink is not found are left untouched.
    ///
    /// Errors
    /// - [`CaptureError::ChannelBusy`] if another session holds `channel`;
    ///   nothing is swapped in that case.
    pub fn install(
        session_id: Uuid,
        recorded: Arc<RecordedSink>,
        include_logging: bool,
    ) -> Result<Self, CaptureError> {
        let channel = recorded.channel();
        claim(session_id, channel)?;

        let real = Arc::clone(recorded.real());
        let replacement: SinkRef = recorded.clone();
        let mut entries = Vec::new();

        let original = stdio::process_slot(channel).replace(Arc::clone(&replacement));
        if !same_sink(&original, &real) {
            warn!(
                "[{}] process {} sink changed between session setup and install",
                session_id, channel
            );
        }
        entries.push(Redirection {
            location: format!("process.{}", channel),
            holder: Holder::Process(channel),
            attribute: stdio::process_slot(channel).attribute(),
            original,
        });

        if include_logging {
            for handler in logging::handlers() {
                match redirect_handler(&handler, &real, &replacement) {
                    Ok(found) => entries.extend(found),
                    Err(e) => debug!("[{}] skipping handler: {}", session_id, e),
                }
            }
        }

        debug!(
            "[{}] installed {} redirection(s) for {}",
            session_id,
            entries.len(),
            channel
        );
        for entry in &entries {
            trace!("[{}] redirected {}", session_id, entry.location);
        }

        Ok(Self {
            session_id,
            channel,
            recorded,
            entries,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn entries(&self) -> &[Redirection] {
        &self.entries
    }

    /// Puts every original writer back where it was found and releases the
    /// channel.
    ///
    /// # Panics
    /// If a recorded location no longer exists. Leaving a writer redirected
    /// would corrupt every later capture, so this is not recoverable. The
    /// remaining entries are restored and the channel is released first.
    /// While the thread is already unwinding the loss is logged instead, so
    /// a scope dropped during a panic never aborts the process.
    pub fn restore(self) {
        let recorded: SinkRef = self.recorded.clone();
        let mut vanished = Vec::new();
        for entry in &self.entries {
            let Some(slot) = entry.slot() else {
                error!(
                    "[{}] cannot restore {}: attribute {} is gone",
                    self.session_id, entry.location, entry.attribute
                );
                vanished.push(entry.location.as_str());
                continue;
            };
            let displaced = slot.replace(Arc::clone(&entry.original));
            if !same_sink(&displaced, &recorded) {
                warn!(
                    "[{}] {} held a foreign writer ({}) at restore",
                    self.session_id,
                    entry.location,
                    displaced.name()
                );
            }
        }
        release(self.session_id, self.channel);
        debug!(
            "[{}] restored {} redirection(s) for {}",
            self.session_id,
            self.entries.len(),
            self.channel
        );
        if !vanished.is_empty() && !thread::panicking() {
            panic!("redirection location(s) vanished: {}", vanished.join(", "));
        }
    }
}

fn redirect_handler(
    handler: &Arc<Handler>,
    real: &SinkRef,
    replacement: &SinkRef,
) -> Result<Vec<Redirection>, CaptureError> {
    let writer = handler.writer();
    if writer.holds(real) {
        let original = writer.replace(Arc::clone(replacement));
        return Ok(vec![Redirection {
            location: format!("handler:{}.{}", handler.name(), writer.attribute()),
            holder: Holder::Handler(Arc::clone(handler)),
            attribute: writer.attribute(),
            original,
        }]);
    }

    let wrapper = writer.get();
    let mut found = Vec::new();
    for (attribute, slot) in wrapper.writer_attributes() {
        if slot.holds(real) {
            let original = slot.replace(Arc::clone(replacement));
            found.push(Redirection {
                location: format!(
                    "handler:{}.{}.{}",
                    handler.name(),
                    writer.attribute(),
                    attribute
                ),
                holder: Holder::Wrapper {
                    handler: Arc::clone(handler),
                    wrapper: Arc::clone(&wrapper),
                },
                attribute,
                original,
            });
        }
    }

    if found.is_empty() {
        return Err(CaptureError::RedirectionNotFound(format!(
            "handler {} writes to {}, not {}",
            handler.name(),
            wrapper.name(),
            real.name()
        )));
    }
    Ok(found)
}

fn claim(session_id: Uuid, channel: Channel) -> Result<(), CaptureError> {
    let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
    match claims[channel as usize] {
        Some(owner) if owner != session_id => Err(CaptureError::ChannelBusy(channel)),
        _ => {
            claims[channel as usize] = Some(session_id);
            Ok(())
        }
    }
}

fn release(session_id: Uuid, channel: Channel) {
    let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
    if claims[channel as usize] == Some(session_id) {
        claims[channel as usize] = None;
    }
}
