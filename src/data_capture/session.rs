//! Capture session lifecycle.
//!
//! A [`CaptureSession`] moves `Idle -> Capturing -> Stopped` exactly once.
//! While capturing it owns one [`RecordedSink`] and one
//! [`RedirectionRegistry`] per captured channel; stopping replays the
//! registries so every writer is back where it was found.
//!
//! Minimal usage
//! ```no_run
//! use testdata::data_capture::{CaptureOptions, CaptureSession};
//!
//! # fn run() -> Result<(), testdata::CaptureError> {
//! let scope = CaptureSession::new(CaptureOptions::default()).enter(Some(false))?;
//! testdata::stdoutln!("hello").ok();
//! testdata::stderrln!("careful").ok();
//! let output = scope.finish();
//! assert_eq!(output.lines(), vec!["hello", "careful"]);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::configuration::{self, CaptureConfig};
use crate::error_handling::types::CaptureError;
use crate::stdio;

use super::merged_view::MergedView;
use super::recorded_sink::RecordedSink;
use super::redirection::RedirectionRegistry;
use super::timestamp::TimestampSource;
use super::types::{CaptureSummary, Channel};

/// What a session captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub capture_output: bool,
    pub capture_error: bool,
    /// Also redirect logging handlers bound to a captured channel.
    pub capture_logging_writers: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            capture_output: true,
            capture_error: true,
            capture_logging_writers: true,
        }
    }
}

impl CaptureOptions {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            capture_logging_writers: config.capture_logging_writers,
            ..Self::default()
        }
    }

    pub fn output_only() -> Self {
        Self {
            capture_error: false,
            ..Self::default()
        }
    }

    pub fn error_only() -> Self {
        Self {
            capture_output: false,
            ..Self::default()
        }
    }

    fn wants(&self, channel: Channel) -> bool {
        match channel {
            Channel::Output => self.capture_output,
            Channel::Error => self.capture_error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Stopped,
}

#[derive(Debug)]
pub struct CaptureSession {
    session_id: Uuid,
    options: CaptureOptions,
    state: SessionState,
    clock: Arc<TimestampSource>,
    sinks: Vec<Arc<RecordedSink>>,
    registries: Vec<RedirectionRegistry>,
    redirections: usize,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl CaptureSession {
    pub fn new(options: CaptureOptions) -> Self {
        let session_id = Uuid::new_v4();
        debug!("[{}] CaptureSession created: {:?}", session_id, options);
        Self {
            session_id,
            options,
            state: SessionState::Idle,
            clock: Arc::new(TimestampSource::new()),
            sinks: Vec::new(),
            registries: Vec::new(),
            redirections: 0,
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.session_id
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Redirects every wanted channel and begins recording.
    ///
    /// Sinks only start recording once all redirections are in place, so a
    /// write racing the setup is passed through (or dropped) rather than
    /// half-recorded.
    ///
    /// Errors
    /// - [`CaptureError::AlreadyStarted`] while capturing.
    /// - [`CaptureError::AlreadyStopped`] once stopped; use a new session.
    /// - [`CaptureError::ChannelBusy`] if another session holds a wanted
    ///   channel. Redirections already made by this call are undone and the
    ///   session stays idle.
    pub fn start(&mut self, passthrough: bool) -> Result<(), CaptureError> {
        match self.state {
            SessionState::Capturing => return Err(CaptureError::AlreadyStarted),
            SessionState::Stopped => return Err(CaptureError::AlreadyStopped),
            SessionState::Idle => {}
        }
        debug!(
            "[{}] starting capture (passthrough={})",
            self.session_id, passthrough
        );

        let mut sinks = Vec::new();
        let mut registries = Vec::new();
        for channel in Channel::ALL {
            if !self.options.wants(channel) {
                continue;
            }
            let sink = Arc::new(RecordedSink::new(
                channel,
                stdio::current_sink(channel),
                Arc::clone(&self.clock),
                passthrough,
            ));
            match RedirectionRegistry::install(
                self.session_id,
                Arc::clone(&sink),
                self.options.capture_logging_writers,
            ) {
                Ok(registry) => {
                    sinks.push(sink);
                    registries.push(registry);
                }
                Err(e) => {
                    for registry in registries {
                        registry.restore();
                    }
                    return Err(e);
                }
            }
        }

        self.redirections = registries.iter().map(|r| r.entries().len()).sum();
        self.sinks = sinks;
        self.registries = registries;
        for sink in &self.sinks {
            sink.set_capturing(true);
        }
        self.state = SessionState::Capturing;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Stops recording and restores every redirected writer.
    ///
    /// A no-op unless the session is capturing, so it is safe on cleanup
    /// paths that may run more than once.
    pub fn stop(&mut self) {
        if self.state != SessionState::Capturing {
            return;
        }
        for sink in &self.sinks {
            sink.set_capturing(false);
        }
        for registry in self.registries.drain(..) {
            registry.restore();
        }
        self.state = SessionState::Stopped;
        self.stopped_at = Some(Utc::now());
        debug!(
            "[{}] capture stopped: {} fragment(s), {} byte(s)",
            self.session_id,
            self.sinks.iter().map(|s| s.len()).sum::<usize>(),
            self.sinks.iter().map(|s| s.total_bytes()).sum::<u64>()
        );
    }

    /// Starts the session and wraps it in a scope that stops it on drop.
    ///
    /// `passthrough` defaults to the process-wide configuration.
    pub fn enter(mut self, passthrough: Option<bool>) -> Result<CaptureScope, CaptureError> {
        let passthrough = passthrough.unwrap_or_else(|| configuration::global().passthrough);
        self.start(passthrough)?;
        Ok(CaptureScope { session: self })
    }

    /// The recorded output so far, merged across captured channels.
    pub fn view(&self) -> MergedView {
        MergedView::new(self.session_id, self.sinks.clone())
    }

    pub fn summary(&self) -> CaptureSummary {
        let count = |channel: Channel| {
            self.sinks
                .iter()
                .filter(|s| s.channel() == channel)
                .map(|s| s.len())
                .sum::<usize>()
        };
        let duration = match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => stop - start,
            (Some(start), None) => Utc::now() - start,
            _ => chrono::Duration::zero(),
        };
        CaptureSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            duration,
            output_fragments: count(Channel::Output),
            error_fragments: count(Channel::Error),
            total_bytes: self.sinks.iter().map(|s| s.total_bytes()).sum(),
            redirections: self.redirections,
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A capturing session bound to a scope.
///
/// Dropping the scope stops the session, including while unwinding from a
/// panic, so redirections never outlive it.
#[derive(Debug)]
pub struct CaptureScope {
    session: CaptureSession,
}

impl CaptureScope {
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn view(&self) -> MergedView {
        self.session.view()
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    /// Stops capturing and returns what was recorded.
    pub fn finish(mut self) -> MergedView {
        self.session.stop();
        self.session.view()
    }
}

impl std::ops::Deref for CaptureScope {
    type Target = CaptureSession;

    fn deref(&self) -> &CaptureSession {
        &self.session
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        self.session.stop();
    }
}

/// Runs `f` with the given channels captured and returns its result along
/// with the merged output.
pub fn capture<T, F>(options: CaptureOptions, f: F) -> Result<(T, MergedView), CaptureError>
where
    F: FnOnce() -> T,
{
    let scope = CaptureSession::new(options).enter(None)?;
    let value = f();
    Ok((value, scope.finish()))
}
