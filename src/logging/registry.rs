//! Process-wide list of logging handlers and the `log` backend that feeds
//! them.

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, LevelFilter, Log, Metadata, Record, SetLoggerError};

use super::handler::Handler;

static HANDLERS: RwLock<Vec<Arc<Handler>>> = RwLock::new(Vec::new());
static DISPATCHER: Dispatcher = Dispatcher;

/// Adds `handler`, replacing any handler already registered under its name.
pub fn register(handler: Arc<Handler>) {
    let name = handler.name().to_string();
    let replaced = {
        let mut handlers = HANDLERS.write().unwrap_or_else(PoisonError::into_inner);
        match handlers.iter().position(|h| h.name() == name) {
            Some(pos) => {
                handlers[pos] = handler;
                true
            }
            None => {
                handlers.push(handler);
                false
            }
        }
    };
    debug!("Registered logging handler {} (replaced={})", name, replaced);
}

pub fn unregister(name: &str) -> Option<Arc<Handler>> {
    let removed = {
        let mut handlers = HANDLERS.write().unwrap_or_else(PoisonError::into_inner);
        handlers
            .iter()
            .position(|h| h.name() == name)
            .map(|pos| handlers.remove(pos))
    };
    if removed.is_some() {
        debug!("Unregistered logging handler {}", name);
    }
    removed
}

/// Snapshot of the registered handlers, in registration order.
pub fn handlers() -> Vec<Arc<Handler>> {
    HANDLERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn clear() {
    HANDLERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// `log` backend fanning every record out to the registered handlers.
pub struct Dispatcher;

impl Log for Dispatcher {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        handlers().iter().any(|h| h.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        for handler in handlers() {
            // log::Log has no error channel; a failing writer only loses this line.
            let _ = handler.handle(record);
        }
    }

    fn flush(&self) {
        for handler in handlers() {
            let _ = handler.writer().flush();
        }
    }
}

/// Installs the dispatcher as the `log` backend.
///
/// Fails if another logger was installed first.
pub fn try_init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&DISPATCHER)?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdio::MemorySink;
    use log::Level;
    use serial_test::serial;

    fn dispatch_at(level: Level) {
        Dispatcher.log(
            &Record::builder()
                .level(level)
                .target("registry_test")
                .args(format_args!("hello"))
                .build(),
        );
    }

    #[test]
    #[serial]
    fn register_replaces_by_name() {
        clear();
        let a = Arc::new(MemorySink::new("a"));
        let b = Arc::new(MemorySink::new("b"));
        register(Arc::new(Handler::new("main", LevelFilter::Info, a)));
        register(Arc::new(Handler::new("main", LevelFilter::Info, b.clone())));

        let all = handlers();
        assert_eq!(all.len(), 1);
        let expected: crate::stdio::SinkRef = b;
        assert!(all[0].writer().holds(&expected));
        clear();
    }

    #[test]
    #[serial]
    fn dispatcher_fans_out_by_level() {
        clear();
        let info = Arc::new(MemorySink::new("info"));
        let debug = Arc::new(MemorySink::new("debug"));
        register(Arc::new(Handler::new("info", LevelFilter::Info, info.clone())));
        register(Arc::new(Handler::new("debug", LevelFilter::Debug, debug.clone())));

        dispatch_at(Level::Debug);
        dispatch_at(Level::Info);

        assert_eq!(info.writes().len(), 1);
        assert_eq!(debug.writes().len(), 2);
        assert!(Dispatcher.enabled(&Metadata::builder().level(Level::Debug).build()));
        assert!(!Dispatcher.enabled(&Metadata::builder().level(Level::Trace).build()));
        clear();
    }

    #[test]
    #[serial]
    fn unregister_removes_only_named_handler() {
        clear();
        register(Arc::new(Handler::new(
            "keep",
            LevelFilter::Info,
            Arc::new(MemorySink::new("k")),
        )));
        register(Arc::new(Handler::new(
            "drop",
            LevelFilter::Info,
            Arc::new(MemorySink::new("d")),
        )));

        assert!(unregister("drop").is_some());
        assert!(unregister("drop").is_none());
        let names: Vec<_> = handlers().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(names, vec!["keep".to_string()]);
        clear();
    }
}
