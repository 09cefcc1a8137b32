//! `log` backend that forwards records to the embedding UI
//!
//! The UI layer registers a [`LogCallback`] to surface tracker logs in its
//! own console or log view. Without a callback records are dropped.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::{Level, Log, Metadata, Record, SetLoggerError};

/// Receives formatted log records
pub trait LogCallback: Send + Sync {
    fn on_log(&self, level: Level, target: &str, message: &str);
}

impl<F> LogCallback for F
where
    F: Fn(Level, &str, &str) + Send + Sync,
{
    fn on_log(&self, level: Level, target: &str, message: &str) {
        self(level, target, message)
    }
}

/// Global storage for the logger
static UI_LOGGER: OnceLock<UiLogger> = OnceLock::new();

struct UiLogger {
    callback: RwLock<Option<Arc<dyn LogCallback>>>,
    max_level: RwLock<Level>,
}

impl UiLogger {
    fn new(max_level: Level) -> Self {
        Self {
            callback: RwLock::new(None),
            max_level: RwLock::new(max_level),
        }
    }

    fn set_callback(&self, callback: Option<Arc<dyn LogCallback>>) {
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    fn set_max_level(&self, level: Level) {
        *self.max_level.write().unwrap_or_else(PoisonError::into_inner) = level;
    }

    fn max_level(&self) -> Level {
        *self.max_level.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn callback(&self) -> Option<Arc<dyn LogCallback>> {
        self.callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Log for UiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Clone out of the lock so a callback that logs cannot deadlock
        if let Some(callback) = self.callback() {
            let message = record.args().to_string();
            callback.on_log(record.level(), record.target(), &message);
        }
    }

    fn flush(&self) {}
}

/// Install the UI logger as the global `log` backend
///
/// Call once at startup; the callback can be attached later with
/// [`set_log_callback`]. Fails if another logger is already installed.
pub fn init_logger(max_level: Level) -> Result<(), SetLoggerError> {
    let logger = UI_LOGGER.get_or_init(|| UiLogger::new(max_level));
    log::set_logger(logger)?;
    log::set_max_level(max_level.to_level_filter());
    Ok(())
}

/// Attach or detach the receiver of log records
pub fn set_log_callback(callback: Option<Arc<dyn LogCallback>>) {
    if let Some(logger) = UI_LOGGER.get() {
        logger.set_callback(callback);
    }
}

/// Change the most verbose level that is forwarded
pub fn set_log_level(level: Level) {
    if let Some(logger) = UI_LOGGER.get() {
        logger.set_max_level(level);
        log::set_max_level(level.to_level_filter());
    }
}
