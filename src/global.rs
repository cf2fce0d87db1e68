//! Process-wide logger
//!
//! One shared [`Logger`] handle behind a lock, with an explicit lifecycle.
//! Before [`init`] every free-function recorder is inert, so library code
//! can log unconditionally without caring whether the host set a logger up.

use parking_lot::RwLock;

use crate::core::{Level, Logger, LoggerBuilder, Recorder, Result};

static GLOBAL: RwLock<Option<Logger>> = RwLock::new(None);

/// Builds and installs the process-wide logger. Any previous logger is
/// drained and closed first; its close error, if any, is discarded in
/// favor of the fresh install.
pub fn init(builder: LoggerBuilder) -> Result<()> {
    let logger = builder.build()?;
    let previous = GLOBAL.write().replace(logger);
    if let Some(previous) = previous {
        let _ = previous.shutdown();
    }
    Ok(())
}

/// Drains, closes and removes the process-wide logger. Safe to call
/// repeatedly or before [`init`].
pub fn shutdown() -> Result<()> {
    match GLOBAL.write().take() {
        Some(logger) => logger.shutdown(),
        None => Ok(()),
    }
}

/// A clone of the installed logger, if any.
pub fn logger() -> Option<Logger> {
    GLOBAL.read().clone()
}

pub fn set_level(level: Level) {
    if let Some(logger) = &*GLOBAL.read() {
        logger.set_level(level);
    }
}

pub fn level() -> Option<Level> {
    GLOBAL.read().as_ref().map(Logger::level)
}

/// Blocks until everything queued on the installed logger has been
/// written. A no-op before [`init`].
pub fn flush() -> Result<()> {
    match &*GLOBAL.read() {
        Some(logger) => logger.flush(),
        None => Ok(()),
    }
}

pub fn log(level: Level) -> Recorder {
    match &*GLOBAL.read() {
        Some(logger) => logger.log(level),
        None => Recorder::inert(),
    }
}

pub fn trace() -> Recorder {
    log(Level::Trace)
}

pub fn debug() -> Recorder {
    log(Level::Debug)
}

pub fn info() -> Recorder {
    log(Level::Info)
}

pub fn warn() -> Recorder {
    log(Level::Warn)
}

pub fn error() -> Recorder {
    log(Level::Error)
}

pub fn fatal() -> Recorder {
    log(Level::Fatal)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test drives the whole lifecycle; the global handle is shared
    // state, so splitting this up would make the tests order-dependent.
    #[test]
    fn test_lifecycle() {
        assert!(logger().is_none());
        assert!(info().is_inert());
        assert_eq!(level(), None);
        shutdown().expect("shutdown before init is a no-op");

        init(LoggerBuilder::new().level(Level::Warn)).expect("init");
        assert!(logger().is_some());
        assert!(info().is_inert());
        assert!(!warn().is_inert());

        set_level(Level::Trace);
        assert_eq!(level(), Some(Level::Trace));
        assert!(!trace().is_inert());
        flush().expect("flush");

        shutdown().expect("shutdown");
        assert!(logger().is_none());
        assert!(error().is_inert());
        shutdown().expect("second shutdown is a no-op");
    }
}
