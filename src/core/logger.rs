//! Logger handle and builder

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::error::Result;
use crate::core::level::Level;
use crate::core::printer::{flags, NopPrinter, Print, Printer};
use crate::core::recorder::Recorder;
use crate::writers::{MultiWriter, Writer};

struct LoggerCore {
    printer: Arc<dyn Print>,
    level: RwLock<Level>,
    flags: RwLock<u32>,
}

impl Drop for LoggerCore {
    fn drop(&mut self) {
        // Last handle gone: drain and close so buffered records survive.
        let _ = self.printer.shutdown();
    }
}

/// Cheap-to-clone logging handle. All clones share one pipeline, one level
/// threshold and one flag set; only the prefix is per-handle.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    prefix: Arc<str>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn level(&self) -> Level {
        *self.core.level.read()
    }

    pub fn set_level(&self, level: Level) {
        *self.core.level.write() = level;
    }

    pub fn flags(&self) -> u32 {
        *self.core.flags.read()
    }

    pub fn set_flags(&self, flags: u32) {
        *self.core.flags.write() = flags;
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derives a sub-logger whose records carry `(parent/segment) ` after
    /// the header. Level and flags stay shared with the parent.
    pub fn with_prefix(&self, segment: &str) -> Logger {
        let prefix: Arc<str> = if self.prefix.is_empty() {
            Arc::from(segment)
        } else {
            Arc::from(format!("{}/{}", self.prefix, segment))
        };
        Logger {
            core: Arc::clone(&self.core),
            prefix,
        }
    }

    /// Yields a live recorder iff `level` clears the threshold.
    pub fn log(&self, level: Level) -> Recorder {
        if level < *self.core.level.read() {
            return Recorder::inert();
        }
        Recorder::live(
            Arc::clone(&self.core.printer),
            level,
            *self.core.flags.read(),
            Arc::clone(&self.prefix),
        )
    }

    pub fn trace(&self) -> Recorder {
        self.log(Level::Trace)
    }

    pub fn debug(&self) -> Recorder {
        self.log(Level::Debug)
    }

    pub fn info(&self) -> Recorder {
        self.log(Level::Info)
    }

    pub fn warn(&self) -> Recorder {
        self.log(Level::Warn)
    }

    pub fn error(&self) -> Recorder {
        self.log(Level::Error)
    }

    pub fn fatal(&self) -> Recorder {
        self.log(Level::Fatal)
    }

    /// Conditional gate: `logger.when(cond).debug()...` yields an inert
    /// recorder when `cond` is false, whatever the level says.
    pub fn when(&self, cond: bool) -> Gate<'_> {
        Gate {
            logger: self,
            enabled: cond,
        }
    }

    /// Blocks until everything queued so far has reached the sink.
    pub fn flush(&self) -> Result<()> {
        self.core.printer.flush()
    }

    /// Drains the queue and closes the sink. Idempotent; the logger is
    /// inert afterwards.
    pub fn shutdown(&self) -> Result<()> {
        self.core.printer.shutdown()
    }
}

pub struct Gate<'a> {
    logger: &'a Logger,
    enabled: bool,
}

impl Gate<'_> {
    pub fn log(&self, level: Level) -> Recorder {
        if self.enabled {
            self.logger.log(level)
        } else {
            Recorder::inert()
        }
    }

    pub fn trace(&self) -> Recorder {
        self.log(Level::Trace)
    }

    pub fn debug(&self) -> Recorder {
        self.log(Level::Debug)
    }

    pub fn info(&self) -> Recorder {
        self.log(Level::Info)
    }

    pub fn warn(&self) -> Recorder {
        self.log(Level::Warn)
    }

    pub fn error(&self) -> Recorder {
        self.log(Level::Error)
    }

    pub fn fatal(&self) -> Recorder {
        self.log(Level::Fatal)
    }
}

/// Fluent logger configuration.
///
/// ```
/// use kvlog::{flags, Level, LoggerBuilder};
///
/// let logger = LoggerBuilder::new()
///     .level(Level::Debug)
///     .flags(flags::DATETIME | flags::SHORT_FILE)
///     .prefix("gateway")
///     .build()
///     .unwrap();
/// logger.debug().int("attempt", 1).print("connecting");
/// ```
pub struct LoggerBuilder {
    level: Level,
    flags: u32,
    prefix: String,
    sync: bool,
    writers: Vec<Box<dyn Writer>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        LoggerBuilder {
            level: Level::Info,
            flags: flags::DEFAULT,
            prefix: String::new(),
            sync: false,
            writers: Vec::new(),
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Write records on the caller's thread instead of the background
    /// consumer. Async is the default.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Adds a sink. May be called repeatedly; multiple sinks fan out
    /// through a [`MultiWriter`].
    pub fn writer(mut self, writer: impl Writer + 'static) -> Self {
        self.writers.push(Box::new(writer));
        self
    }

    /// Builds the logger and, in async mode, starts the consumer thread.
    /// With no writers the logger is valid but inert.
    pub fn build(self) -> Result<Logger> {
        let mut writers = self.writers;
        let printer: Arc<dyn Print> = match writers.pop() {
            None => Arc::new(NopPrinter),
            Some(last) => {
                let writer: Box<dyn Writer> = if writers.is_empty() {
                    last
                } else {
                    writers.push(last);
                    Box::new(MultiWriter::new(writers))
                };
                let printer = Printer::new(writer, !self.sync);
                if !self.sync {
                    printer.start()?;
                }
                Arc::new(printer)
            }
        };
        Ok(Logger {
            core: Arc::new(LoggerCore {
                printer,
                level: RwLock::new(self.level),
                flags: RwLock::new(self.flags),
            }),
            prefix: Arc::from(self.prefix.as_str()),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
