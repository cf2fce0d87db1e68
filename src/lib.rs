//! # kvlog
//!
//! A low-allocation structured logging library: leveled records, a compact
//! key-value line format, pooled buffers and an asynchronous write
//! pipeline behind a pluggable sink boundary.
//!
//! ## Features
//!
//! - **Low allocation**: entry and encoder pooling keeps the hot path off
//!   the heap
//! - **Structured**: typed key-value fields rendered into one compact line
//! - **Asynchronous**: a single consumer thread drains a FIFO queue;
//!   producers only touch short critical sections
//! - **Pluggable sinks**: console, file, fan-out, or anything implementing
//!   [`Writer`]
//!
//! ## Example
//!
//! ```
//! use kvlog::{Level, LoggerBuilder};
//!
//! let logger = LoggerBuilder::new()
//!     .level(Level::Debug)
//!     .build()
//!     .unwrap();
//!
//! logger
//!     .info()
//!     .string("peer", "10.0.0.7:9000")
//!     .int("attempt", 3)
//!     .duration("elapsed", std::time::Duration::from_millis(1200))
//!     .print("connection established");
//!
//! logger.shutdown().unwrap();
//! ```

pub mod core;
pub mod global;
pub mod writers;

pub mod prelude {
    pub use crate::core::{
        flags, Caller, Gate, Level, Logger, LoggerBuilder, LoggerError, Recorder, Result, Value,
    };
    pub use crate::writers::{ConsoleWriter, FileWriter, MultiWriter, Writer};
}

pub use crate::core::{
    flags, Caller, Gate, Level, Logger, LoggerBuilder, LoggerError, Recorder, Result, Value,
};
pub use crate::writers::{ConsoleWriter, FileWriter, MultiWriter, Writer};
