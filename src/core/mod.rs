//! Core pipeline types

pub(crate) mod encoder;
pub(crate) mod entry;
pub mod error;
pub mod level;
pub mod logger;
pub mod printer;
pub mod recorder;
pub mod value;

pub use error::{LoggerError, Result};
pub use level::Level;
pub use logger::{Gate, Logger, LoggerBuilder};
pub use printer::{flags, Caller};
pub use recorder::Recorder;
pub use value::Value;
