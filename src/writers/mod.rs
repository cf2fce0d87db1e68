//! Output sinks
//!
//! Everything past the pipeline goes through the [`Writer`] trait: one
//! formatted record per call, header length included so sinks can treat
//! the header span specially. Rotation, compression and transport concerns
//! belong behind this boundary, not in the pipeline.

mod console;
mod file;

pub use console::ConsoleWriter;
pub use file::FileWriter;

use crate::core::{Level, Result};

pub trait Writer: Send {
    /// Writes one record. `data` is the complete line including the
    /// trailing newline; `data[..header_len]` is the header.
    fn write(&mut self, level: Level, data: &[u8], header_len: usize) -> Result<()>;

    /// Flushes and releases the sink. Called once, at shutdown.
    fn close(&mut self) -> Result<()>;
}

/// Fans every record out to several sinks. All sinks see every record;
/// when several fail, the last error wins.
pub struct MultiWriter {
    writers: Vec<Box<dyn Writer>>,
}

impl MultiWriter {
    pub fn new(writers: Vec<Box<dyn Writer>>) -> Self {
        MultiWriter { writers }
    }

    pub fn push(&mut self, writer: impl Writer + 'static) {
        self.writers.push(Box::new(writer));
    }
}

impl Writer for MultiWriter {
    fn write(&mut self, level: Level, data: &[u8], header_len: usize) -> Result<()> {
        let mut last_err = Ok(());
        for w in &mut self.writers {
            if let Err(err) = w.write(level, data, header_len) {
                last_err = Err(err);
            }
        }
        last_err
    }

    fn close(&mut self) -> Result<()> {
        let mut last_err = Ok(());
        for w in &mut self.writers {
            if let Err(err) = w.close() {
                last_err = Err(err);
            }
        }
        last_err
    }
}
