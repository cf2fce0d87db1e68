//! Console sink

use std::io::{self, Write as _};

use crate::core::{Level, Result};
use crate::writers::Writer;

#[cfg(feature = "console")]
use colored::Colorize;

/// Writes records to the terminal, routing `Warn` and above to stderr and
/// the rest to stdout. With the `console` feature the header span is
/// colored by severity.
pub struct ConsoleWriter {
    #[cfg_attr(not(feature = "console"), allow(dead_code))]
    use_colors: bool,
}

impl ConsoleWriter {
    pub fn new() -> Self {
        ConsoleWriter { use_colors: true }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        ConsoleWriter { use_colors }
    }

    #[cfg_attr(not(feature = "console"), allow(unused_variables))]
    fn emit(
        &self,
        out: &mut impl io::Write,
        level: Level,
        data: &[u8],
        header_len: usize,
    ) -> io::Result<()> {
        #[cfg(feature = "console")]
        if self.use_colors && header_len > 0 && header_len <= data.len() {
            if let Ok(header) = std::str::from_utf8(&data[..header_len]) {
                let colored_header = match level {
                    Level::Trace => header.dimmed(),
                    Level::Debug => header.cyan(),
                    Level::Info => header.green(),
                    Level::Warn => header.yellow(),
                    Level::Error => header.red(),
                    Level::Fatal => header.red().bold(),
                };
                write!(out, "{}", colored_header)?;
                return out.write_all(&data[header_len..]);
            }
        }
        out.write_all(data)
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for ConsoleWriter {
    fn write(&mut self, level: Level, data: &[u8], header_len: usize) -> Result<()> {
        if level >= Level::Warn {
            let stderr = io::stderr();
            self.emit(&mut stderr.lock(), level, data, header_len)?;
        } else {
            let stdout = io::stdout();
            self.emit(&mut stdout.lock(), level, data, header_len)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        io::stdout().flush()?;
        io::stderr().flush()?;
        Ok(())
    }
}
