//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity tier, ascending: `Trace < Debug < Info < Warn < Error < Fatal`.
///
/// A record reaches the sink iff its level is at least the logger's
/// configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Single-letter tag used in the entry header.
    pub fn tag(&self) -> u8 {
        match self {
            Level::Trace => b'T',
            Level::Debug => b'D',
            Level::Info => b'I',
            Level::Warn => b'W',
            Level::Error => b'E',
            Level::Fatal => b'F',
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" | "T" => Ok(Level::Trace),
            "DEBUG" | "D" => Ok(Level::Debug),
            "INFO" | "I" => Ok(Level::Info),
            "WARN" | "WARNING" | "W" => Ok(Level::Warn),
            "ERROR" | "E" => Ok(Level::Error),
            "FATAL" | "F" => Ok(Level::Fatal),
            _ => Err(format!("invalid log level: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Level::Fatal > Level::Error);
        assert!(Level::Error > Level::Warn);
        assert!(Level::Warn > Level::Info);
        assert!(Level::Info > Level::Debug);
        assert!(Level::Debug > Level::Trace);
    }

    #[test]
    fn test_tags() {
        let tags: Vec<u8> = [
            Level::Fatal,
            Level::Error,
            Level::Warn,
            Level::Info,
            Level::Debug,
            Level::Trace,
        ]
        .iter()
        .map(Level::tag)
        .collect();
        assert_eq!(tags, b"FEWIDT");
    }

    #[test]
    fn test_parse() {
        assert_eq!("info".parse::<Level>(), Ok(Level::Info));
        assert_eq!("WARNING".parse::<Level>(), Ok(Level::Warn));
        assert_eq!("f".parse::<Level>(), Ok(Level::Fatal));
        assert!("verbose".parse::<Level>().is_err());
    }
}
