//! Log level names and subscriber setup
//!
//! The library itself only emits `tracing` events. Binaries call
//! [`init_logging`] (feature `cli`) to print them to stderr.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SkyWalletError;

/// Log levels accepted on the command line, using the node's names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Panic => "panic",
        }
    }

    /// `tracing` filter directive; fatal and panic collapse onto error
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = SkyWalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" | "notice" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Fatal),
            "panic" => Ok(LogLevel::Panic),
            other => Err(SkyWalletError::invalid_argument(format!(
                "unknown log level: {:?}",
                other
            ))),
        }
    }
}

/// Install a stderr fmt subscriber at `level`; `RUST_LOG` takes precedence
///
/// Safe to call more than once: later calls leave the first subscriber in place.
#[cfg(feature = "cli")]
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("NOTICE".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert_eq!("panic".parse::<LogLevel>().unwrap(), LogLevel::Panic);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_directive() {
        assert_eq!(LogLevel::Fatal.directive(), "error");
        assert_eq!(LogLevel::default().directive(), "info");
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_init_twice() {
        init_logging(LogLevel::Debug);
        init_logging(LogLevel::Error);
    }
}
