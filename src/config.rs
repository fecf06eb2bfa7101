//! Runtime configuration.
//!
//! Built by the `ctdash` binary from its command line, validated once at
//! startup.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client;

/// Default ctcache server address (its default port is 5000).
pub const DEFAULT_SERVER: &str = "http://localhost:5000";

/// Longest accepted tick period, in seconds.
pub const MAX_TICK_SECS: u64 = 3600;

/// Errors in the startup configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Unusable server URL.
    Server(String),
    /// Tick period outside `1..=MAX_TICK_SECS` seconds.
    Tick(u64),
    /// `--focused` only applies to headless mode.
    FocusedRequiresHeadless,
    /// Log file could not be opened.
    LogFile(PathBuf, io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Server(msg) => write!(f, "invalid server: {}", msg),
            ConfigError::Tick(secs) => write!(
                f,
                "tick period must be between 1 and {} seconds, got {}",
                MAX_TICK_SECS, secs
            ),
            ConfigError::FocusedRequiresHeadless => {
                write!(f, "--focused can only be used with --headless")
            }
            ConfigError::LogFile(path, e) => {
                write!(f, "cannot open log file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// How focus signals are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontend {
    /// Terminal UI; focus follows the terminal window.
    Tui,
    /// No UI; focus is fixed for the whole run.
    Headless { focused: bool },
}

/// Log verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `-q` wins over `-v`; otherwise each `-v` raises the level by one.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub tick: Duration,
    pub frontend: Frontend,
    pub log_file: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Config {
    pub fn new(
        server: &str,
        tick_secs: u64,
        headless: bool,
        focused: bool,
        log_file: Option<PathBuf>,
        log_level: LogLevel,
    ) -> Result<Self, ConfigError> {
        if !(1..=MAX_TICK_SECS).contains(&tick_secs) {
            return Err(ConfigError::Tick(tick_secs));
        }
        if focused && !headless {
            return Err(ConfigError::FocusedRequiresHeadless);
        }
        client::base_url(server).map_err(|e| ConfigError::Server(e.to_string()))?;

        let frontend = if headless {
            Frontend::Headless { focused }
        } else {
            Frontend::Tui
        };

        Ok(Self {
            server: server.to_string(),
            tick: Duration::from_secs(tick_secs),
            frontend,
            log_file,
            log_level,
        })
    }

    /// Opens the log file for appending, if one is configured.
    pub fn open_log_file(&self) -> Result<Option<File>, ConfigError> {
        self.log_file.as_deref().map(open_append).transpose()
    }
}

fn open_append(path: &Path) -> Result<File, ConfigError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ConfigError::LogFile(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(
        server: &str,
        tick: u64,
        headless: bool,
        focused: bool,
    ) -> Result<Config, ConfigError> {
        Config::new(server, tick, headless, focused, None, LogLevel::Info)
    }

    #[test]
    fn test_defaults() {
        let cfg = config(DEFAULT_SERVER, 6, false, false).unwrap();
        assert_eq!(cfg.tick, Duration::from_secs(6));
        assert_eq!(cfg.frontend, Frontend::Tui);
        assert!(cfg.open_log_file().unwrap().is_none());
    }

    #[test]
    fn test_headless_focus_policy() {
        let cfg = config(DEFAULT_SERVER, 6, true, true).unwrap();
        assert_eq!(cfg.frontend, Frontend::Headless { focused: true });
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            config(DEFAULT_SERVER, 0, false, false),
            Err(ConfigError::Tick(0))
        ));
        assert!(matches!(
            config("localhost:5000 x", 6, false, false),
            Err(ConfigError::Server(_))
        ));
        assert!(matches!(
            config(DEFAULT_SERVER, 6, false, true),
            Err(ConfigError::FocusedRequiresHeadless)
        ));
    }

    #[test]
    fn test_tick_upper_bound() {
        let cfg = config(DEFAULT_SERVER, MAX_TICK_SECS, true, false).unwrap();
        assert_eq!(cfg.tick, Duration::from_secs(MAX_TICK_SECS));

        for secs in [MAX_TICK_SECS + 1, u64::MAX] {
            assert!(matches!(
                config(DEFAULT_SERVER, secs, true, false),
                Err(ConfigError::Tick(s)) if s == secs
            ));
        }
    }

    #[test]
    fn test_log_level_flags() {
        assert_eq!(LogLevel::from_flags(0, false), LogLevel::Info);
        assert_eq!(LogLevel::from_flags(1, false), LogLevel::Debug);
        assert_eq!(LogLevel::from_flags(3, false), LogLevel::Trace);
        assert_eq!(LogLevel::from_flags(2, true), LogLevel::Error);
    }

    #[test]
    fn test_log_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctdash.log");
        std::fs::write(&path, "first\n").unwrap();

        let cfg = Config::new(
            DEFAULT_SERVER,
            6,
            false,
            false,
            Some(path.clone()),
            LogLevel::Debug,
        )
        .unwrap();
        let mut file = cfg.open_log_file().unwrap().unwrap();
        writeln!(file, "second").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_log_file_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new(
            DEFAULT_SERVER,
            6,
            false,
            false,
            Some(dir.path().join("missing/ctdash.log")),
            LogLevel::Info,
        )
        .unwrap();
        assert!(matches!(
            cfg.open_log_file(),
            Err(ConfigError::LogFile(_, _))
        ));
    }
}
