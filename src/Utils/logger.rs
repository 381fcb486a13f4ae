//! Logger set up once at program start: colored terminal output, plus a timestamped
//! log file when asked for.
use crate::Utils::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::Local;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;

/// `log_<YYYY-mm-dd_HH-MM-SS>.txt`
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Installs the global logger. A second call leaves the first logger in place.
pub fn init_logger(settings: &LoggingConfig) -> Result<()> {
    let level = settings.level_filter()?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if settings.to_file {
        let name = log_file_name();
        let file = File::create(&name).with_context(|| format!("creating log file {}", name))?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    if CombinedLogger::init(loggers).is_err() {
        log::debug!("logger already initialised");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".txt"));
        // log_YYYY-mm-dd_HH-MM-SS.txt
        assert_eq!(name.len(), "log_2024-01-01_00-00-00.txt".len());
    }

    #[test]
    fn test_init_twice() {
        let settings = LoggingConfig {
            level: "warn".to_string(),
            to_file: false,
        };
        assert!(init_logger(&settings).is_ok());
        assert!(init_logger(&settings).is_ok());
        let bad = LoggingConfig {
            level: "chatty".to_string(),
            to_file: false,
        };
        assert!(init_logger(&bad).is_err());
    }
}
