// Sat Oct 17 2026 - Alex

use colored::*;
use log::{Level, LevelFilter};
use std::io::Write;

pub struct LoggingUtils;

impl LoggingUtils {
    /// Installs `env_logger` at `level`, without timestamps. `RUST_LOG`
    /// still refines individual modules.
    pub fn init_logger(level: LevelFilter) {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .format_timestamp(None)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} {}",
                    LoggingUtils::format_level(record.level()),
                    record.args()
                )
            })
            .try_init()
            .ok();
    }

    pub fn format_level(level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str() {
        assert_eq!(LoggingUtils::level_from_str("DEBUG"), LevelFilter::Debug);
        assert_eq!(LoggingUtils::level_from_str("warning"), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_str("bogus"), LevelFilter::Info);
    }

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(LoggingUtils::level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(LoggingUtils::level_from_verbosity(9), LevelFilter::Trace);
    }
}
