use chrono::{SecondsFormat, Utc};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::Config;


pub struct Logger {
    level: LevelFilter,
}

impl Logger {
    pub fn new(level: LevelFilter) -> Self {
        Logger { level }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} [{}] {} - {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                record.target(), record.level(), record.args());
        }
    }

    fn flush(&self) {}
}


/// Installs the global logger. Errors are also sent to Sentry when a DSN is configured;
/// keep the returned guard alive for the life of the process.
pub fn init(config: &Config) -> Result<Option<sentry::ClientInitGuard>, SetLoggerError> {
    let logger = Logger::new(config.log_level);

    let guard = match &config.sentry_dsn {
        Some(dsn) => {
            let guard = sentry::init((dsn.as_str(), sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            }));
            log::set_boxed_logger(Box::new(sentry_log::SentryLogger::with_dest(logger)))?;
            Some(guard)
        },
        None => {
            log::set_boxed_logger(Box::new(logger))?;
            None
        },
    };

    log::set_max_level(config.log_level);

    Ok(guard)
}
