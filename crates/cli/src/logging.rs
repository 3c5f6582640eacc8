// Minimal stderr sink for the `log` facade.

use log::{Level, LevelFilter, Log, Metadata, Record};

pub const LOG_ENV: &str = "MISCHECK_LOG";

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("{level}: {}", record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Level from `-v` count, overridden upward by `MISCHECK_LOG`.
pub fn level_for(verbose: u8, env: Option<&str>) -> LevelFilter {
    let from_flag = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let from_env = env.and_then(|v| v.trim().parse::<LevelFilter>().ok());
    match from_env {
        Some(level) => level.max(from_flag),
        None => from_flag,
    }
}

pub fn init(verbose: u8) {
    let env = std::env::var(LOG_ENV).ok();
    // A second init (tests) keeps the first logger.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_for(verbose, env.as_deref()));
    }
}
