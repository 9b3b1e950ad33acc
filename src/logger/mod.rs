use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Colourised stderr logger; stdout is left to reports.
pub struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let (color_code, reset_code) = get_color_codes(record.level());
            eprintln!(
                "{}{} - {:<5} - {}{}",
                color_code,
                format_time_of_day(SystemTime::now()),
                record.level(),
                record.args(),
                reset_code
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

/// `-v` count to level: warnings by default, then info, debug, trace.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// UTC `HH:MM:SS.mmm`.
fn format_time_of_day(now: SystemTime) -> String {
    let duration = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs % 86400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        duration.subsec_millis()
    )
}

fn get_color_codes(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Error => ("\x1b[31m", "\x1b[0m"), // Red
        Level::Warn => ("\x1b[33m", "\x1b[0m"),  // Yellow
        Level::Info => ("\x1b[32m", "\x1b[0m"),  // Green
        Level::Debug => ("\x1b[36m", "\x1b[0m"), // Cyan
        Level::Trace => ("\x1b[35m", "\x1b[0m"), // Magenta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_for_verbosity(1), LevelFilter::Info);
        assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_for_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn test_format_time_of_day() {
        let t = UNIX_EPOCH + Duration::from_millis(((13 * 60 + 5) * 60 + 9) * 1000 + 42);
        assert_eq!(format_time_of_day(t), "13:05:09.042");
    }
}
