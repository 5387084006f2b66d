//! `log` backend that writes every record to COM1.

use log::{Level, LevelFilter, Metadata, Record};

use crate::config::LOG_LEVEL;
use crate::serial_println;

pub struct SerialLogger {
    level: LevelFilter,
}

impl SerialLogger {
    pub const fn new(level: LevelFilter) -> Self {
        SerialLogger { level }
    }
}

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match record.level() {
            Level::Error | Level::Warn => serial_println!(
                "[{:5}] {}:{}: {}",
                record.level(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            ),
            level => serial_println!("[{:5}] {}: {}", level, record.target(), record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger::new(LOG_LEVEL);

/// Installs the serial logger. Later calls leave the first one in place.
pub fn init() {
    crate::serial::init();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LOG_LEVEL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn filters_below_the_configured_level() {
        let logger = SerialLogger::new(LevelFilter::Info);
        let metadata = |level: Level| Metadata::builder().level(level).target("lumen").build();

        assert!(logger.enabled(&metadata(Level::Error)));
        assert!(logger.enabled(&metadata(Level::Info)));
        assert!(!logger.enabled(&metadata(Level::Debug)));
        assert!(!logger.enabled(&metadata(Level::Trace)));
    }

    #[test]
    fn print_macros_are_expressions() {
        // only type checked, never called: the port is not there on the host
        let _arm = |level: Level| match level {
            Level::Error => crate::serial_println!("{}", level),
            _ => crate::serial_print!("{}", level),
        };
    }
}
