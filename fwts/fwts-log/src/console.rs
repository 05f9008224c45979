use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

pub struct ConsoleLogger {
    max_level: LevelFilter,
}

impl ConsoleLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install as the global logger. Call this once, early in `main`.
    ///
    /// # Errors
    /// [`SetLoggerError`] if a logger has already been installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        // set_logger requires &'static dyn Log
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
