use std::io::Write;

/// Dummy type to help us implement a logger using the `log` crate.
struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            // SGR foreground colors. White is actually kinda grey.
            let color = match record.level() {
                log::Level::Error => 31,
                log::Level::Warn => 33,
                log::Level::Info => 32,
                log::Level::Debug | log::Level::Trace => 37,
            };

            // Nowhere left to report a failed write to stderr.
            let _ = writeln!(
                std::io::stderr().lock(),
                "\x1B[{color}m[{}]\x1B[0m {}",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// `verbosity` is the number of `-v` flags: warnings only by default, then
/// info, debug and trace.
pub(crate) fn init(verbosity: u8) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    log::debug!("Logging initialized");
    Ok(())
}
