use std::io::Write;
use std::time::Instant;

use log::{Level, Log, Metadata, Record};
use parking_lot::Mutex;

struct OsximgLogger {
    file: Option<Mutex<std::fs::File>>,
    filter: log::LevelFilter,
    start: Instant,
}

/// Format a record for the terminal, eg `[warn] message`
fn format_line(level: Level, message: &std::fmt::Arguments) -> String {
    format!("[{}] {message}", level.as_str().to_lowercase())
}

impl Log for OsximgLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        eprintln!("{}", format_line(record.level(), record.args()));

        if let Some(ref file) = self.file {
            let elapsed = self.start.elapsed().as_secs_f64();
            let _ = writeln!(
                file.lock(),
                "[{elapsed:.3}s] [{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Pick the level filter: `RUST_LOG` wins, otherwise `debug` when verbose and `warn` by default.
fn resolve_filter(env: Option<&str>, verbose: bool) -> log::LevelFilter {
    env.and_then(|s| s.parse().ok()).unwrap_or(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    })
}

/// Initialize the global logger. Must be called once before any logging.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init(verbose: bool, log_file: Option<std::fs::File>) {
    let filter = resolve_filter(std::env::var("RUST_LOG").ok().as_deref(), verbose);

    let logger = OsximgLogger {
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger)).expect("logger already initialized");
    log::set_max_level(filter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_resolve_filter() {
        assert_eq!(resolve_filter(None, false), LevelFilter::Warn);
        assert_eq!(resolve_filter(None, true), LevelFilter::Debug);
        assert_eq!(resolve_filter(Some("trace"), false), LevelFilter::Trace);
        assert_eq!(resolve_filter(Some("garbage"), false), LevelFilter::Warn);
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line(Level::Warn, &format_args!("disk {} is busy", "disk4")),
            "[warn] disk disk4 is busy"
        );
    }
}
