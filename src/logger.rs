//! Console logger for the hosted port.
//!
//! Every record becomes one line on stdout, prefixed with the uptime in
//! milliseconds and the level:
//!
//! ```text
//! [         1003 INFO] Dual-core spinlock demo
//! [         1004 WARN] src/arch/hosted.rs:93: failed to pin thread to core 1, ...
//! ```

use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub static CONSOLE: Console = Console::new();

pub struct Console {
    lock: Mutex<()>,
    start: OnceLock<Instant>,
}

impl Console {
    const fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            start: OnceLock::new(),
        }
    }

    fn uptime_ms(&self) -> u128 {
        self.start.get_or_init(Instant::now).elapsed().as_millis()
    }
}

impl Log for Console {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = format_msg(self.uptime_ms(), record);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        puts(&msg);
    }

    fn flush(&self) {}
}

/// Format a logging message.
pub fn format_msg(uptime_ms: u128, record: &Record) -> String {
    let head = format!("[{:>13} {}] ", uptime_ms, record.level().as_str());

    match record.level() {
        Level::Info => format!("{head}{}\n", record.args()),
        _ => {
            if let (Some(file), Some(line)) = (record.file(), record.line()) {
                format!("{head}{file}:{line}: {}\n", record.args())
            } else {
                format!("{head}{}\n", record.args())
            }
        }
    }
}

fn puts(msg: &str) {
    let mut buf = msg.as_bytes();
    while !buf.is_empty() {
        let written = unsafe { libc::write(libc::STDOUT_FILENO, buf.as_ptr().cast(), buf.len()) };
        if written <= 0 {
            break;
        }
        buf = &buf[written as usize..];
    }
}

/// Install the console as the global logger. Later calls only change the
/// level.
pub fn init(level: LevelFilter) {
    CONSOLE.start.get_or_init(Instant::now);
    let _ = log::set_logger(&CONSOLE);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_lines_carry_no_location() {
        let msg = format_msg(
            1003,
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("Dual-core spinlock demo"))
                .file(Some("src/kernel.rs"))
                .line(Some(10))
                .build(),
        );
        assert_eq!(msg, "[         1003 INFO] Dual-core spinlock demo\n");
    }

    #[test]
    fn other_levels_carry_location() {
        let msg = format_msg(
            7,
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("pin refused"))
                .file(Some("src/arch/hosted.rs"))
                .line(Some(93))
                .build(),
        );
        assert_eq!(msg, "[            7 WARN] src/arch/hosted.rs:93: pin refused\n");
    }

    #[test]
    fn missing_location_falls_back_to_plain_line() {
        let msg = format_msg(0, &Record::builder().level(Level::Debug).args(format_args!("x")).build());
        assert_eq!(msg, "[            0 DEBUG] x\n");
    }
}
