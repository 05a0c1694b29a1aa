//! Boot Logging
//!
//! `log` backend for bring-up. Each record is formatted into a fixed stack
//! buffer and written to the early console in one `puts`, so lines from
//! different cores do not interleave mid-line.
//!
//! ```text
//! [core 1]  INFO tern_kernel::boot: releasing 3 secondary cores
//! ```
//!
//! The `[core N]` prefix needs a way to ask which core is running; the
//! board entry provides one with [`set_core_reader`]. Without it the
//! prefix is left out.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Once;
use tern_common::CoreId;
use tern_pal::console;

/// Longest line written; anything beyond is cut off.
pub const LINE_SIZE: usize = 256;

/// Stack buffer a single log line is formatted into.
struct MessageBuffer {
    data: [u8; LINE_SIZE],
    len: usize,
}

impl MessageBuffer {
    const fn new() -> Self {
        Self {
            data: [0u8; LINE_SIZE],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        // Truncation can split a code point; keep the valid prefix
        match core::str::from_utf8(&self.data[..self.len]) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&self.data[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl Write for MessageBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = LINE_SIZE - self.len;
        let to_copy = bytes.len().min(remaining);
        self.data[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

const fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => " WARN",
        Level::Info => " INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Format one line, newline included. The newline survives truncation.
fn format_line(
    buf: &mut MessageBuffer,
    core: Option<CoreId>,
    level: Level,
    target: &str,
    args: fmt::Arguments<'_>,
) {
    if let Some(core) = core {
        let _ = write!(buf, "[core {}] ", core);
    }
    let _ = write!(buf, "{} {}: {}", level_str(level), target, args);
    if buf.len == LINE_SIZE {
        buf.len -= 1;
    }
    let _ = buf.write_str("\n");
}

static CORE_READER: Once<fn() -> CoreId> = Once::new();

/// Let the logger tag lines with the running core. First call wins.
pub fn set_core_reader(reader: fn() -> CoreId) {
    CORE_READER.call_once(|| reader);
}

struct BootLogger;

impl Log for BootLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let core = CORE_READER.get().map(|read| read());
        let mut line = MessageBuffer::new();
        format_line(&mut line, core, record.level(), record.target(), *record.args());
        console::puts(line.as_str());
    }

    fn flush(&self) {}
}

static LOGGER: BootLogger = BootLogger;

/// Install the boot logger. Later calls, or a logger installed by someone
/// else, leave things as they are.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(core: Option<CoreId>, level: Level, msg: &str) -> String {
        let mut buf = MessageBuffer::new();
        format_line(&mut buf, core, level, "tern_kernel::boot", format_args!("{}", msg));
        buf.as_str().to_owned()
    }

    #[test]
    fn test_line_format() {
        assert_eq!(
            line(Some(CoreId::new(2)), Level::Info, "released"),
            "[core 2]  INFO tern_kernel::boot: released\n"
        );
        assert_eq!(
            line(None, Level::Error, "boot failed"),
            "ERROR tern_kernel::boot: boot failed\n"
        );
    }

    #[test]
    fn test_long_line_truncated_with_newline() {
        let long = "x".repeat(LINE_SIZE * 2);
        let out = line(Some(CoreId::PRIMARY), Level::Debug, &long);
        assert_eq!(out.len(), LINE_SIZE);
        assert!(out.ends_with("x\n"));
    }

    #[test]
    fn test_truncation_keeps_utf8_valid() {
        let mut buf = MessageBuffer::new();
        let _ = buf.write_str(&"a".repeat(LINE_SIZE - 1));
        let _ = buf.write_str("é");
        assert_eq!(buf.as_str().len(), LINE_SIZE - 1);
    }

    #[test]
    fn test_double_init_ignored() {
        init(LevelFilter::Debug);
        init(LevelFilter::Off);
        assert!(log::max_level() >= LevelFilter::Debug);
        log::info!("logged to a discarding console");
    }
}
