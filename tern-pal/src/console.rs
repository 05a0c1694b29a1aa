//! Early console
//!
//! Byte output for boot diagnostics before any driver is running: a PL011
//! UART on AArch64 boards, the SBI legacy console on RV64, or nothing.

use core::fmt::{self, Write};

use spin::mutex::SpinMutex;

/// PL011 register offsets and flags.
mod pl011 {
    /// Data register
    pub const DR: u64 = 0x00;
    /// Flag register
    pub const FR: u64 = 0x18;
    /// Transmit FIFO full
    pub const FR_TXFF: u32 = 1 << 5;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sink {
    None,
    Pl011 { base: u64 },
    #[cfg(target_arch = "riscv64")]
    Sbi,
}

struct Console {
    sink: Sink,
}

impl Console {
    const fn new() -> Self {
        Self { sink: Sink::None }
    }

    fn putc(&self, c: u8) {
        match self.sink {
            Sink::None => {}
            Sink::Pl011 { base } => {
                // SAFETY: init_pl011's caller guarantees base maps a PL011
                unsafe {
                    let fr_ptr = (base + pl011::FR) as *const u32;
                    while core::ptr::read_volatile(fr_ptr) & pl011::FR_TXFF != 0 {
                        core::hint::spin_loop();
                    }
                    let dr_ptr = (base + pl011::DR) as *mut u32;
                    core::ptr::write_volatile(dr_ptr, u32::from(c));
                }
            }
            #[cfg(target_arch = "riscv64")]
            Sink::Sbi => tern_arch::riscv64::sbi_putchar(c),
        }
    }

    fn puts(&self, s: &str) {
        for c in s.bytes() {
            if c == b'\n' {
                self.putc(b'\r');
            }
            self.putc(c);
        }
    }
}

/// Global console instance
static CONSOLE: SpinMutex<Console> = SpinMutex::new(Console::new());

/// Route the console to a PL011 UART.
///
/// # Safety
///
/// `base` must be the mapped address of a PL011 that nothing else drives.
pub unsafe fn init_pl011(base: u64) {
    CONSOLE.lock().sink = if base == 0 {
        Sink::None
    } else {
        Sink::Pl011 { base }
    };
}

/// Route the console to the SBI legacy console.
#[cfg(target_arch = "riscv64")]
pub fn init_sbi() {
    CONSOLE.lock().sink = Sink::Sbi;
}

/// Whether output currently goes anywhere.
pub fn is_enabled() -> bool {
    CONSOLE.lock().sink != Sink::None
}

/// Print a string to the console
pub fn puts(s: &str) {
    let console = CONSOLE.lock();
    console.puts(s);
}

/// Print a character to the console
pub fn putc(c: u8) {
    let console = CONSOLE.lock();
    console.putc(c);
}

/// Console writer for fmt::Write
pub struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        puts(s);
        Ok(())
    }
}

/// Print formatted output to the console
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::ConsoleWriter, $($arg)*);
    }};
}

/// Print formatted output with newline to the console
#[macro_export]
macro_rules! println {
    () => {
        $crate::console::puts("\n")
    };
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::console::ConsoleWriter, $($arg)*);
        $crate::console::puts("\n");
    }};
}
