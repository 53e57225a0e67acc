//! 16550 UART serial console
//!
//! Output only. The port comes from the coreboot serial record; without one
//! the legacy COM1 address is probed instead.

use crate::arch::x86_64::io::{inb, outb};
use core::fmt::{self, Write};
use spin::Mutex;

/// Standard COM1 port address
pub const COM1: u16 = 0x3F8;

/// Serial port register offsets
mod registers {
    pub const DATA: u16 = 0; // Data register (read/write)
    pub const IER: u16 = 1; // Interrupt Enable Register
    pub const FCR: u16 = 2; // FIFO Control Register
    pub const LCR: u16 = 3; // Line Control Register
    pub const MCR: u16 = 4; // Modem Control Register
    pub const LSR: u16 = 5; // Line Status Register
    pub const SCRATCH: u16 = 7;
    pub const DLL: u16 = 0; // Divisor Latch Low (when DLAB=1)
    pub const DLH: u16 = 1; // Divisor Latch High (when DLAB=1)
}

/// Line Status Register: transmit holding register empty
const LSR_TX_EMPTY: u8 = 1 << 5;

/// Line Control Register bits
mod lcr {
    pub const WORD_LENGTH_8: u8 = 0x03;
    pub const DLAB: u8 = 0x80;
}

/// Clock of the 16550 baud generator divided by 16
const BASE_BAUD: u32 = 115200;

/// Global serial port instance
static SERIAL: Mutex<Option<SerialPort>> = Mutex::new(None);

/// Maximum iterations to wait for TX ready (prevents infinite loop on missing hardware)
const TX_TIMEOUT_ITERATIONS: u32 = 100_000;

/// A 16550 UART serial port
pub struct SerialPort {
    base: u16,
    functional: bool,
}

impl SerialPort {
    /// Create a serial port at the given base address
    ///
    /// # Safety
    ///
    /// The base address must be a valid I/O port for a 16550 UART.
    pub const unsafe fn new(base: u16) -> Self {
        SerialPort {
            base,
            functional: false,
        }
    }

    /// Scratch register test: a UART reads back what was written
    fn detect(&self) -> bool {
        unsafe {
            self.write_reg(registers::SCRATCH, 0x55);
            if self.read_reg(registers::SCRATCH) != 0x55 {
                return false;
            }
            self.write_reg(registers::SCRATCH, 0xAA);
            if self.read_reg(registers::SCRATCH) != 0xAA {
                return false;
            }
            // Unpopulated ports float high
            self.read_reg(registers::LSR) != 0xFF
        }
    }

    /// Program 8N1 at `baud`
    ///
    /// Returns false if no UART answers at the port.
    pub fn init(&mut self, baud: u32) -> bool {
        if !self.detect() {
            self.functional = false;
            return false;
        }

        let divisor = BASE_BAUD / baud.clamp(1, BASE_BAUD);

        unsafe {
            self.write_reg(registers::IER, 0x00);
            self.write_reg(registers::LCR, lcr::DLAB);
            self.write_reg(registers::DLL, (divisor & 0xFF) as u8);
            self.write_reg(registers::DLH, ((divisor >> 8) & 0xFF) as u8);
            self.write_reg(registers::LCR, lcr::WORD_LENGTH_8);
            // Enable and clear FIFOs, 14-byte threshold
            self.write_reg(registers::FCR, 0xC7);
            // DTR, RTS, OUT2
            self.write_reg(registers::MCR, 0x0B);
        }

        self.functional = true;
        true
    }

    pub fn write_byte(&mut self, byte: u8) {
        if !self.functional {
            return;
        }

        unsafe {
            let mut timeout = TX_TIMEOUT_ITERATIONS;
            while (self.read_reg(registers::LSR) & LSR_TX_EMPTY) == 0 {
                timeout -= 1;
                if timeout == 0 {
                    // Stop talking to a UART that never drains
                    self.functional = false;
                    return;
                }
                core::hint::spin_loop();
            }

            self.write_reg(registers::DATA, byte);
        }
    }

    unsafe fn read_reg(&self, offset: u16) -> u8 {
        inb(self.base + offset)
    }

    unsafe fn write_reg(&self, offset: u16, value: u8) {
        outb(self.base + offset, value);
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Bring up the global console on `port`
///
/// Returns false (and leaves output disabled) if no UART is found; all
/// console output is then dropped.
pub fn init(port: u16, baud: u32) -> bool {
    let mut serial = unsafe { SerialPort::new(port) };

    if !serial.init(baud) {
        return false;
    }
    let _ = serial.write_str("\r\n[crab-payload] serial console ready\r\n");
    *SERIAL.lock() = Some(serial);
    true
}

/// Write formatted output to the serial port
pub fn write_fmt(args: fmt::Arguments) {
    if let Some(ref mut serial) = *SERIAL.lock() {
        let _ = serial.write_fmt(args);
    }
}

/// Macro for printing to serial
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::drivers::serial::write_fmt(format_args!($($arg)*))
    };
}

/// Macro for printing to serial with newline
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
