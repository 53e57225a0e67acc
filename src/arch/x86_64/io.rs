//! x86 port I/O
//!
//! Raw `in`/`out` wrappers plus the [`PortIo`] trait, which lets code that
//! only needs to read a few ACPI registers be exercised without hardware.

/// Read a byte from an I/O port
///
/// # Safety
///
/// Port I/O can have arbitrary side effects on the device behind the port.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    core::arch::asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    value
}

/// Read a word from an I/O port
///
/// # Safety
///
/// See [`inb`].
#[inline]
pub unsafe fn inw(port: u16) -> u16 {
    let value: u16;
    core::arch::asm!("in ax, dx", out("ax") value, in("dx") port, options(nomem, nostack, preserves_flags));
    value
}

/// Read a dword from an I/O port
///
/// # Safety
///
/// See [`inb`].
#[inline]
pub unsafe fn inl(port: u16) -> u32 {
    let value: u32;
    core::arch::asm!("in eax, dx", out("eax") value, in("dx") port, options(nomem, nostack, preserves_flags));
    value
}

/// Write a byte to an I/O port
///
/// # Safety
///
/// See [`inb`].
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
}

/// Port-mapped register reads
pub trait PortIo {
    fn read16(&self, port: u16) -> u16;
    fn read32(&self, port: u16) -> u32;
}

/// The machine's real I/O port space
pub struct HardwarePorts {
    _private: (),
}

impl HardwarePorts {
    /// # Safety
    ///
    /// Only ports named by trusted firmware tables may be read through the
    /// returned handle.
    pub const unsafe fn new() -> Self {
        HardwarePorts { _private: () }
    }
}

impl PortIo for HardwarePorts {
    fn read16(&self, port: u16) -> u16 {
        unsafe { inw(port) }
    }

    fn read32(&self, port: u16) -> u32 {
        unsafe { inl(port) }
    }
}
