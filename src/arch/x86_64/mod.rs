//! x86_64 architecture support
//!
//! Port I/O, the handful of CPUID queries the payload needs, and halting.

pub mod io;

/// Physical address width assumed when CPUID cannot report it
pub const DEFAULT_PHYSICAL_ADDRESS_BITS: u8 = 36;

/// Number of physical address bits supported by the CPU
///
/// Uses CPUID leaf 0x80000008 when the extended leaf range reaches it.
pub fn physical_address_bits() -> u8 {
    use core::arch::x86_64::__cpuid;

    #[allow(unused_unsafe)]
    let max_extended = unsafe { __cpuid(0x8000_0000) }.eax;
    if max_extended >= 0x8000_0008 {
        #[allow(unused_unsafe)]
        let leaf = unsafe { __cpuid(0x8000_0008) };
        (leaf.eax & 0xff) as u8
    } else {
        DEFAULT_PHYSICAL_ADDRESS_BITS
    }
}

/// Mask all legacy 8259 PIC interrupt sources
///
/// # Safety
///
/// Writes the PIC mask registers; must not race with interrupt setup.
pub unsafe fn mask_legacy_pic() {
    io::outb(0x21, 0xff);
    io::outb(0xa1, 0xff);
}

/// Halt the CPU forever
pub fn halt_loop() -> ! {
    loop {
        unsafe {
            core::arch::asm!("hlt");
        }
    }
}
