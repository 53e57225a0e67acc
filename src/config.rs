//! Build-time payload configuration
//!
//! The payload has no configuration storage of its own; everything here is
//! fixed when the image is built. The defaults match the layout coreboot
//! uses when it loads a UEFI payload.

use crate::drivers::serial::COM1;
use log::LevelFilter;

/// 1 MiB
const MIB: u64 = 0x10_0000;

/// Payload layout and console settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadConfig {
    /// Where the payload firmware volume is loaded
    pub payload_fd_base: u64,
    pub payload_fd_size: u64,
    /// Size of the memory window holding the HOB list
    pub hob_window_size: u64,
    /// I/O APIC MMIO window published as a device region
    pub ioapic_base: u64,
    pub ioapic_size: u64,
    /// COM port used when coreboot does not describe a serial console
    pub fallback_serial_port: u16,
    pub fallback_baud: u32,
    pub log_level: LevelFilter,
}

impl PayloadConfig {
    pub const DEFAULT: PayloadConfig = PayloadConfig {
        payload_fd_base: 0x80_0000,
        payload_fd_size: 0x50_0000,
        hob_window_size: 0x400_0000,
        ioapic_base: 0xfec8_0000,
        ioapic_size: 0x8_0000,
        fallback_serial_port: COM1,
        fallback_baud: 115200,
        log_level: if cfg!(feature = "verbose-log") {
            LevelFilter::Trace
        } else {
            LevelFilter::Debug
        },
    };

    /// Start of the HOB window: the first 1 MiB boundary past the payload
    pub const fn hob_base(&self) -> u64 {
        (self.payload_fd_base + self.payload_fd_size + MIB - 1) & !(MIB - 1)
    }

    /// End (exclusive) of the HOB window
    pub const fn hob_top(&self) -> u64 {
        self.hob_base() + self.hob_window_size
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hob_window() {
        let config = PayloadConfig::DEFAULT;
        assert_eq!(config.hob_base(), 0xd0_0000);
        assert_eq!(config.hob_top(), 0x4d0_0000);

        let unaligned = PayloadConfig {
            payload_fd_size: 0x48_1000,
            ..config
        };
        assert_eq!(unaligned.hob_base(), 0xd0_0000);
    }
}
