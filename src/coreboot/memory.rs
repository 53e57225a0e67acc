//! Memory map handling for coreboot
//!
//! This module defines the memory region types of the bootloader-supplied
//! memory map and the conversion from coreboot's `LB_MEM_*` tags.

/// 4 GiB, the boundary of the lower (32-bit addressable) memory space
pub const FOUR_GIB: u64 = 0x1_0000_0000;

/// Memory region types (E820 numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemoryType {
    /// Usable RAM
    Ram = 1,
    /// Reserved memory (reserved DRAM or MMIO, undecided)
    Reserved = 2,
    /// ACPI reclaimable memory
    Acpi = 3,
    /// ACPI NVS (Non-Volatile Storage)
    Nvs = 4,
    /// Unusable memory
    Unusable = 5,
    /// Disabled memory
    Disabled = 6,
    /// Persistent (non-volatile) memory
    PersistentMemory = 7,
}

impl MemoryType {
    /// Convert a coreboot `LB_MEM_*` tag
    ///
    /// `LB_MEM_TABLE` (16) holds the coreboot tables and CBMEM, which must
    /// survive into the OS, so it is reported as reserved. Unknown tags are
    /// treated the same way.
    pub fn from_coreboot(tag: u32) -> Self {
        match tag {
            1 => MemoryType::Ram,
            2 => MemoryType::Reserved,
            3 => MemoryType::Acpi,
            4 => MemoryType::Nvs,
            5 => MemoryType::Unusable,
            6 => MemoryType::Disabled,
            7 => MemoryType::PersistentMemory,
            16 => MemoryType::Reserved,
            _ => MemoryType::Reserved,
        }
    }

    /// Usable DRAM as far as the payload is concerned: RAM and the ACPI areas
    pub fn is_usable_dram(&self) -> bool {
        matches!(self, MemoryType::Ram | MemoryType::Acpi | MemoryType::Nvs)
    }

    /// Types that say nothing about DRAM topology
    pub fn is_ignored_for_topology(&self) -> bool {
        matches!(
            self,
            MemoryType::Unusable | MemoryType::Disabled | MemoryType::PersistentMemory
        )
    }
}

/// A memory map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Starting physical address
    pub start: u64,
    /// Size in bytes
    pub size: u64,
    /// Type of memory
    pub region_type: MemoryType,
}

impl MemoryRegion {
    pub const fn new(start: u64, size: u64, region_type: MemoryType) -> Self {
        MemoryRegion {
            start,
            size,
            region_type,
        }
    }

    /// Get the ending address (exclusive), saturating at `u64::MAX`
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    /// Check if the whole region lies below 4 GiB
    pub fn is_below_4g(&self) -> bool {
        self.end() <= FOUR_GIB
    }
}

/// Calculate total usable RAM
pub fn total_usable_ram(regions: &[MemoryRegion]) -> u64 {
    regions
        .iter()
        .filter(|r| r.region_type == MemoryType::Ram)
        .map(|r| r.size)
        .sum()
}
