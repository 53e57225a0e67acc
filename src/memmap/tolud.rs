//! Top of lower usable DRAM estimation

use crate::coreboot::memory::{MemoryRegion, MemoryType};
use core::fmt;

/// Top of lower usable DRAM
///
/// Always at most 4 GiB. Stored as `u64` so that a board whose DRAM reaches
/// exactly 4 GiB is not truncated to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Tolud(u64);

impl Tolud {
    pub const fn new(address: u64) -> Self {
        Tolud(address)
    }

    pub const fn address(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tolud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Estimate TOLUD from the memory map
///
/// Entries are processed in map order. Usable DRAM raises TOLUD to its end;
/// any other entry below 4 GiB extends TOLUD only when it starts exactly at
/// the current TOLUD, since firmware carves tables and stolen memory out of
/// the top of DRAM. This assumes the map has no holes below TOLUD.
pub fn estimate_tolud(map: &[MemoryRegion]) -> Tolud {
    let mut tolud = 0u64;

    for region in map {
        if region.region_type.is_ignored_for_topology() {
            continue;
        }
        if !region.is_below_4g() {
            continue;
        }
        let end = region.end();

        match region.region_type {
            MemoryType::Ram | MemoryType::Acpi | MemoryType::Nvs => {
                if end > tolud {
                    tolud = end;
                }
            }
            _ => {
                if region.start == tolud {
                    tolud = end;
                }
            }
        }
    }

    if tolud == 0 {
        log::warn!("No usable DRAM below 4 GiB; MMIO classification uses base addresses only");
    }

    Tolud(tolud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coreboot::memory::FOUR_GIB;

    fn region(start: u64, size: u64, region_type: MemoryType) -> MemoryRegion {
        MemoryRegion::new(start, size, region_type)
    }

    #[test]
    fn test_reserved_extends_at_boundary() {
        let map = [
            region(0x0, 0x1000, MemoryType::Ram),
            region(0x1000, 0x2000, MemoryType::Reserved),
            region(0x10000, 0x1000, MemoryType::Reserved),
        ];
        assert_eq!(estimate_tolud(&map), Tolud::new(0x3000));
    }

    #[test]
    fn test_order_matters() {
        let forward = [
            region(0x0, 0x1000, MemoryType::Ram),
            region(0x1000, 0x1000, MemoryType::Reserved),
        ];
        let backward = [forward[1], forward[0]];
        assert_eq!(estimate_tolud(&forward).address(), 0x2000);
        assert_eq!(estimate_tolud(&backward).address(), 0x1000);
    }

    #[test]
    fn test_ignored_and_high_entries() {
        let map = [
            region(0x0, 0x1000, MemoryType::Unusable),
            region(0x0, 0x8000, MemoryType::PersistentMemory),
            region(0x1_0000_0000, 0x4000_0000, MemoryType::Ram),
            region(0xffff_f000, 0x2000, MemoryType::Ram),
        ];
        assert_eq!(estimate_tolud(&map), Tolud::new(0));
        assert_eq!(estimate_tolud(&[]), Tolud::new(0));
    }

    #[test]
    fn test_dram_up_to_four_gib() {
        let map = [
            region(0x0, 0xa0000, MemoryType::Ram),
            region(0x100000, FOUR_GIB - 0x100000, MemoryType::Ram),
        ];
        assert_eq!(estimate_tolud(&map).address(), FOUR_GIB);
    }

    #[test]
    fn test_acpi_and_nvs_count_as_dram() {
        let map = [
            region(0x0, 0x7fee_0000, MemoryType::Ram),
            region(0x7fee_0000, 0x10000, MemoryType::Acpi),
            region(0x7fef_0000, 0x10000, MemoryType::Nvs),
            region(0x7ff0_0000, 0x10_0000, MemoryType::Reserved),
            region(0xfec0_0000, 0x1000, MemoryType::Reserved),
        ];
        assert_eq!(estimate_tolud(&map).address(), 0x8000_0000);
    }
}
