//! Memory map classification into resource descriptors

use super::{AllocationKind, ResourceAttributes, ResourceDescriptor, ResourceKind, Tolud};
use crate::coreboot::memory::{FOUR_GIB, MemoryRegion, MemoryType};

/// Classify the usable DRAM entries (RAM, ACPI, NVS) of the map
///
/// ACPI and NVS entries also carry an allocation so the next stage keeps
/// them out of its free memory.
pub fn classify_usable(map: &[MemoryRegion]) -> impl Iterator<Item = ResourceDescriptor> + '_ {
    map.iter()
        .filter(|region| region.region_type.is_usable_dram())
        .map(|region| {
            let allocation = match region.region_type {
                MemoryType::Acpi => Some(AllocationKind::AcpiReclaim),
                MemoryType::Nvs => Some(AllocationKind::AcpiNvs),
                _ => None,
            };
            ResourceDescriptor {
                base: region.start,
                size: region.size,
                kind: ResourceKind::SystemMemory,
                attributes: ResourceAttributes::MEMORY_MAP,
                allocation,
            }
        })
}

/// Classify every entry [`classify_usable`] skips as reserved or MMIO
///
/// In order:
/// 1. the entry starting at the PCIe ECAM base is MMIO
/// 2. anything starting below TOLUD is reserved DRAM
/// 3. anything else below 4 GiB is a device window (MMIO)
/// 4. anything above 4 GiB is reserved
///
/// `pcie_base` is 0 when the platform has no MCFG; rule 1 then matches an
/// entry at address 0.
pub fn classify_reserved(
    map: &[MemoryRegion],
    tolud: Tolud,
    pcie_base: u64,
) -> impl Iterator<Item = ResourceDescriptor> + '_ {
    map.iter()
        .filter(|region| !region.region_type.is_usable_dram())
        .map(move |region| {
            let kind = if region.start == pcie_base {
                ResourceKind::MemoryMappedIo
            } else if region.start < tolud.address() {
                ResourceKind::Reserved
            } else if region.start < FOUR_GIB {
                ResourceKind::MemoryMappedIo
            } else {
                ResourceKind::Reserved
            };

            let allocation = match region.region_type {
                MemoryType::Unusable | MemoryType::Disabled => Some(AllocationKind::Unusable),
                MemoryType::PersistentMemory => Some(AllocationKind::PersistentMemory),
                _ => None,
            };

            ResourceDescriptor {
                base: region.start,
                size: region.size,
                kind,
                attributes: ResourceAttributes::MEMORY_MAP,
                allocation,
            }
        })
}
