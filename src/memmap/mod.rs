//! Platform memory map classification
//!
//! The bootloader memory map only says what each range is used for, not
//! whether a reserved range is DRAM carved out by firmware or a device
//! window. The next boot stage needs that distinction, so the map goes
//! through two steps:
//!
//! - [`tolud::estimate_tolud`] finds the top of lower usable DRAM
//! - [`classify`] turns every entry into a [`ResourceDescriptor`], usable
//!   memory in one pass and everything else in a second pass that uses the
//!   TOLUD and the PCIe ECAM base to tell reserved DRAM from MMIO

pub mod classify;
pub mod tolud;

pub use classify::{classify_reserved, classify_usable};
pub use tolud::{Tolud, estimate_tolud};

use bitflags::bitflags;
use r_efi::efi;

/// Kind of a resource descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    SystemMemory,
    MemoryMappedIo,
    Reserved,
}

impl ResourceKind {
    /// PI resource type (`EFI_RESOURCE_*`)
    pub fn resource_type(&self) -> u32 {
        match self {
            ResourceKind::SystemMemory => 0x0,
            ResourceKind::MemoryMappedIo => 0x1,
            ResourceKind::Reserved => 0x5,
        }
    }
}

bitflags! {
    /// PI resource attributes (`EFI_RESOURCE_ATTRIBUTE_*`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceAttributes: u32 {
        const PRESENT = 0x0000_0001;
        const INITIALIZED = 0x0000_0002;
        const TESTED = 0x0000_0004;
        const UNCACHEABLE = 0x0000_0400;
        const WRITE_COMBINEABLE = 0x0000_0800;
        const WRITE_THROUGH_CACHEABLE = 0x0000_1000;
        const WRITE_BACK_CACHEABLE = 0x0000_2000;
    }
}

impl ResourceAttributes {
    /// Attributes given to every memory map entry
    pub const MEMORY_MAP: ResourceAttributes = ResourceAttributes::PRESENT
        .union(ResourceAttributes::INITIALIZED)
        .union(ResourceAttributes::TESTED)
        .union(ResourceAttributes::UNCACHEABLE)
        .union(ResourceAttributes::WRITE_COMBINEABLE)
        .union(ResourceAttributes::WRITE_THROUGH_CACHEABLE)
        .union(ResourceAttributes::WRITE_BACK_CACHEABLE);

    /// Attributes of uncached device windows
    pub const MMIO: ResourceAttributes = ResourceAttributes::PRESENT
        .union(ResourceAttributes::INITIALIZED)
        .union(ResourceAttributes::UNCACHEABLE)
        .union(ResourceAttributes::TESTED);
}

/// Secondary allocation record published next to a resource descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    Unusable,
    PersistentMemory,
    AcpiReclaim,
    AcpiNvs,
}

impl AllocationKind {
    /// EFI memory type of the allocation
    pub fn efi_memory_type(&self) -> efi::MemoryType {
        match self {
            AllocationKind::Unusable => efi::UNUSABLE_MEMORY,
            AllocationKind::PersistentMemory => efi::PERSISTENT_MEMORY,
            AllocationKind::AcpiReclaim => efi::ACPI_RECLAIM_MEMORY,
            AllocationKind::AcpiNvs => efi::ACPI_MEMORY_NVS,
        }
    }
}

/// A classified memory map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub base: u64,
    pub size: u64,
    pub kind: ResourceKind,
    pub attributes: ResourceAttributes,
    pub allocation: Option<AllocationKind>,
}
