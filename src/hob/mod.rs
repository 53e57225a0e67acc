//! PI Hand-Off Blocks
//!
//! The payload describes the platform to the next boot stage as a HOB list:
//! a PHIT header followed by resource descriptors, memory allocations, GUID
//! extensions and a CPU HOB, terminated by an end-of-list HOB.
//!
//! Producers write through the [`HobSink`] trait. [`HobList`] is the real
//! sink, building the binary list inside a reserved memory window.

pub mod guids;
pub mod list;

pub use list::HobList;

use crate::memmap::{ResourceAttributes, ResourceDescriptor, ResourceKind};
use r_efi::efi;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// HOB types
pub mod hob_type {
    pub const HANDOFF: u16 = 0x0001;
    pub const MEMORY_ALLOCATION: u16 = 0x0002;
    pub const RESOURCE_DESCRIPTOR: u16 = 0x0003;
    pub const GUID_EXTENSION: u16 = 0x0004;
    pub const CPU: u16 = 0x000b;
    pub const END_OF_HOB_LIST: u16 = 0xffff;
}

/// PHIT version this payload produces
pub const HANDOFF_TABLE_VERSION: u32 = 0x0009;

/// Boot mode: full configuration
pub const BOOT_WITH_FULL_CONFIGURATION: u32 = 0x00;

/// Errors from HOB construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HobError {
    /// The HOB window has no room for another HOB
    OutOfResources { needed: usize, available: usize },
}

impl core::fmt::Display for HobError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HobError::OutOfResources { needed, available } => write!(
                f,
                "HOB window exhausted: need {} bytes, {} available",
                needed, available
            ),
        }
    }
}

/// Result type for HOB construction
pub type Result<T> = core::result::Result<T, HobError>;

/// Generic HOB header
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HobHeader {
    pub hob_type: u16,
    pub hob_length: u16,
    pub reserved: u32,
}

impl HobHeader {
    pub fn new(hob_type: u16, hob_length: usize) -> Self {
        HobHeader {
            hob_type,
            hob_length: hob_length as u16,
            reserved: 0,
        }
    }
}

/// Phase Handoff Information Table
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HandoffInfoTable {
    pub header: HobHeader,
    pub version: u32,
    pub boot_mode: u32,
    pub memory_top: u64,
    pub memory_bottom: u64,
    pub free_memory_top: u64,
    pub free_memory_bottom: u64,
    pub end_of_hob_list: u64,
}

/// Memory allocation HOB
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MemoryAllocationHob {
    pub header: HobHeader,
    pub name: [u8; 16],
    pub memory_base_address: u64,
    pub memory_length: u64,
    pub memory_type: u32,
    pub reserved: [u8; 4],
}

/// Resource descriptor HOB
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ResourceDescriptorHob {
    pub header: HobHeader,
    pub owner: [u8; 16],
    pub resource_type: u32,
    pub resource_attribute: u32,
    pub physical_start: u64,
    pub resource_length: u64,
}

/// GUID extension HOB header; the data follows
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct GuidHobHeader {
    pub header: HobHeader,
    pub name: [u8; 16],
}

/// CPU HOB
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct CpuHob {
    pub header: HobHeader,
    pub size_of_memory_space: u8,
    pub size_of_io_space: u8,
    pub reserved: [u8; 6],
}

/// Round a HOB length up to the 8-byte HOB alignment
pub const fn align_hob_length(length: usize) -> usize {
    (length + 7) & !7
}

/// Destination for the HOBs the payload produces
pub trait HobSink {
    /// Append a resource descriptor HOB
    fn resource_descriptor(
        &mut self,
        kind: ResourceKind,
        attributes: ResourceAttributes,
        base: u64,
        length: u64,
    ) -> Result<()>;

    /// Append a memory allocation HOB
    fn memory_allocation(
        &mut self,
        base: u64,
        length: u64,
        memory_type: efi::MemoryType,
    ) -> Result<()>;

    /// Append a GUID extension HOB carrying `data`
    fn guid_hob(&mut self, guid: &efi::Guid, data: &[u8]) -> Result<()>;

    /// Append the CPU HOB
    fn cpu(&mut self, memory_space_bits: u8, io_space_bits: u8) -> Result<()>;
}

/// Publish a classified memory map entry: its resource descriptor and, if
/// it has one, its allocation
pub fn publish<S: HobSink + ?Sized>(sink: &mut S, descriptor: &ResourceDescriptor) -> Result<()> {
    log::debug!(
        "{:?} {:#x}-{:#x} {:?}",
        descriptor.kind,
        descriptor.base,
        descriptor.base.saturating_add(descriptor.size),
        descriptor.allocation
    );

    sink.resource_descriptor(
        descriptor.kind,
        descriptor.attributes,
        descriptor.base,
        descriptor.size,
    )?;
    if let Some(allocation) = descriptor.allocation {
        sink.memory_allocation(
            descriptor.base,
            descriptor.size,
            allocation.efi_memory_type(),
        )?;
    }
    Ok(())
}
