//! PCI Express memory mapped configuration space table (MCFG)

use super::{Result, SDT_HEADER_SIZE, SdtHeader};
use crate::phys::{MemoryError, PhysicalMemory};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Reserved bytes between the SDT header and the first allocation structure
const MCFG_RESERVED_SIZE: u64 = 8;

/// Offset of the first allocation structure
const FIRST_ALLOCATION_OFFSET: u64 = SDT_HEADER_SIZE as u64 + MCFG_RESERVED_SIZE;

/// ECAM space per bus: 32 devices x 8 functions x 4 KiB
pub const ECAM_BYTES_PER_BUS: u64 = 4096 * 32 * 8;

/// Configuration space base address allocation structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct RawAllocation {
    base_address: u64,
    segment: u16,
    start_bus: u8,
    end_bus: u8,
    reserved: u32,
}

const ALLOCATION_SIZE: usize = core::mem::size_of::<RawAllocation>();

/// The first ECAM window described by an MCFG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcamWindow {
    pub base: u64,
    pub segment: u16,
    pub start_bus: u8,
    pub end_bus: u8,
}

impl EcamWindow {
    /// Read the first allocation structure of the MCFG at `address`
    ///
    /// An MCFG too short to hold an allocation describes no window.
    pub fn read<M: PhysicalMemory>(mem: &M, address: u64) -> Result<Option<Self>> {
        let header: SdtHeader = mem.read_struct(address)?;
        let length = u64::from({ header.length });
        if length < FIRST_ALLOCATION_OFFSET + ALLOCATION_SIZE as u64 {
            log::warn!("MCFG at {:#x} holds no allocation ({} bytes)", address, length);
            return Ok(None);
        }

        let allocation = address
            .checked_add(FIRST_ALLOCATION_OFFSET)
            .ok_or(MemoryError::Overflow {
                address,
                length: length as usize,
            })?;
        let raw: RawAllocation = mem.read_struct(allocation)?;
        Ok(Some(EcamWindow {
            base: raw.base_address,
            segment: raw.segment,
            start_bus: raw.start_bus,
            end_bus: raw.end_bus,
        }))
    }

    /// Size of the window: 1 MiB per decoded bus
    ///
    /// A window whose end bus lies below its start bus decodes nothing.
    pub fn size(&self) -> u64 {
        let buses = (u64::from(self.end_bus) + 1).saturating_sub(u64::from(self.start_bus));
        buses * ECAM_BYTES_PER_BUS
    }
}
