//! Root System Description Pointer

use super::{AcpiError, Result, checksum, signature};
use crate::phys::PhysicalMemory;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Length of the ACPI 1.0 part of the RSDP covered by the first checksum
const RSDP_V1_LENGTH: usize = 20;

/// Longest extended RSDP we are willing to checksum
const RSDP_MAX_LENGTH: usize = 64;

/// ACPI RSDP structure (Root System Description Pointer)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct RawRsdp {
    signature: [u8; 8], // "RSD PTR "
    checksum: u8,
    oem_id: [u8; 6],
    revision: u8,
    rsdt_address: u32,
    // ACPI 2.0+ fields
    length: u32,
    xsdt_address: u64,
    extended_checksum: u8,
    reserved: [u8; 3],
}

/// A validated RSDP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rsdp {
    /// Physical address of the RSDP itself
    pub address: u64,
    pub revision: u8,
    /// Physical address of the RSDT (0 if absent)
    pub rsdt_address: u32,
    /// Physical address of the XSDT (0 if absent or revision < 2)
    pub xsdt_address: u64,
    /// Size of the structure in bytes (20 for ACPI 1.0)
    pub length: u32,
}

impl Rsdp {
    /// Read the RSDP at `address` without validating it
    ///
    /// The XSDT field only exists from revision 2 on; for older tables it is
    /// reported as absent.
    pub fn read<M: PhysicalMemory>(mem: &M, address: u64) -> Result<Self> {
        let mut bytes = [0u8; core::mem::size_of::<RawRsdp>()];
        mem.read(address, &mut bytes[..RSDP_V1_LENGTH])?;
        let revision = bytes[15];
        if revision >= 2 {
            mem.read(address, &mut bytes)?;
        }

        let raw = RawRsdp::read_from_bytes(&bytes).map_err(|_| AcpiError::InvalidRsdp)?;
        let (xsdt_address, length) = if revision >= 2 {
            (raw.xsdt_address, raw.length)
        } else {
            (0, RSDP_V1_LENGTH as u32)
        };

        Ok(Rsdp {
            address,
            revision,
            rsdt_address: raw.rsdt_address,
            xsdt_address,
            length,
        })
    }

    /// Read and validate the RSDP at `address`
    ///
    /// Checks the `"RSD PTR "` signature, the ACPI 1.0 checksum and, for
    /// revision 2 and later, the extended checksum over `length` bytes.
    pub fn parse<M: PhysicalMemory>(mem: &M, address: u64) -> Result<Self> {
        let mut head = [0u8; RSDP_V1_LENGTH];
        mem.read(address, &mut head)?;

        if head[..8] != signature::RSDP {
            log::warn!("Invalid RSDP signature at {:#x}", address);
            return Err(AcpiError::InvalidRsdp);
        }
        if checksum(&head) != 0 {
            log::warn!("RSDP checksum mismatch at {:#x}", address);
            return Err(AcpiError::InvalidRsdp);
        }

        let rsdp = Self::read(mem, address)?;

        if rsdp.revision >= 2 {
            let length = rsdp.length as usize;
            if !(core::mem::size_of::<RawRsdp>()..=RSDP_MAX_LENGTH).contains(&length) {
                log::warn!("RSDP has implausible length {}", length);
                return Err(AcpiError::InvalidRsdp);
            }
            let mut full = [0u8; RSDP_MAX_LENGTH];
            mem.read(address, &mut full[..length])?;
            if checksum(&full[..length]) != 0 {
                log::warn!("RSDP extended checksum mismatch at {:#x}", address);
                return Err(AcpiError::InvalidRsdp);
            }
        }

        log::debug!(
            "RSDP at {:#x}: revision {}, RSDT {:#x}, XSDT {:#x}",
            rsdp.address,
            rsdp.revision,
            rsdp.rsdt_address,
            rsdp.xsdt_address
        );

        Ok(rsdp)
    }
}
