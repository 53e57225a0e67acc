//! ACPI table access
//!
//! Only the handful of tables the payload hands over to the next stage are
//! decoded here: the RSDP, the RSDT/XSDT pointer arrays, the FADT and the
//! MCFG. TPM tables (TPM2, TCPA) are only detected, never parsed.
//!
//! All reads go through [`PhysicalMemory`](crate::phys::PhysicalMemory); the
//! structures below describe the byte layout from the ACPI specification and
//! are decoded with `zerocopy`, so no table is ever accessed through a cast
//! pointer.

pub mod board_info;
pub mod fadt;
pub mod mcfg;
pub mod rsdp;

pub use board_info::{AcpiBoardInfo, parse_acpi_info};
pub use rsdp::Rsdp;

use crate::phys::MemoryError;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Table signatures
pub mod signature {
    /// Fixed ACPI Description Table
    pub const FADT: [u8; 4] = *b"FACP";
    /// PCI Express memory mapped configuration space
    pub const MCFG: [u8; 4] = *b"MCFG";
    /// Trusted Platform Module 2.0
    pub const TPM2: [u8; 4] = *b"TPM2";
    /// Trusted Computing Platform Alliance (TPM 1.2)
    pub const TCPA: [u8; 4] = *b"TCPA";
    /// Root System Description Pointer
    pub const RSDP: [u8; 8] = *b"RSD PTR ";
}

/// Errors from ACPI table discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiError {
    /// No RSDP address was provided by the bootloader
    NoRsdp,
    /// The RSDP has a bad signature or checksum
    InvalidRsdp,
    /// Neither the RSDT nor the XSDT lists a FADT
    FadtNotFound,
    /// A table could not be read
    BadAddress(MemoryError),
}

impl From<MemoryError> for AcpiError {
    fn from(err: MemoryError) -> Self {
        AcpiError::BadAddress(err)
    }
}

impl core::fmt::Display for AcpiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AcpiError::NoRsdp => write!(f, "no ACPI RSDP provided"),
            AcpiError::InvalidRsdp => write!(f, "invalid ACPI RSDP"),
            AcpiError::FadtNotFound => write!(f, "FADT not found in RSDT/XSDT"),
            AcpiError::BadAddress(err) => write!(f, "ACPI table unreadable: {}", err),
        }
    }
}

/// Result type for ACPI operations
pub type Result<T> = core::result::Result<T, AcpiError>;

/// ACPI SDT header (common to all tables)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

/// Size of [`SdtHeader`] (36 bytes)
pub const SDT_HEADER_SIZE: usize = core::mem::size_of::<SdtHeader>();

/// Sum of all bytes, as used by every ACPI checksum
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}
