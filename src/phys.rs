//! Physical memory access
//!
//! Everything this payload learns about the platform lives in memory that a
//! previous boot stage filled in: coreboot tables, CBMEM, ACPI tables. Rather
//! than casting physical addresses to structure pointers, all of it is read
//! through the [`PhysicalMemory`] trait, which copies bytes out of physical
//! memory with explicit bounds checks. Structures are then decoded from those
//! bytes with `zerocopy`.
//!
//! The payload runs identity mapped, so the production implementation
//! ([`IdentityMapped`]) is a checked `copy_nonoverlapping`. Tests use an
//! in-memory fake.

use zerocopy::{FromBytes, IntoBytes};

/// Errors from physical memory reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Read of the null page
    NullAddress,
    /// `address + length` wraps around the address space
    Overflow { address: u64, length: usize },
    /// Address is not backed by readable memory
    Unmapped { address: u64, length: usize },
}

impl core::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MemoryError::NullAddress => write!(f, "read from null address"),
            MemoryError::Overflow { address, length } => {
                write!(f, "read of {} bytes at {:#x} overflows", length, address)
            }
            MemoryError::Unmapped { address, length } => {
                write!(f, "{} bytes at {:#x} are not readable", length, address)
            }
        }
    }
}

/// Result type for physical memory reads
pub type Result<T> = core::result::Result<T, MemoryError>;

/// Read-only view of physical memory
pub trait PhysicalMemory {
    /// Copy `buf.len()` bytes starting at physical address `address` into `buf`
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Read a plain-old-data structure at `address`
    fn read_struct<T: FromBytes + IntoBytes>(&self, address: u64) -> Result<T>
    where
        Self: Sized,
    {
        let mut value = T::new_zeroed();
        self.read(address, value.as_mut_bytes())?;
        Ok(value)
    }

    /// Read a little-endian `u32` at `address` (no alignment requirement)
    fn read_u32(&self, address: u64) -> Result<u32>
    where
        Self: Sized,
    {
        let mut bytes = [0u8; 4];
        self.read(address, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian `u64` at `address` (no alignment requirement)
    fn read_u64(&self, address: u64) -> Result<u64>
    where
        Self: Sized,
    {
        let mut bytes = [0u8; 8];
        self.read(address, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }
}

impl<M: PhysicalMemory> PhysicalMemory for &M {
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read(address, buf)
    }
}

/// Check that `[address, address + length)` is a sane range to read
pub fn check_range(address: u64, length: usize) -> Result<()> {
    if address == 0 {
        return Err(MemoryError::NullAddress);
    }
    if address.checked_add(length as u64).is_none() {
        return Err(MemoryError::Overflow { address, length });
    }
    Ok(())
}

/// Identity-mapped physical memory
///
/// Physical address N is readable at virtual address N. This is the layout
/// coreboot hands over to its payloads.
pub struct IdentityMapped {
    _private: (),
}

impl IdentityMapped {
    /// Create the identity-mapped view.
    ///
    /// # Safety
    ///
    /// Every physical address later passed to [`PhysicalMemory::read`] must be
    /// mapped and readable at the same virtual address.
    pub const unsafe fn new() -> Self {
        IdentityMapped { _private: () }
    }
}

impl PhysicalMemory for IdentityMapped {
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        check_range(address, buf.len())?;
        if usize::try_from(address).is_err() {
            return Err(MemoryError::Unmapped {
                address,
                length: buf.len(),
            });
        }

        // SAFETY: the range was checked for null and wrap-around above and the
        // caller of `IdentityMapped::new` guaranteed the identity mapping.
        unsafe {
            core::ptr::copy_nonoverlapping(address as *const u8, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }
}

/// Sparse in-memory physical address space for tests
#[cfg(test)]
pub mod fake {
    use super::{MemoryError, PhysicalMemory, Result, check_range};
    use alloc::vec::Vec;

    /// A set of byte blobs placed at physical addresses
    #[derive(Default)]
    pub struct FakeMemory {
        regions: Vec<(u64, Vec<u8>)>,
    }

    impl FakeMemory {
        pub fn new() -> Self {
            Self::default()
        }

        /// Place `bytes` at physical address `address`
        pub fn place(&mut self, address: u64, bytes: &[u8]) {
            self.regions.push((address, bytes.to_vec()));
        }
    }

    impl PhysicalMemory for FakeMemory {
        fn read(&self, address: u64, buf: &mut [u8]) -> Result<()> {
            check_range(address, buf.len())?;
            let end = address + buf.len() as u64;
            for (base, bytes) in self.regions.iter().rev() {
                let limit = base + bytes.len() as u64;
                if address >= *base && end <= limit {
                    let offset = (address - base) as usize;
                    buf.copy_from_slice(&bytes[offset..offset + buf.len()]);
                    return Ok(());
                }
            }
            Err(MemoryError::Unmapped {
                address,
                length: buf.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeMemory;
    use super::*;

    #[test]
    fn test_read_unaligned_u32() {
        let mut mem = FakeMemory::new();
        mem.place(0x1001, &[0x46, 0x41, 0x43, 0x50, 0xff]);
        assert_eq!(mem.read_u32(0x1001), Ok(u32::from_le_bytes(*b"FACP")));
    }

    #[test]
    fn test_read_outside_region_fails() {
        let mut mem = FakeMemory::new();
        mem.place(0x1000, &[0u8; 8]);
        assert_eq!(
            mem.read_u64(0x1004),
            Err(MemoryError::Unmapped {
                address: 0x1004,
                length: 8
            })
        );
    }

    #[test]
    fn test_null_and_overflow_rejected() {
        let mem = FakeMemory::new();
        assert_eq!(mem.read_u32(0), Err(MemoryError::NullAddress));
        assert_eq!(
            mem.read_u64(u64::MAX - 3),
            Err(MemoryError::Overflow {
                address: u64::MAX - 3,
                length: 8
            })
        );
    }
}
