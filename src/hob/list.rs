//! HOB list builder
//!
//! The list is written into a window of memory the caller reserves for it.
//! The PHIT always sits at the start of the window, and an end-of-list HOB
//! always follows the last HOB, so the list is well formed after every
//! append. The PHIT free-memory bottom tracks the first byte past that end
//! HOB.

use super::{
    BOOT_WITH_FULL_CONFIGURATION, CpuHob, GuidHobHeader, HANDOFF_TABLE_VERSION, HandoffInfoTable,
    HobError, HobHeader, HobSink, MemoryAllocationHob, ResourceDescriptorHob, Result,
    align_hob_length, hob_type,
};
use crate::memmap::{ResourceAttributes, ResourceKind};
use core::mem::size_of;
use r_efi::efi;
use zerocopy::{FromBytes, IntoBytes};

const HEADER_SIZE: usize = size_of::<HobHeader>();
const PHIT_SIZE: usize = size_of::<HandoffInfoTable>();

/// A PHIT-headed HOB list under construction
pub struct HobList<'a> {
    buf: &'a mut [u8],
    /// Physical address of `buf[0]`
    base: u64,
    phit: HandoffInfoTable,
    /// Offset of the end-of-list HOB
    end: usize,
}

impl<'a> HobList<'a> {
    /// Start a HOB list in `buf`, which lives at physical address `base`
    ///
    /// `memory_bottom`/`memory_top` describe the memory handed to the next
    /// stage; the free memory range is the part of `buf` past the list.
    pub fn new(buf: &'a mut [u8], base: u64, memory_bottom: u64, memory_top: u64) -> Result<Self> {
        if buf.len() < PHIT_SIZE + HEADER_SIZE {
            return Err(HobError::OutOfResources {
                needed: PHIT_SIZE + HEADER_SIZE,
                available: buf.len(),
            });
        }

        let phit = HandoffInfoTable {
            header: HobHeader::new(hob_type::HANDOFF, PHIT_SIZE),
            version: HANDOFF_TABLE_VERSION,
            boot_mode: BOOT_WITH_FULL_CONFIGURATION,
            memory_top,
            memory_bottom,
            free_memory_top: base + buf.len() as u64,
            free_memory_bottom: 0,
            end_of_hob_list: 0,
        };

        let mut list = HobList {
            buf,
            base,
            phit,
            end: PHIT_SIZE,
        };
        list.terminate();
        Ok(list)
    }

    /// Physical address of the PHIT, which is what the next stage receives
    pub fn address(&self) -> u64 {
        self.base
    }

    /// Physical address of the end-of-list HOB
    pub fn end_of_hob_list(&self) -> u64 {
        self.base + self.end as u64
    }

    pub fn phit(&self) -> &HandoffInfoTable {
        &self.phit
    }

    /// The encoded list, including the end-of-list HOB
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.end + HEADER_SIZE]
    }

    /// Iterate over `(type, bytes)` of every HOB, PHIT first, end HOB excluded
    pub fn iter(&self) -> HobIter<'_> {
        HobIter {
            bytes: &self.buf[..self.end],
        }
    }

    /// Write the end-of-list HOB at `self.end` and refresh the PHIT
    fn terminate(&mut self) {
        let end_hob = HobHeader::new(hob_type::END_OF_HOB_LIST, HEADER_SIZE);
        self.buf[self.end..self.end + HEADER_SIZE].copy_from_slice(end_hob.as_bytes());

        self.phit.end_of_hob_list = self.end_of_hob_list();
        self.phit.free_memory_bottom = self.end_of_hob_list() + HEADER_SIZE as u64;
        self.buf[..PHIT_SIZE].copy_from_slice(self.phit.as_bytes());
    }

    /// Reserve room for a HOB of `length` bytes (header included) and return
    /// it, zeroed
    fn allocate(&mut self, length: usize) -> Result<&mut [u8]> {
        let length = align_hob_length(length);
        let available = self.buf.len() - self.end - HEADER_SIZE;
        if length > available || length > usize::from(u16::MAX) {
            log::error!(
                "HOB list full: {} bytes requested, {} available",
                length,
                available
            );
            return Err(HobError::OutOfResources {
                needed: length,
                available,
            });
        }

        let start = self.end;
        self.end += length;
        self.terminate();

        let hob = &mut self.buf[start..start + length];
        hob.fill(0);
        Ok(hob)
    }
}

impl HobSink for HobList<'_> {
    fn resource_descriptor(
        &mut self,
        kind: ResourceKind,
        attributes: ResourceAttributes,
        base: u64,
        length: u64,
    ) -> Result<()> {
        let hob = ResourceDescriptorHob {
            header: HobHeader::new(
                hob_type::RESOURCE_DESCRIPTOR,
                size_of::<ResourceDescriptorHob>(),
            ),
            owner: [0; 16],
            resource_type: kind.resource_type(),
            resource_attribute: attributes.bits(),
            physical_start: base,
            resource_length: length,
        };
        self.allocate(size_of::<ResourceDescriptorHob>())?
            .copy_from_slice(hob.as_bytes());
        Ok(())
    }

    fn memory_allocation(
        &mut self,
        base: u64,
        length: u64,
        memory_type: efi::MemoryType,
    ) -> Result<()> {
        let hob = MemoryAllocationHob {
            header: HobHeader::new(
                hob_type::MEMORY_ALLOCATION,
                size_of::<MemoryAllocationHob>(),
            ),
            name: [0; 16],
            memory_base_address: base,
            memory_length: length,
            memory_type,
            reserved: [0; 4],
        };
        self.allocate(size_of::<MemoryAllocationHob>())?
            .copy_from_slice(hob.as_bytes());
        Ok(())
    }

    fn guid_hob(&mut self, guid: &efi::Guid, data: &[u8]) -> Result<()> {
        let length = size_of::<GuidHobHeader>() + data.len();
        let header = GuidHobHeader {
            header: HobHeader::new(hob_type::GUID_EXTENSION, align_hob_length(length)),
            name: *guid.as_bytes(),
        };

        let hob = self.allocate(length)?;
        let (head, rest) = hob.split_at_mut(size_of::<GuidHobHeader>());
        head.copy_from_slice(header.as_bytes());
        rest[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn cpu(&mut self, memory_space_bits: u8, io_space_bits: u8) -> Result<()> {
        let hob = CpuHob {
            header: HobHeader::new(hob_type::CPU, size_of::<CpuHob>()),
            size_of_memory_space: memory_space_bits,
            size_of_io_space: io_space_bits,
            reserved: [0; 6],
        };
        self.allocate(size_of::<CpuHob>())?
            .copy_from_slice(hob.as_bytes());
        Ok(())
    }
}

/// Iterator over the HOBs of an encoded list
pub struct HobIter<'a> {
    bytes: &'a [u8],
}

impl<'a> Iterator for HobIter<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (header, _) = HobHeader::read_from_prefix(self.bytes).ok()?;
        let kind = header.hob_type;
        let length = usize::from(header.hob_length);
        if kind == hob_type::END_OF_HOB_LIST
            || length < HEADER_SIZE
            || length > self.bytes.len()
        {
            return None;
        }
        let (hob, rest) = self.bytes.split_at(length);
        self.bytes = rest;
        Some((kind, hob))
    }
}
