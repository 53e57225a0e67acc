//! Coreboot table parser
//!
//! Parses the coreboot tables to extract the information the payload needs to
//! describe the platform: memory map, serial console, framebuffer, ACPI RSDP
//! and the CBMEM areas holding the ACPI and SMBIOS tables.
//! Reference: coreboot/src/commonlib/include/commonlib/coreboot_tables.h

use super::framebuffer::FramebufferInfo;
use super::memory::{MemoryRegion, MemoryType};
use crate::phys::{MemoryError, PhysicalMemory};
use heapless::{String, Vec};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Maximum number of memory regions we can store
pub const MAX_MEMORY_REGIONS: usize = 128;

/// Maximum number of CBMEM entries we keep
const MAX_CBMEM_ENTRIES: usize = 32;

/// Coreboot table tags
pub(crate) mod tags {
    pub const CB_TAG_MEMORY: u32 = 0x0001;
    pub const CB_TAG_VERSION: u32 = 0x0004;
    pub const CB_TAG_SERIAL: u32 = 0x000f;
    pub const CB_TAG_FORWARD: u32 = 0x0011;
    pub const CB_TAG_FRAMEBUFFER: u32 = 0x0012;
    pub const CB_TAG_CBMEM_ENTRY: u32 = 0x0031;
    pub const CB_TAG_ACPI_RSDP: u32 = 0x0043;
}

/// CBMEM area identifiers
pub mod cbmem_id {
    /// ACPI tables ("ACPI")
    pub const ACPI: u32 = 0x4143_5049;
    /// SMBIOS tables ("SMBT")
    pub const SMBIOS: u32 = 0x534d_4254;
}

const LBIO_SIGNATURE: [u8; 4] = *b"LBIO";

/// Coreboot header structure
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbHeader {
    signature: [u8; 4],
    header_bytes: u32,
    header_checksum: u32,
    table_bytes: u32,
    table_checksum: u32,
    table_entries: u32,
}

/// Coreboot record header
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbRecord {
    tag: u32,
    size: u32,
}

const RECORD_HEADER_SIZE: u32 = core::mem::size_of::<CbRecord>() as u32;

/// Coreboot memory range
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbMemoryRange {
    start: u64,
    size: u64,
    mem_type: u32,
}

/// Coreboot serial port info (without the trailing PCI address, which older
/// coreboot versions do not emit)
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbSerial {
    tag: u32,
    size: u32,
    serial_type: u32,
    baseaddr: u32,
    baud: u32,
    regwidth: u32,
    input_hertz: u32,
}

/// Coreboot framebuffer info
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbFramebuffer {
    tag: u32,
    size: u32,
    physical_address: u64,
    x_resolution: u32,
    y_resolution: u32,
    bytes_per_line: u32,
    bits_per_pixel: u8,
    red_mask_pos: u8,
    red_mask_size: u8,
    green_mask_pos: u8,
    green_mask_size: u8,
    blue_mask_pos: u8,
    blue_mask_size: u8,
    reserved_mask_pos: u8,
    reserved_mask_size: u8,
}

/// Record carrying a single 64-bit pointer (forward, ACPI RSDP)
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbPointer {
    tag: u32,
    size: u32,
    pointer: u64,
}

/// CBMEM entry record
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CbCbmemEntry {
    tag: u32,
    size: u32,
    address: u64,
    entry_size: u32,
    id: u32,
}

/// Errors from coreboot table parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// No "LBIO" header at the given pointer or in the scanned areas
    HeaderNotFound,
    /// The tables contain no usable memory map
    NoMemoryMap,
    /// A table could not be read
    Memory(MemoryError),
}

impl From<MemoryError> for TableError {
    fn from(err: MemoryError) -> Self {
        TableError::Memory(err)
    }
}

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TableError::HeaderNotFound => write!(f, "coreboot table header not found"),
            TableError::NoMemoryMap => write!(f, "coreboot tables carry no memory map"),
            TableError::Memory(err) => write!(f, "coreboot tables unreadable: {}", err),
        }
    }
}

/// Result type for coreboot table parsing
pub type Result<T> = core::result::Result<T, TableError>;

/// Serial port information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialInfo {
    pub serial_type: u32,
    pub baseaddr: u32,
    pub baud: u32,
    pub regwidth: u32,
    pub input_hertz: u32,
}

/// A CBMEM area announced by coreboot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbmemEntry {
    pub id: u32,
    pub address: u64,
    pub size: u32,
}

/// Information extracted from coreboot tables
#[derive(Debug, Default)]
pub struct CorebootInfo {
    /// Memory map, in table order
    pub memory_map: Vec<MemoryRegion, MAX_MEMORY_REGIONS>,
    /// Serial port configuration
    pub serial: Option<SerialInfo>,
    /// Framebuffer information
    pub framebuffer: Option<FramebufferInfo>,
    /// ACPI RSDP pointer
    pub acpi_rsdp: Option<u64>,
    /// Coreboot version string
    pub version: Option<String<64>>,
    /// CBMEM areas
    pub cbmem_entries: Vec<CbmemEntry, MAX_CBMEM_ENTRIES>,
}

impl CorebootInfo {
    /// Look up a CBMEM area by id
    pub fn cbmem_entry(&self, id: u32) -> Option<&CbmemEntry> {
        self.cbmem_entries.iter().find(|entry| entry.id == id)
    }
}

/// Parse coreboot tables starting at the given physical address
///
/// A null or invalid pointer falls back to scanning the legacy locations.
pub fn parse<M: PhysicalMemory>(mem: &M, table_ptr: u64) -> Result<CorebootInfo> {
    let mut info = CorebootInfo::default();

    let header = if table_ptr == 0 {
        log::warn!("Coreboot table pointer is null, scanning memory...");
        scan_for_header(mem)
    } else {
        find_header(mem, table_ptr)
    }
    .ok_or(TableError::HeaderNotFound)?;

    parse_table(mem, header, &mut info, true)?;

    if info.memory_map.is_empty() {
        return Err(TableError::NoMemoryMap);
    }

    Ok(info)
}

/// Walk the records of the table whose header is at `header_addr`
fn parse_table<M: PhysicalMemory>(
    mem: &M,
    header_addr: u64,
    info: &mut CorebootInfo,
    follow_forward: bool,
) -> Result<()> {
    let header: CbHeader = mem.read_struct(header_addr)?;
    let table_entries = header.table_entries;
    let table_bytes = header.table_bytes;
    let header_bytes = header.header_bytes;

    log::debug!(
        "Found coreboot header at {:#x}: {} table entries, {} bytes",
        header_addr,
        table_entries,
        table_bytes
    );

    let table_start = header_addr + u64::from(header_bytes);
    let mut offset = 0u32;

    while offset < table_bytes {
        let record_addr = table_start + u64::from(offset);
        let record: CbRecord = mem.read_struct(record_addr)?;
        let record_tag = record.tag;
        let record_size = record.size;

        if record_size < RECORD_HEADER_SIZE {
            log::warn!("Invalid record size: {}", record_size);
            break;
        }

        if record_tag == tags::CB_TAG_FORWARD {
            let forward: CbPointer = mem.read_struct(record_addr)?;
            let target = forward.pointer;
            if follow_forward {
                log::debug!("Following forward pointer to {:#x}", target);
                match find_header(mem, target) {
                    Some(forwarded) => parse_table(mem, forwarded, info, false)?,
                    None => log::warn!("Could not find coreboot header at forwarded location"),
                }
            } else {
                log::warn!("Ignoring nested forward pointer to {:#x}", target);
            }
        } else {
            parse_record(mem, record_addr, record_tag, record_size, info)?;
        }

        offset = match offset.checked_add(record_size) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(())
}

/// Check for the "LBIO" signature at `addr`
fn has_signature<M: PhysicalMemory>(mem: &M, addr: u64) -> bool {
    let mut signature = [0u8; 4];
    mem.read(addr, &mut signature).is_ok() && signature == LBIO_SIGNATURE
}

/// Find the coreboot header at `addr`, or in the page following it
fn find_header<M: PhysicalMemory>(mem: &M, addr: u64) -> Option<u64> {
    if has_signature(mem, addr) {
        return Some(addr);
    }
    scan_for_header_at(mem, addr, 0x1000)
}

/// Scan the legacy locations for the coreboot header
fn scan_for_header<M: PhysicalMemory>(mem: &M) -> Option<u64> {
    if let Some(header) = scan_for_header_at(mem, 0x0, 0x1000) {
        log::debug!("Found coreboot tables in low memory");
        return Some(header);
    }

    if let Some(header) = scan_for_header_at(mem, 0xF0000, 0x10000) {
        log::debug!("Found coreboot tables in BIOS area");
        return Some(header);
    }

    None
}

/// Scan a memory region for the coreboot header (16-byte aligned)
fn scan_for_header_at<M: PhysicalMemory>(mem: &M, base: u64, size: u64) -> Option<u64> {
    (0..size)
        .step_by(16)
        .map(|offset| base + offset)
        .find(|&addr| has_signature(mem, addr))
}

/// Parse a single coreboot record
fn parse_record<M: PhysicalMemory>(
    mem: &M,
    record_addr: u64,
    tag: u32,
    record_size: u32,
    info: &mut CorebootInfo,
) -> Result<()> {
    match tag {
        tags::CB_TAG_MEMORY => parse_memory(mem, record_addr, record_size, info)?,
        tags::CB_TAG_SERIAL => {
            let serial: CbSerial = mem.read_struct(record_addr)?;
            let parsed = SerialInfo {
                serial_type: serial.serial_type,
                baseaddr: serial.baseaddr,
                baud: serial.baud,
                regwidth: serial.regwidth,
                input_hertz: serial.input_hertz,
            };
            log::debug!(
                "Serial port: type={}, base={:#x}, baud={}",
                parsed.serial_type,
                parsed.baseaddr,
                parsed.baud
            );
            info.serial = Some(parsed);
        }
        tags::CB_TAG_FRAMEBUFFER => {
            let fb: CbFramebuffer = mem.read_struct(record_addr)?;
            let parsed = FramebufferInfo {
                physical_address: fb.physical_address,
                x_resolution: fb.x_resolution,
                y_resolution: fb.y_resolution,
                bytes_per_line: fb.bytes_per_line,
                bits_per_pixel: fb.bits_per_pixel,
                red_mask_pos: fb.red_mask_pos,
                red_mask_size: fb.red_mask_size,
                green_mask_pos: fb.green_mask_pos,
                green_mask_size: fb.green_mask_size,
                blue_mask_pos: fb.blue_mask_pos,
                blue_mask_size: fb.blue_mask_size,
                reserved_mask_pos: fb.reserved_mask_pos,
                reserved_mask_size: fb.reserved_mask_size,
            };
            log::debug!(
                "Framebuffer: {}x{} @ {:#x}, {} bpp",
                parsed.x_resolution,
                parsed.y_resolution,
                parsed.physical_address,
                parsed.bits_per_pixel
            );
            info.framebuffer = Some(parsed);
        }
        tags::CB_TAG_ACPI_RSDP => {
            let rsdp: CbPointer = mem.read_struct(record_addr)?;
            let pointer = rsdp.pointer;
            log::debug!("ACPI RSDP: {:#x}", pointer);
            info.acpi_rsdp = Some(pointer);
        }
        tags::CB_TAG_CBMEM_ENTRY => {
            let entry: CbCbmemEntry = mem.read_struct(record_addr)?;
            let parsed = CbmemEntry {
                id: entry.id,
                address: entry.address,
                size: entry.entry_size,
            };
            log::trace!(
                "CBMEM entry {:#010x}: {:#x} ({} bytes)",
                parsed.id,
                parsed.address,
                parsed.size
            );
            if info.cbmem_entries.push(parsed).is_err() {
                log::warn!("CBMEM entry list full, ignoring {:#010x}", parsed.id);
            }
        }
        tags::CB_TAG_VERSION => {
            let mut buf = [0u8; 64];
            let len = ((record_size - RECORD_HEADER_SIZE) as usize).min(buf.len());
            mem.read(record_addr + u64::from(RECORD_HEADER_SIZE), &mut buf[..len])?;
            if let Ok(s) = core::str::from_utf8(&buf[..len]) {
                let mut version = String::new();
                let _ = version.push_str(s.trim_end_matches('\0'));
                log::debug!("Coreboot version: {}", version);
                info.version = Some(version);
            }
        }
        _ => {
            log::trace!("Ignoring coreboot tag: {:#x}", tag);
        }
    }

    Ok(())
}

/// Parse memory map from coreboot table
fn parse_memory<M: PhysicalMemory>(
    mem: &M,
    record_addr: u64,
    record_size: u32,
    info: &mut CorebootInfo,
) -> Result<()> {
    let range_size = core::mem::size_of::<CbMemoryRange>();
    let num_entries = (record_size - RECORD_HEADER_SIZE) as usize / range_size;
    let data = record_addr + u64::from(RECORD_HEADER_SIZE);

    log::debug!("Parsing {} memory regions", num_entries);

    for i in 0..num_entries {
        let range: CbMemoryRange = mem.read_struct(data + (i * range_size) as u64)?;
        let region = MemoryRegion::new(
            range.start,
            range.size,
            MemoryType::from_coreboot(range.mem_type),
        );

        log::trace!(
            "  {:#014x}-{:#014x} {:?}",
            region.start,
            region.end(),
            region.region_type
        );

        if info.memory_map.push(region).is_err() {
            log::warn!("Memory map full, ignoring remaining regions");
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod builder {
    //! Synthetic coreboot tables for tests

    use super::tags;
    use alloc::vec::Vec;

    pub struct TableBuilder {
        records: Vec<u8>,
        entries: u32,
    }

    impl TableBuilder {
        pub fn new() -> Self {
            TableBuilder {
                records: Vec::new(),
                entries: 0,
            }
        }

        fn record(&mut self, tag: u32, body: &[u8]) -> &mut Self {
            self.records.extend_from_slice(&tag.to_le_bytes());
            self.records
                .extend_from_slice(&(8 + body.len() as u32).to_le_bytes());
            self.records.extend_from_slice(body);
            self.entries += 1;
            self
        }

        pub fn memory(&mut self, ranges: &[(u64, u64, u32)]) -> &mut Self {
            let mut body = Vec::new();
            for (start, size, kind) in ranges {
                body.extend_from_slice(&start.to_le_bytes());
                body.extend_from_slice(&size.to_le_bytes());
                body.extend_from_slice(&kind.to_le_bytes());
            }
            self.record(tags::CB_TAG_MEMORY, &body)
        }

        pub fn rsdp(&mut self, pointer: u64) -> &mut Self {
            self.record(tags::CB_TAG_ACPI_RSDP, &pointer.to_le_bytes())
        }

        pub fn forward(&mut self, pointer: u64) -> &mut Self {
            self.record(tags::CB_TAG_FORWARD, &pointer.to_le_bytes())
        }

        pub fn serial(&mut self, base: u32, baud: u32) -> &mut Self {
            let mut body = Vec::new();
            for value in [1u32, base, baud, 1, 1_843_200, 0] {
                body.extend_from_slice(&value.to_le_bytes());
            }
            self.record(tags::CB_TAG_SERIAL, &body)
        }

        pub fn cbmem(&mut self, id: u32, address: u64, size: u32) -> &mut Self {
            let mut body = Vec::new();
            body.extend_from_slice(&address.to_le_bytes());
            body.extend_from_slice(&size.to_le_bytes());
            body.extend_from_slice(&id.to_le_bytes());
            self.record(tags::CB_TAG_CBMEM_ENTRY, &body)
        }

        /// 32 bpp framebuffer with the given channel positions (red, green, blue)
        pub fn framebuffer(
            &mut self,
            address: u64,
            width: u32,
            height: u32,
            positions: (u8, u8, u8),
        ) -> &mut Self {
            let mut body = Vec::new();
            body.extend_from_slice(&address.to_le_bytes());
            for value in [width, height, width * 4] {
                body.extend_from_slice(&value.to_le_bytes());
            }
            let (red, green, blue) = positions;
            body.extend_from_slice(&[32, red, 8, green, 8, blue, 8, 24, 8]);
            self.record(tags::CB_TAG_FRAMEBUFFER, &body)
        }

        pub fn version(&mut self, version: &str) -> &mut Self {
            let mut body = Vec::from(version.as_bytes());
            body.push(0);
            self.record(tags::CB_TAG_VERSION, &body)
        }

        pub fn build(&self) -> Vec<u8> {
            let mut table = Vec::new();
            table.extend_from_slice(b"LBIO");
            for value in [24u32, 0, self.records.len() as u32, 0, self.entries] {
                table.extend_from_slice(&value.to_le_bytes());
            }
            table.extend_from_slice(&self.records);
            table
        }
    }
}
