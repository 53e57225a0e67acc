//! Hand-off pipeline
//!
//! Turns what coreboot left behind into the HOB list for the next stage.
//! The order is fixed: the TOLUD estimate and the usable memory come first,
//! then the graphics and system table HOBs, then the ACPI board info, and
//! only then the reserved/MMIO classification, which needs the PCIe ECAM base
//! found in the ACPI tables.

use crate::acpi::{self, AcpiBoardInfo, AcpiError};
use crate::arch::x86_64::io::PortIo;
use crate::config::PayloadConfig;
use crate::graphics::GraphicsInfo;
use crate::coreboot::{CorebootInfo, TableError};
use crate::hob::{self, HobError, HobSink, guids};
use crate::memmap::{self, ResourceAttributes, ResourceKind, Tolud};
use crate::phys::PhysicalMemory;
use crate::system_tables::SystemTableInfo;
use r_efi::efi;

/// I/O space width reported in the CPU HOB
const IO_SPACE_BITS: u8 = 16;

/// Errors that stop the hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    Table(TableError),
    Acpi(AcpiError),
    Hob(HobError),
}

impl From<TableError> for PayloadError {
    fn from(err: TableError) -> Self {
        PayloadError::Table(err)
    }
}

impl From<AcpiError> for PayloadError {
    fn from(err: AcpiError) -> Self {
        PayloadError::Acpi(err)
    }
}

impl From<HobError> for PayloadError {
    fn from(err: HobError) -> Self {
        PayloadError::Hob(err)
    }
}

impl core::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PayloadError::Table(err) => write!(f, "{}", err),
            PayloadError::Acpi(err) => write!(f, "{}", err),
            PayloadError::Hob(err) => write!(f, "{}", err),
        }
    }
}

/// Result type for the hand-off pipeline
pub type Result<T> = core::result::Result<T, PayloadError>;

/// What the pipeline found out about the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSummary {
    pub tolud: Tolud,
    pub system_tables: SystemTableInfo,
    pub board_info: AcpiBoardInfo,
}

/// Build the HOBs describing the platform from the coreboot tables
pub fn build_hobs_from_bootloader<M, P, S>(
    mem: &M,
    ports: &P,
    coreboot: &CorebootInfo,
    sink: &mut S,
) -> Result<PlatformSummary>
where
    M: PhysicalMemory,
    P: PortIo,
    S: HobSink + ?Sized,
{
    let map = coreboot.memory_map.as_slice();

    log::info!("Guessing Top of Lower Usable DRAM:");
    let tolud = memmap::estimate_tolud(map);
    log::info!("Assuming TOLUD = {}", tolud);

    log::info!("Building resource descriptors for usable memory:");
    for descriptor in memmap::classify_usable(map) {
        hob::publish(sink, &descriptor)?;
    }

    match coreboot.framebuffer.as_ref() {
        Some(fb) => match GraphicsInfo::from_framebuffer(fb) {
            Some(graphics) => graphics.publish(sink)?,
            None => log::warn!("Framebuffer at {:#x} is unusable", fb.physical_address),
        },
        None => log::debug!("No framebuffer"),
    }

    let (system_tables, rsdp) = SystemTableInfo::discover(mem, coreboot)?;
    system_tables.publish(sink)?;

    let board_info = acpi::parse_acpi_info(mem, &rsdp, ports)?;
    sink.guid_hob(&guids::ACPI_BOARD_INFO, &board_info.to_bytes())?;
    log::debug!("Created ACPI board info HOB");

    log::info!("Building resource descriptors for reserved memory:");
    for descriptor in memmap::classify_reserved(map, tolud, board_info.pcie_base_address) {
        hob::publish(sink, &descriptor)?;
    }

    Ok(PlatformSummary {
        tolud,
        system_tables,
        board_info,
    })
}

/// Build the HOBs that do not depend on the bootloader: the payload image
/// allocation, the CPU HOB and the I/O APIC window
pub fn build_generic_hobs<S: HobSink + ?Sized>(
    config: &PayloadConfig,
    physical_address_bits: u8,
    sink: &mut S,
) -> hob::Result<()> {
    sink.memory_allocation(
        config.payload_fd_base,
        config.payload_fd_size,
        efi::BOOT_SERVICES_DATA,
    )?;

    sink.cpu(physical_address_bits, IO_SPACE_BITS)?;

    sink.resource_descriptor(
        ResourceKind::MemoryMappedIo,
        ResourceAttributes::MMIO,
        config.ioapic_base,
        config.ioapic_size,
    )?;
    sink.memory_allocation(
        config.ioapic_base,
        config.ioapic_size,
        efi::MEMORY_MAPPED_IO,
    )?;

    Ok(())
}
