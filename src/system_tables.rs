//! ACPI and SMBIOS table location
//!
//! Coreboot leaves the ACPI and SMBIOS tables in CBMEM. The location of both
//! is handed to the next stage three times over: in the `SYSTEM_TABLE_INFO`
//! GUID HOB and in the universal payload ACPI and SMBIOS table HOBs.

use crate::acpi::{self, AcpiError, Rsdp};
use crate::coreboot::CorebootInfo;
use crate::coreboot::tables::cbmem_id;
use crate::hob::{self, HobSink, guids};
use crate::phys::PhysicalMemory;
use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// Revision of the universal payload table HOBs
const UNIVERSAL_PAYLOAD_TABLE_REVISION: u8 = 1;

/// Location of the ACPI and SMBIOS tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemTableInfo {
    /// Address of the RSDP
    pub acpi_table_base: u64,
    pub acpi_table_size: u32,
    /// Address of the SMBIOS entry point (0 if absent)
    pub smbios_table_base: u64,
    pub smbios_table_size: u32,
}

#[repr(C)]
#[derive(IntoBytes, Immutable, KnownLayout)]
struct RawSystemTableInfo {
    acpi_table_base: u64,
    acpi_table_size: u32,
    padding0: u32,
    smbios_table_base: u64,
    smbios_table_size: u32,
    padding1: u32,
}

/// Universal payload table HOB data: generic header plus the table pointer
#[repr(C)]
#[derive(IntoBytes, Immutable, KnownLayout)]
struct RawUniversalPayloadTable {
    revision: u8,
    reserved: u8,
    length: u16,
    padding: u32,
    table: u64,
}

impl SystemTableInfo {
    /// Find and validate the RSDP and the SMBIOS entry point
    ///
    /// Returns the table info together with the parsed RSDP, which the ACPI
    /// walk starts from.
    pub fn discover<M: PhysicalMemory>(
        mem: &M,
        coreboot: &CorebootInfo,
    ) -> acpi::Result<(SystemTableInfo, Rsdp)> {
        let rsdp_address = coreboot
            .acpi_rsdp
            .or_else(|| coreboot.cbmem_entry(cbmem_id::ACPI).map(|e| e.address))
            .ok_or(AcpiError::NoRsdp)?;

        let rsdp = Rsdp::parse(mem, rsdp_address)?;

        let (smbios_table_base, smbios_table_size) = coreboot
            .cbmem_entry(cbmem_id::SMBIOS)
            .map(|e| (e.address, e.size))
            .unwrap_or((0, 0));

        let info = SystemTableInfo {
            acpi_table_base: rsdp.address,
            acpi_table_size: rsdp.length,
            smbios_table_base,
            smbios_table_size,
        };

        log::info!(
            "Detected Acpi Table at {:#x}, length {:#x}",
            info.acpi_table_base,
            info.acpi_table_size
        );
        log::info!(
            "Detected Smbios Table at {:#x}, length {:#x}",
            info.smbios_table_base,
            info.smbios_table_size
        );

        Ok((info, rsdp))
    }

    /// Encode as the `SYSTEM_TABLE_INFO` HOB payload
    pub fn to_bytes(&self) -> [u8; 32] {
        let raw = RawSystemTableInfo {
            acpi_table_base: self.acpi_table_base,
            acpi_table_size: self.acpi_table_size,
            padding0: 0,
            smbios_table_base: self.smbios_table_base,
            smbios_table_size: self.smbios_table_size,
            padding1: 0,
        };
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(raw.as_bytes());
        bytes
    }

    /// Publish the system table info, SMBIOS table and ACPI table HOBs
    pub fn publish<S: HobSink + ?Sized>(&self, sink: &mut S) -> hob::Result<()> {
        sink.guid_hob(&guids::SYSTEM_TABLE_INFO, &self.to_bytes())?;
        sink.guid_hob(
            &guids::UNIVERSAL_PAYLOAD_SMBIOS_TABLE,
            &universal_payload_table(self.smbios_table_base),
        )?;
        log::debug!("Created SMBIOS table HOB");
        sink.guid_hob(
            &guids::UNIVERSAL_PAYLOAD_ACPI_TABLE,
            &universal_payload_table(self.acpi_table_base),
        )?;
        log::debug!("Created ACPI table HOB");
        Ok(())
    }
}

fn universal_payload_table(table: u64) -> [u8; 16] {
    let raw = RawUniversalPayloadTable {
        revision: UNIVERSAL_PAYLOAD_TABLE_REVISION,
        reserved: 0,
        length: core::mem::size_of::<RawUniversalPayloadTable>() as u16,
        padding: 0,
        table,
    };
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(raw.as_bytes());
    bytes
}
