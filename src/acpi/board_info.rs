//! ACPI board information handed to the next boot stage
//!
//! The RSDT and the XSDT are walked in that order. Each walk keeps the first
//! FADT and MCFG it sees; the XSDT results then override the RSDT results
//! field by field, so a platform listing a table in both picks the 64-bit
//! pointer.

use super::fadt::Fadt;
use super::mcfg::EcamWindow;
use super::{AcpiError, Result, Rsdp, SDT_HEADER_SIZE, SdtHeader, signature};
use crate::arch::x86_64::io::PortIo;
use crate::phys::{MemoryError, PhysicalMemory};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// Board configuration extracted from the FADT, MCFG and TPM tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcpiBoardInfo {
    pub pm_ctrl_reg_base: u64,
    pub pm_timer_reg_base: u64,
    pub reset_reg_address: u64,
    pub reset_value: u8,
    pub pm_evt_base: u64,
    pub pm_gpe_en_base: u64,
    /// Base of the PCIe ECAM window (0 without an MCFG)
    pub pcie_base_address: u64,
    pub pcie_base_size: u64,
    pub tpm12_present: bool,
    pub tpm20_present: bool,
}

/// GUID HOB payload layout of [`AcpiBoardInfo`]
#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
struct RawAcpiBoardInfo {
    revision: u8,
    reserved0: [u8; 2],
    reset_value: u8,
    reserved1: [u8; 4],
    pm_evt_base: u64,
    pm_gpe_en_base: u64,
    pm_ctrl_reg_base: u64,
    pm_timer_reg_base: u64,
    reset_reg_address: u64,
    pcie_base_address: u64,
    pcie_base_size: u64,
    tpm20_present: u8,
    tpm12_present: u8,
    reserved2: [u8; 6],
}

/// Size of the board info GUID HOB payload
pub const ACPI_BOARD_INFO_SIZE: usize = core::mem::size_of::<RawAcpiBoardInfo>();

impl AcpiBoardInfo {
    /// Encode as the GUID HOB payload
    pub fn to_bytes(&self) -> [u8; ACPI_BOARD_INFO_SIZE] {
        let raw = RawAcpiBoardInfo {
            revision: 0,
            reserved0: [0; 2],
            reset_value: self.reset_value,
            reserved1: [0; 4],
            pm_evt_base: self.pm_evt_base,
            pm_gpe_en_base: self.pm_gpe_en_base,
            pm_ctrl_reg_base: self.pm_ctrl_reg_base,
            pm_timer_reg_base: self.pm_timer_reg_base,
            reset_reg_address: self.reset_reg_address,
            pcie_base_address: self.pcie_base_address,
            pcie_base_size: self.pcie_base_size,
            tpm20_present: u8::from(self.tpm20_present),
            tpm12_present: u8::from(self.tpm12_present),
            reserved2: [0; 6],
        };

        let mut bytes = [0u8; ACPI_BOARD_INFO_SIZE];
        bytes.copy_from_slice(raw.as_bytes());
        bytes
    }

    fn log(&self) {
        log::info!("PmCtrl  Reg {:#x}", self.pm_ctrl_reg_base);
        log::info!("PmTimer Reg {:#x}", self.pm_timer_reg_base);
        log::info!("Reset   Reg {:#x}", self.reset_reg_address);
        log::info!("Reset   Value {:#x}", self.reset_value);
        log::info!("PmEvt   Reg {:#x}", self.pm_evt_base);
        log::info!("PmGpeEn Reg {:#x}", self.pm_gpe_en_base);
        log::info!("PcieBaseAddr {:#x}", self.pcie_base_address);
        log::info!("PcieBaseSize {:#x}", self.pcie_base_size);
        log::info!("TPM 2.0 present {}", self.tpm20_present);
        log::info!("TPM 1.2 present {}", self.tpm12_present);
    }
}

/// Tables of interest found by walking one root table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TableScan {
    fadt: Option<u64>,
    mcfg: Option<u64>,
    tpm2: bool,
    tcpa: bool,
}

impl TableScan {
    fn record(&mut self, signature: [u8; 4], address: u64) {
        match signature {
            signature::FADT if self.fadt.is_none() => self.fadt = Some(address),
            signature::MCFG if self.mcfg.is_none() => self.mcfg = Some(address),
            signature::TPM2 => self.tpm2 = true,
            signature::TCPA => self.tcpa = true,
            _ => {}
        }
    }

    /// Combine with a later scan whose hits take precedence
    fn merge(self, newer: TableScan) -> TableScan {
        TableScan {
            fadt: newer.fadt.or(self.fadt),
            mcfg: newer.mcfg.or(self.mcfg),
            tpm2: self.tpm2 || newer.tpm2,
            tcpa: self.tcpa || newer.tcpa,
        }
    }
}

/// Walk the entries of an RSDT (`entry_width` 4) or XSDT (`entry_width` 8)
fn scan_root_table<M: PhysicalMemory>(
    mem: &M,
    address: u64,
    entry_width: usize,
) -> Result<TableScan> {
    let mut scan = TableScan::default();

    let header: SdtHeader = mem.read_struct(address)?;
    let length = header.length as usize;
    let count = length.saturating_sub(SDT_HEADER_SIZE) / entry_width;
    log::debug!(
        "{} at {:#x}: {} entries",
        core::str::from_utf8(&header.signature).unwrap_or("????"),
        address,
        count
    );

    for index in 0..count {
        let offset = (SDT_HEADER_SIZE + index * entry_width) as u64;
        let offset = address
            .checked_add(offset)
            .ok_or(MemoryError::Overflow {
                address,
                length,
            })?;
        let entry = if entry_width == 8 {
            mem.read_u64(offset)?
        } else {
            u64::from(mem.read_u32(offset)?)
        };
        if entry == 0 {
            continue;
        }

        let table: SdtHeader = mem.read_struct(entry)?;
        scan.record(table.signature, entry);
    }

    Ok(scan)
}

/// Locate the FADT, MCFG and TPM tables below `rsdp` and extract the board
/// configuration
///
/// Also runs the SCI enable diagnostic against the PM1a control register.
pub fn parse_acpi_info<M: PhysicalMemory, P: PortIo>(
    mem: &M,
    rsdp: &Rsdp,
    ports: &P,
) -> Result<AcpiBoardInfo> {
    let mut scan = TableScan::default();

    if rsdp.rsdt_address != 0 {
        scan = scan.merge(scan_root_table(mem, u64::from(rsdp.rsdt_address), 4)?);
    }
    if rsdp.xsdt_address != 0 {
        scan = scan.merge(scan_root_table(mem, rsdp.xsdt_address, 8)?);
    }

    let fadt_address = scan.fadt.ok_or(AcpiError::FadtNotFound)?;
    log::debug!("FADT at {:#x}", fadt_address);
    let fadt = Fadt::read(mem, fadt_address)?;
    fadt.warn_missing_blocks();

    let mut info = AcpiBoardInfo {
        pm_ctrl_reg_base: u64::from(fadt.pm1a_cnt_blk),
        pm_timer_reg_base: u64::from(fadt.pm_tmr_blk),
        reset_reg_address: fadt.reset_reg_address,
        reset_value: fadt.reset_value,
        pm_evt_base: u64::from(fadt.pm1a_evt_blk),
        pm_gpe_en_base: u64::from(fadt.gpe0_enable_blk()),
        tpm12_present: scan.tcpa,
        tpm20_present: scan.tpm2,
        ..AcpiBoardInfo::default()
    };

    if let Some(mcfg_address) = scan.mcfg {
        if let Some(window) = EcamWindow::read(mem, mcfg_address)? {
            info.pcie_base_address = window.base;
            info.pcie_base_size = window.size();
        }
    }

    info.log();
    fadt.check_sci_consistency(ports);

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acpi::fadt::fake_ports::FakePorts;
    use crate::acpi::testing::{self, FadtBuilder};
    use crate::phys::fake::FakeMemory;

    const RSDP: u64 = 0xf0000;
    const RSDT: u64 = 0x7fff0000;
    const XSDT: u64 = 0x7fff1000;
    const FADT: u64 = 0x7fff2000;
    const MCFG: u64 = 0x7fff3000;
    const TPM2: u64 = 0x7fff4000;
    const TCPA: u64 = 0x7fff5000;

    fn platform(rsdt: &[u32], xsdt: &[u64]) -> FakeMemory {
        let mut mem = FakeMemory::new();
        let xsdt_address = if xsdt.is_empty() { 0 } else { XSDT };
        mem.place(RSDP, &testing::rsdp(RSDT as u32, xsdt_address));
        mem.place(RSDT, &testing::rsdt(rsdt));
        if !xsdt.is_empty() {
            mem.place(XSDT, &testing::xsdt(xsdt));
        }
        mem.place(FADT, &FadtBuilder::default().build());
        mem.place(MCFG, &testing::mcfg(0xe000_0000, 0, 0, 0x3f));
        mem.place(TPM2, &testing::table(b"TPM2", 4, &[0; 16]));
        mem.place(TCPA, &testing::table(b"TCPA", 2, &[0; 16]));
        mem
    }

    #[test]
    fn test_fadt_and_mcfg() {
        let mem = platform(&[FADT as u32, MCFG as u32], &[]);
        let rsdp = Rsdp::parse(&mem, RSDP).unwrap();

        let info = parse_acpi_info(&mem, &rsdp, &FakePorts::new(1)).unwrap();
        assert_eq!(info.pm_ctrl_reg_base, 0x1804);
        assert_eq!(info.pm_timer_reg_base, 0x1808);
        assert_eq!(info.pm_evt_base, 0x1800);
        assert_eq!(info.pm_gpe_en_base, 0x1828);
        assert_eq!(info.reset_reg_address, 0xcf9);
        assert_eq!(info.reset_value, 6);
        assert_eq!(info.pcie_base_address, 0xe000_0000);
        assert_eq!(info.pcie_base_size, 0x40 * 0x100000);
        assert!(!info.tpm12_present);
        assert!(!info.tpm20_present);
    }

    #[test]
    fn test_xsdt_overrides_rsdt() {
        let mut mem = platform(&[FADT as u32], &[0, 0x7fff6000]);
        let fresh = FadtBuilder {
            pm1a_cnt_blk: 0x404,
            ..FadtBuilder::default()
        };
        mem.place(0x7fff6000, &fresh.build());
        let rsdp = Rsdp::parse(&mem, RSDP).unwrap();

        let info = parse_acpi_info(&mem, &rsdp, &FakePorts::new(1)).unwrap();
        assert_eq!(info.pm_ctrl_reg_base, 0x404);
    }

    #[test]
    fn test_first_fadt_within_walk_wins() {
        let mut mem = platform(&[FADT as u32, 0x7fff6000], &[]);
        let second = FadtBuilder {
            pm_tmr_blk: 0x408,
            ..FadtBuilder::default()
        };
        mem.place(0x7fff6000, &second.build());
        let rsdp = Rsdp::parse(&mem, RSDP).unwrap();

        let info = parse_acpi_info(&mem, &rsdp, &FakePorts::new(1)).unwrap();
        assert_eq!(info.pm_timer_reg_base, 0x1808);
    }

    #[test]
    fn test_missing_fadt() {
        let mem = platform(&[MCFG as u32], &[MCFG]);
        let rsdp = Rsdp::parse(&mem, RSDP).unwrap();

        let result = parse_acpi_info(&mem, &rsdp, &FakePorts::new(1));
        assert_eq!(result, Err(AcpiError::FadtNotFound));
    }

    #[test]
    fn test_tpm_presence_and_missing_mcfg() {
        let mem = platform(&[FADT as u32, TCPA as u32], &[FADT, TPM2]);
        let rsdp = Rsdp::parse(&mem, RSDP).unwrap();

        let info = parse_acpi_info(&mem, &rsdp, &FakePorts::new(0)).unwrap();
        assert!(info.tpm12_present);
        assert!(info.tpm20_present);
        assert_eq!(info.pcie_base_address, 0);
        assert_eq!(info.pcie_base_size, 0);
    }

    #[test]
    fn test_mcfg_without_allocation_is_not_fatal() {
        let mut mem = platform(&[FADT as u32, MCFG as u32], &[]);
        mem.place(MCFG, &testing::table(b"MCFG", 1, &[0; 8]));
        let rsdp = Rsdp::parse(&mem, RSDP).unwrap();

        let info = parse_acpi_info(&mem, &rsdp, &FakePorts::new(1)).unwrap();
        assert_eq!(info.pm_ctrl_reg_base, 0x1804);
        assert_eq!(info.pcie_base_address, 0);
        assert_eq!(info.pcie_base_size, 0);
    }

    #[test]
    fn test_root_table_wrapping_address_space() {
        // A 36-byte header at the very top whose length announces entries
        let top = u64::MAX - SDT_HEADER_SIZE as u64;
        let mut xsdt = testing::xsdt(&[FADT, MCFG]);
        xsdt.truncate(SDT_HEADER_SIZE);
        let mut mem = FakeMemory::new();
        mem.place(top, &xsdt);

        assert!(matches!(
            scan_root_table(&mem, top, 8),
            Err(AcpiError::BadAddress(MemoryError::Overflow { .. }))
        ));
    }

    #[test]
    fn test_board_info_encoding() {
        let info = AcpiBoardInfo {
            pm_ctrl_reg_base: 0x1804,
            reset_value: 6,
            pcie_base_address: 0xe000_0000,
            tpm20_present: true,
            ..AcpiBoardInfo::default()
        };

        let bytes = info.to_bytes();
        assert_eq!(bytes.len(), 72);
        assert_eq!(bytes[3], 6);
        assert_eq!(&bytes[24..32], &0x1804u64.to_le_bytes());
        assert_eq!(&bytes[48..56], &0xe000_0000u64.to_le_bytes());
        assert_eq!(bytes[64], 1);
        assert_eq!(bytes[65], 0);
    }
}
