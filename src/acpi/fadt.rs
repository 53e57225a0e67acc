//! Fixed ACPI Description Table

use super::{Result, SdtHeader};
use crate::arch::x86_64::io::PortIo;
use crate::phys::PhysicalMemory;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

/// FADT flag: hardware-reduced ACPI (no fixed hardware, no SCI_EN)
pub const HW_REDUCED_ACPI: u32 = 1 << 20;

/// PM1 control: SCI_EN
const PM1_CNT_SCI_EN: u32 = 1 << 0;

/// Generic Address Structure
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct GenericAddress {
    address_space_id: u8,
    register_bit_width: u8,
    register_bit_offset: u8,
    access_size: u8,
    address: u64,
}

/// ACPI FADT (Fixed ACPI Description Table), up to the reset value
///
/// Later fields (X_ blocks, hypervisor id, ...) are not needed here. Older
/// FADTs end before `reset_reg`; bytes past the table length read as zero.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct RawFadt {
    header: SdtHeader,
    firmware_ctrl: u32,
    dsdt: u32,
    reserved1: u8,
    preferred_pm_profile: u8,
    sci_int: u16,
    smi_cmd: u32,
    acpi_enable: u8,
    acpi_disable: u8,
    s4bios_req: u8,
    pstate_cnt: u8,
    pm1a_evt_blk: u32,
    pm1b_evt_blk: u32,
    pm1a_cnt_blk: u32,
    pm1b_cnt_blk: u32,
    pm2_cnt_blk: u32,
    pm_tmr_blk: u32,
    gpe0_blk: u32,
    gpe1_blk: u32,
    pm1_evt_len: u8,
    pm1_cnt_len: u8,
    pm2_cnt_len: u8,
    pm_tmr_len: u8,
    gpe0_blk_len: u8,
    gpe1_blk_len: u8,
    gpe1_base: u8,
    cst_cnt: u8,
    p_lvl2_lat: u16,
    p_lvl3_lat: u16,
    flush_size: u16,
    flush_stride: u16,
    duty_offset: u8,
    duty_width: u8,
    day_alrm: u8,
    mon_alrm: u8,
    century: u8,
    iapc_boot_arch: u16,
    reserved2: u8,
    flags: u32,
    reset_reg: GenericAddress,
    reset_value: u8,
}

const FADT_PREFIX_SIZE: usize = core::mem::size_of::<RawFadt>();

/// The FADT fields the payload consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fadt {
    pub smi_cmd: u32,
    pub pm1a_evt_blk: u32,
    pub pm1a_cnt_blk: u32,
    pub pm_tmr_blk: u32,
    pub gpe0_blk: u32,
    pub pm1_cnt_len: u8,
    pub gpe0_blk_len: u8,
    pub flags: u32,
    pub reset_reg_address: u64,
    pub reset_value: u8,
}

impl Fadt {
    /// Read the FADT at `address`
    pub fn read<M: PhysicalMemory>(mem: &M, address: u64) -> Result<Self> {
        let header: SdtHeader = mem.read_struct(address)?;
        let length = (header.length as usize).min(FADT_PREFIX_SIZE);

        let mut raw = RawFadt::new_zeroed();
        mem.read(address, &mut raw.as_mut_bytes()[..length])?;

        Ok(Fadt {
            smi_cmd: raw.smi_cmd,
            pm1a_evt_blk: raw.pm1a_evt_blk,
            pm1a_cnt_blk: raw.pm1a_cnt_blk,
            pm_tmr_blk: raw.pm_tmr_blk,
            gpe0_blk: raw.gpe0_blk,
            pm1_cnt_len: raw.pm1_cnt_len,
            gpe0_blk_len: raw.gpe0_blk_len,
            flags: raw.flags,
            reset_reg_address: raw.reset_reg.address,
            reset_value: raw.reset_value,
        })
    }

    /// GPE0 enable register block
    ///
    /// GPE0_BLK holds the status registers in its first half and the enable
    /// registers in its second half.
    pub fn gpe0_enable_blk(&self) -> u32 {
        self.gpe0_blk.wrapping_add(u32::from(self.gpe0_blk_len) / 2)
    }

    pub fn is_hardware_reduced(&self) -> bool {
        self.flags & HW_REDUCED_ACPI != 0
    }

    /// Log zero-valued register blocks the next stage relies on
    pub fn warn_missing_blocks(&self) {
        let blocks = [
            ("PM1a control", u64::from(self.pm1a_cnt_blk)),
            ("PM timer", u64::from(self.pm_tmr_blk)),
            ("reset register", self.reset_reg_address),
            ("PM1a event", u64::from(self.pm1a_evt_blk)),
            ("GPE0", u64::from(self.gpe0_blk)),
        ];
        for (name, value) in blocks {
            if value == 0 {
                log::warn!("FADT: {} block is zero", name);
            }
        }
    }

    /// Check that ACPI mode is either already enabled or can be enabled
    ///
    /// On non-hardware-reduced platforms the OS needs either SCI_EN set in
    /// PM1a control or an SMI command port to switch it on. Returns `false`
    /// and logs an error when neither holds; this is advisory only.
    pub fn check_sci_consistency<P: PortIo>(&self, ports: &P) -> bool {
        if self.is_hardware_reduced() || self.smi_cmd != 0 {
            return true;
        }

        let port = self.pm1a_cnt_blk as u16;
        let pm1_cnt = if self.pm1_cnt_len == 4 {
            ports.read32(port)
        } else {
            // 2 is the only other valid length; anything else falls back to 16 bits
            u32::from(ports.read16(port))
        };

        if pm1_cnt & PM1_CNT_SCI_EN == 0 {
            log::error!(
                "The ACPI enabling status is inconsistent: SCI is not enabled but the ACPI \
                 table does not provide a means to enable it through FADT->SmiCmd. \
                 This may cause issues in OS."
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod fake_ports {
    use crate::arch::x86_64::io::PortIo;
    use core::cell::Cell;

    /// Port space returning a fixed value, recording the last access width
    pub struct FakePorts {
        pub value: u32,
        pub last_width: Cell<u8>,
    }

    impl FakePorts {
        pub fn new(value: u32) -> Self {
            FakePorts {
                value,
                last_width: Cell::new(0),
            }
        }
    }

    impl PortIo for FakePorts {
        fn read16(&self, _port: u16) -> u16 {
            self.last_width.set(16);
            self.value as u16
        }

        fn read32(&self, _port: u16) -> u32 {
            self.last_width.set(32);
            self.value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake_ports::FakePorts;
    use super::*;
    use crate::acpi::testing::FadtBuilder;
    use crate::phys::fake::FakeMemory;

    #[test]
    fn test_read_fields() {
        let mut mem = FakeMemory::new();
        mem.place(0x7fff2000, &FadtBuilder::default().build());

        let fadt = Fadt::read(&mem, 0x7fff2000).unwrap();
        assert_eq!(fadt.pm1a_evt_blk, 0x1800);
        assert_eq!(fadt.pm1a_cnt_blk, 0x1804);
        assert_eq!(fadt.pm_tmr_blk, 0x1808);
        assert_eq!(fadt.reset_reg_address, 0xcf9);
        assert_eq!(fadt.reset_value, 0x06);
        assert_eq!(fadt.gpe0_enable_blk(), 0x1828);
    }

    #[test]
    fn test_short_fadt_reads_zero_reset_register() {
        let mut bytes = FadtBuilder::default().build();
        bytes.truncate(116);
        bytes[4..8].copy_from_slice(&116u32.to_le_bytes());
        let mut mem = FakeMemory::new();
        mem.place(0x7fff2000, &bytes);

        let fadt = Fadt::read(&mem, 0x7fff2000).unwrap();
        assert_eq!(fadt.pm_tmr_blk, 0x1808);
        assert_eq!(fadt.reset_reg_address, 0);
        assert_eq!(fadt.reset_value, 0);
    }

    #[test]
    fn test_sci_consistency() {
        let no_smi = Fadt {
            smi_cmd: 0,
            pm1a_cnt_blk: 0x1804,
            pm1_cnt_len: 2,
            ..Fadt::default()
        };
        assert!(!no_smi.check_sci_consistency(&FakePorts::new(0)));
        assert!(no_smi.check_sci_consistency(&FakePorts::new(1)));

        let wide = Fadt {
            pm1_cnt_len: 4,
            ..no_smi
        };
        let ports = FakePorts::new(1);
        assert!(wide.check_sci_consistency(&ports));
        assert_eq!(ports.last_width.get(), 32);

        let reduced = Fadt {
            flags: HW_REDUCED_ACPI,
            ..no_smi
        };
        let ports = FakePorts::new(0);
        assert!(reduced.check_sci_consistency(&ports));
        assert_eq!(ports.last_width.get(), 0);

        let with_smi = Fadt {
            smi_cmd: 0xb2,
            ..no_smi
        };
        assert!(with_smi.check_sci_consistency(&FakePorts::new(0)));
    }
}
