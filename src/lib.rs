//! crab-payload - a coreboot payload that describes the platform as PI HOBs
//!
//! Coreboot hands the payload its tables: a memory map, the serial console,
//! and CBMEM areas holding the ACPI and SMBIOS tables. This crate turns them
//! into a PHIT-headed HOB list for the next boot stage:
//!
//! - the memory map, classified into usable RAM, reserved DRAM and MMIO
//! - the framebuffer coreboot set up
//! - the location of the ACPI and SMBIOS tables
//! - the ACPI board information (power management blocks, reset register,
//!   PCIe ECAM window, TPM presence)
//! - the payload image, CPU and I/O APIC HOBs

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate alloc;

pub mod acpi;
pub mod arch;
pub mod config;
pub mod coreboot;
pub mod drivers;
pub mod graphics;
pub mod handoff;
pub mod hob;
pub mod logger;
pub mod memmap;
pub mod phys;
pub mod system_tables;

use crate::arch::x86_64::{self as cpu, io::HardwarePorts};
use crate::config::PayloadConfig;
use crate::coreboot::{CorebootInfo, TableError, tables};
use crate::handoff::PayloadError;
use crate::hob::HobList;
use crate::phys::{IdentityMapped, PhysicalMemory};

/// coreboot serial record type of an I/O port UART
const CB_SERIAL_TYPE_IO_MAPPED: u32 = 1;

/// Global panic handler
#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    if let Some(location) = info.location() {
        log::error!(
            "PANIC at {}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        log::error!("PANIC: {}", info.message());
    }

    cpu::halt_loop()
}

/// Payload main, called from the entry stub with the coreboot table pointer
///
/// Builds the HOB list in the window above the payload image, logs it and
/// halts. Errors are logged; the machine halts either way.
pub fn init(coreboot_table_ptr: u64) -> ! {
    let config = PayloadConfig::DEFAULT;

    // SAFETY: coreboot enters payloads with physical memory identity mapped,
    // and the port reads are limited to FADT-described PM registers.
    let (mem, ports) = unsafe { (IdentityMapped::new(), HardwarePorts::new()) };

    let coreboot = tables::parse(&mem, coreboot_table_ptr);

    init_console(&config, coreboot.as_ref().ok());
    log::info!("crab-payload {} starting", env!("CARGO_PKG_VERSION"));

    match build_hob_list(&mem, &ports, coreboot, &config) {
        Ok(address) => log::info!("HOB list complete at {:#x}", address),
        Err(err) => log::error!("Failed to build the HOB list: {}", err),
    }

    // SAFETY: interrupts are never enabled by this payload.
    unsafe { cpu::mask_legacy_pic() };

    log::info!("Halting");
    cpu::halt_loop()
}

/// Bring up the serial console and the logger
fn init_console(config: &PayloadConfig, coreboot: Option<&CorebootInfo>) {
    let (port, baud) = match coreboot.and_then(|info| info.serial) {
        Some(serial) if serial.serial_type == CB_SERIAL_TYPE_IO_MAPPED => {
            (serial.baseaddr as u16, serial.baud)
        }
        _ => (config.fallback_serial_port, config.fallback_baud),
    };

    drivers::serial::init(port, baud);
    let _ = logger::init(config.log_level);
}

fn build_hob_list<M: PhysicalMemory>(
    mem: &M,
    ports: &HardwarePorts,
    coreboot: Result<CorebootInfo, TableError>,
    config: &PayloadConfig,
) -> Result<u64, PayloadError> {
    let coreboot = coreboot?;
    if let Some(version) = &coreboot.version {
        log::info!("coreboot version {}", version);
    }
    log::info!(
        "{} memory map entries, {} MiB usable RAM",
        coreboot.memory_map.len(),
        crate::coreboot::memory::total_usable_ram(&coreboot.memory_map) >> 20
    );

    let hob_base = config.hob_base();
    // SAFETY: the HOB window sits in RAM right above the payload image, which
    // coreboot leaves to the payload and nothing else references.
    let window = unsafe {
        core::slice::from_raw_parts_mut(hob_base as *mut u8, config.hob_window_size as usize)
    };
    let mut list = HobList::new(window, hob_base, config.payload_fd_base, config.hob_top())?;

    let summary = handoff::build_hobs_from_bootloader(mem, ports, &coreboot, &mut list)?;
    handoff::build_generic_hobs(config, cpu::physical_address_bits(), &mut list)?;

    log::info!("TOLUD {}", summary.tolud);
    for (hob_type, bytes) in list.iter() {
        log::debug!("HOB type {:#06x}, {} bytes", hob_type, bytes.len());
    }
    log::debug!(
        "HOB list end {:#x}, free memory from {:#x}",
        list.end_of_hob_list(),
        { list.phit().free_memory_bottom }
    );

    Ok(list.address())
}
