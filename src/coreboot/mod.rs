//! Coreboot table parsing
//!
//! This module parses the coreboot tables to extract what the payload needs
//! to describe the platform: the memory map, the serial port, the framebuffer,
//! the ACPI RSDP and the CBMEM areas holding the ACPI and SMBIOS tables.

pub mod framebuffer;
pub mod memory;
pub mod tables;

pub use framebuffer::FramebufferInfo;
pub use memory::{MemoryRegion, MemoryType};
pub use tables::{CbmemEntry, CorebootInfo, SerialInfo, TableError};
