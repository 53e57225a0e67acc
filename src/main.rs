//! crab-payload - binary entry point

#![cfg_attr(target_os = "none", no_std, no_main)]

/// Rust entry point, called by the entry stub in 64-bit mode
///
/// # Arguments
///
/// * `coreboot_table_ptr` - Pointer to the coreboot tables (passed in RDI)
#[cfg(target_os = "none")]
#[unsafe(no_mangle)]
pub extern "C" fn rust_main(coreboot_table_ptr: u64) -> ! {
    crab_payload::init(coreboot_table_ptr)
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("crab-payload is a coreboot payload; build it for a bare-metal x86_64 target");
    std::process::exit(1);
}
