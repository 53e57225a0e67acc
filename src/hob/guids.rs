//! GUIDs of the GUID extension HOBs the payload produces

use r_efi::efi::Guid;

/// ACPI board information (`ACPI_BOARD_INFO`)
pub const ACPI_BOARD_INFO: Guid = Guid::from_fields(
    0x0ad3_d31b,
    0xb3d8,
    0x4506,
    0xae,
    0x71,
    &[0x2e, 0xf1, 0x10, 0x06, 0xd9, 0x0f],
);

/// ACPI and SMBIOS table location (`SYSTEM_TABLE_INFO`)
pub const SYSTEM_TABLE_INFO: Guid = Guid::from_fields(
    0x16c8_a6d0,
    0xfe8a,
    0x4082,
    0xa2,
    0x08,
    &[0xcf, 0x89, 0xc4, 0x29, 0x04, 0x33],
);

/// Universal payload ACPI table (RSDP pointer)
pub const UNIVERSAL_PAYLOAD_ACPI_TABLE: Guid = Guid::from_fields(
    0x9f9a_9506,
    0x5597,
    0x4515,
    0xba,
    0xb6,
    &[0x8b, 0xcd, 0xe7, 0x84, 0xba, 0x87],
);

/// Universal payload SMBIOS table (entry point pointer)
pub const UNIVERSAL_PAYLOAD_SMBIOS_TABLE: Guid = Guid::from_fields(
    0x590a_0d26,
    0x06e5,
    0x4d20,
    0x8a,
    0x82,
    &[0x59, 0xea, 0x1b, 0x34, 0x98, 0x2d],
);

/// Framebuffer description (`EFI_PEI_GRAPHICS_INFO_HOB`)
pub const GRAPHICS_INFO: Guid = Guid::from_fields(
    0x39f6_2cce,
    0x6825,
    0x4669,
    0xbb,
    0x56,
    &[0x54, 0x1a, 0xba, 0x75, 0x3a, 0x07],
);
