//! Framebuffer information from coreboot
//!
//! Coreboot reports the linear framebuffer it set up (or the one the VBIOS or
//! GOP driver left behind) in a `CB_TAG_FRAMEBUFFER` record. The payload never
//! draws to it; it only describes it to the next stage.

/// Framebuffer information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramebufferInfo {
    /// Physical address of the framebuffer
    pub physical_address: u64,
    /// Horizontal resolution in pixels
    pub x_resolution: u32,
    /// Vertical resolution in pixels
    pub y_resolution: u32,
    /// Bytes per scanline
    pub bytes_per_line: u32,
    /// Bits per pixel
    pub bits_per_pixel: u8,
    pub red_mask_pos: u8,
    pub red_mask_size: u8,
    pub green_mask_pos: u8,
    pub green_mask_size: u8,
    pub blue_mask_pos: u8,
    pub blue_mask_size: u8,
    pub reserved_mask_pos: u8,
    pub reserved_mask_size: u8,
}

impl FramebufferInfo {
    /// Size of the framebuffer in bytes
    pub fn size(&self) -> u64 {
        u64::from(self.bytes_per_line) * u64::from(self.y_resolution)
    }

    /// Pixels per scanline, which exceeds `x_resolution` on padded modes
    pub fn pixels_per_scan_line(&self) -> u32 {
        match self.bits_per_pixel {
            0 => 0,
            bpp => (self.bytes_per_line << 3) / u32::from(bpp),
        }
    }
}
