//! Graphics information HOB
//!
//! Describes the coreboot framebuffer as an `EFI_PEI_GRAPHICS_INFO_HOB` so the
//! next stage can bring up a GOP on it without a video driver.

use crate::coreboot::FramebufferInfo;
use crate::hob::{self, HobSink, guids};
use r_efi::protocols::graphics_output::{
    GraphicsPixelFormat, PIXEL_BIT_MASK, PIXEL_BLUE_GREEN_RED_RESERVED_8_BIT_PER_COLOR,
    PIXEL_RED_GREEN_BLUE_RESERVED_8_BIT_PER_COLOR,
};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// Size of the graphics info HOB payload
pub const GRAPHICS_INFO_SIZE: usize = core::mem::size_of::<RawGraphicsInfo>();

/// `EFI_GRAPHICS_OUTPUT_MODE_INFORMATION`
#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
struct RawModeInformation {
    version: u32,
    horizontal_resolution: u32,
    vertical_resolution: u32,
    pixel_format: u32,
    red_mask: u32,
    green_mask: u32,
    blue_mask: u32,
    reserved_mask: u32,
    pixels_per_scan_line: u32,
}

/// `EFI_PEI_GRAPHICS_INFO_HOB`
#[repr(C)]
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout)]
struct RawGraphicsInfo {
    frame_buffer_base: u64,
    frame_buffer_size: u32,
    mode: RawModeInformation,
}

/// Framebuffer mode handed to the next stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsInfo {
    pub frame_buffer_base: u64,
    pub frame_buffer_size: u32,
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
    pub pixel_format: GraphicsPixelFormat,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub reserved_mask: u32,
    pub pixels_per_scan_line: u32,
}

/// Bit mask of `size` bits starting at bit `pos`
fn channel_mask(pos: u8, size: u8) -> u32 {
    let bits = if size >= 32 {
        u32::MAX
    } else {
        (1u32 << size) - 1
    };
    bits.checked_shl(u32::from(pos)).unwrap_or(0)
}

impl GraphicsInfo {
    /// Describe a coreboot framebuffer
    ///
    /// Framebuffers at address 0 or without a pixel depth are not usable.
    pub fn from_framebuffer(fb: &FramebufferInfo) -> Option<Self> {
        if fb.physical_address == 0 || fb.bits_per_pixel == 0 {
            return None;
        }

        let pixel_format = match (fb.red_mask_pos, fb.green_mask_pos, fb.blue_mask_pos) {
            (0, 8, 16) => PIXEL_RED_GREEN_BLUE_RESERVED_8_BIT_PER_COLOR,
            (16, 8, 0) => PIXEL_BLUE_GREEN_RED_RESERVED_8_BIT_PER_COLOR,
            _ => PIXEL_BIT_MASK,
        };

        Some(GraphicsInfo {
            frame_buffer_base: fb.physical_address,
            frame_buffer_size: u32::try_from(fb.size()).unwrap_or(u32::MAX),
            horizontal_resolution: fb.x_resolution,
            vertical_resolution: fb.y_resolution,
            pixel_format,
            red_mask: channel_mask(fb.red_mask_pos, fb.red_mask_size),
            green_mask: channel_mask(fb.green_mask_pos, fb.green_mask_size),
            blue_mask: channel_mask(fb.blue_mask_pos, fb.blue_mask_size),
            reserved_mask: channel_mask(fb.reserved_mask_pos, fb.reserved_mask_size),
            pixels_per_scan_line: fb.pixels_per_scan_line(),
        })
    }

    /// Encode as the GUID HOB payload
    pub fn to_bytes(&self) -> [u8; GRAPHICS_INFO_SIZE] {
        let raw = RawGraphicsInfo {
            frame_buffer_base: self.frame_buffer_base,
            frame_buffer_size: self.frame_buffer_size,
            mode: RawModeInformation {
                version: 0,
                horizontal_resolution: self.horizontal_resolution,
                vertical_resolution: self.vertical_resolution,
                pixel_format: self.pixel_format,
                red_mask: self.red_mask,
                green_mask: self.green_mask,
                blue_mask: self.blue_mask,
                reserved_mask: self.reserved_mask,
                pixels_per_scan_line: self.pixels_per_scan_line,
            },
        };

        let mut bytes = [0u8; GRAPHICS_INFO_SIZE];
        bytes.copy_from_slice(raw.as_bytes());
        bytes
    }

    pub fn publish<S: HobSink + ?Sized>(&self, sink: &mut S) -> hob::Result<()> {
        sink.guid_hob(&guids::GRAPHICS_INFO, &self.to_bytes())?;
        log::debug!(
            "Created graphics info HOB: {}x{} @ {:#x}",
            self.horizontal_resolution,
            self.vertical_resolution,
            self.frame_buffer_base
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framebuffer(red: u8, green: u8, blue: u8) -> FramebufferInfo {
        FramebufferInfo {
            physical_address: 0xc000_0000,
            x_resolution: 1920,
            y_resolution: 1080,
            bytes_per_line: 7680,
            bits_per_pixel: 32,
            red_mask_pos: red,
            red_mask_size: 8,
            green_mask_pos: green,
            green_mask_size: 8,
            blue_mask_pos: blue,
            blue_mask_size: 8,
            reserved_mask_pos: 24,
            reserved_mask_size: 8,
        }
    }

    #[test]
    fn test_pixel_formats() {
        let bgr = GraphicsInfo::from_framebuffer(&framebuffer(16, 8, 0)).unwrap();
        assert_eq!(bgr.pixel_format, PIXEL_BLUE_GREEN_RED_RESERVED_8_BIT_PER_COLOR);
        assert_eq!(bgr.red_mask, 0x00ff_0000);
        assert_eq!(bgr.blue_mask, 0x0000_00ff);
        assert_eq!(bgr.reserved_mask, 0xff00_0000);

        let rgb = GraphicsInfo::from_framebuffer(&framebuffer(0, 8, 16)).unwrap();
        assert_eq!(rgb.pixel_format, PIXEL_RED_GREEN_BLUE_RESERVED_8_BIT_PER_COLOR);

        let packed = FramebufferInfo {
            bits_per_pixel: 16,
            bytes_per_line: 3840,
            red_mask_size: 5,
            green_mask_size: 6,
            blue_mask_size: 5,
            reserved_mask_size: 0,
            ..framebuffer(11, 5, 0)
        };
        let packed = GraphicsInfo::from_framebuffer(&packed).unwrap();
        assert_eq!(packed.pixel_format, PIXEL_BIT_MASK);
        assert_eq!(packed.red_mask, 0xf800);
        assert_eq!(packed.green_mask, 0x07e0);
        assert_eq!(packed.blue_mask, 0x001f);
        assert_eq!(packed.reserved_mask, 0);
        assert_eq!(packed.pixels_per_scan_line, 1920);
    }

    #[test]
    fn test_unusable_framebuffer() {
        let no_address = FramebufferInfo {
            physical_address: 0,
            ..framebuffer(16, 8, 0)
        };
        assert_eq!(GraphicsInfo::from_framebuffer(&no_address), None);

        let no_depth = FramebufferInfo {
            bits_per_pixel: 0,
            ..framebuffer(16, 8, 0)
        };
        assert_eq!(GraphicsInfo::from_framebuffer(&no_depth), None);
    }

    #[test]
    fn test_graphics_info_encoding() {
        let info = GraphicsInfo::from_framebuffer(&framebuffer(16, 8, 0)).unwrap();
        let bytes = info.to_bytes();

        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..8], &0xc000_0000u64.to_le_bytes());
        assert_eq!(&bytes[8..12], &(7680u32 * 1080).to_le_bytes());
        assert_eq!(&bytes[12..16], &0u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1920u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &1080u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &1u32.to_le_bytes());
        assert_eq!(&bytes[44..48], &1920u32.to_le_bytes());
    }
}
