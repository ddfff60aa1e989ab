use bytemuck::{Pod, Zeroable};

/// Unpremultiplied 8-bit ARGB color packed into a `u32` (`0xAARRGGBB`).
///
/// This is the per-vertex color format stored in geometry buffers. It is kept
/// packed so a color array can be handed to the GPU without conversion.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const TRANSPARENT: Self = Self(0x0000_0000);
    pub const BLACK: Self = Self(0xFF00_0000);
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    #[inline]
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    #[inline]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Converts to premultiplied `[r, g, b, a]` floats in `[0, 1]`.
    ///
    /// Matches the blend state GPU pipelines in this workspace expect.
    #[inline]
    pub fn to_premul_f32(self) -> [f32; 4] {
        let a = self.alpha() as f32 / 255.0;
        [
            self.red() as f32 / 255.0 * a,
            self.green() as f32 / 255.0 * a,
            self.blue() as f32 / 255.0 * a,
            a,
        ]
    }
}
