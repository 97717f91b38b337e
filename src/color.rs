//! Pixel color representations and the 8-bit color math used on them.
//!
//! Two storage formats are supported:
//! - [`Crgb`]: 24-bit RGB, one byte per channel
//! - `u16`: packed RGB565 (5 bits red, 6 bits green, 5 bits blue)
//!
//! Both implement [`LedColor`], so buffers, views and the drawing adapter are
//! written once. The 565 expansion/quantization formulas are the bit-exact
//! ones used by Adafruit GFX style libraries; expanding a 565 value and
//! quantizing it back always yields the original value.

use bytemuck::{Pod, Zeroable};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

/// 24-bit RGB pixel, laid out the way clockless LED drivers expect it in RAM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Crgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Crgb {
    pub const BLACK: Crgb = Crgb::new(0, 0, 0);
    pub const WHITE: Crgb = Crgb::new(255, 255, 255);
    pub const RED: Crgb = Crgb::new(255, 0, 0);
    pub const GREEN: Crgb = Crgb::new(0, 255, 0);
    pub const BLUE: Crgb = Crgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `scale / 256` (FastLED `nscale8`).
    pub fn nscale8(&mut self, scale: u8) {
        self.r = scale8(self.r, scale);
        self.g = scale8(self.g, scale);
        self.b = scale8(self.b, scale);
    }
}

impl From<Rgb888> for Crgb {
    fn from(c: Rgb888) -> Self {
        Crgb::new(c.r(), c.g(), c.b())
    }
}

impl From<Crgb> for Rgb888 {
    fn from(c: Crgb) -> Self {
        Rgb888::new(c.r, c.g, c.b)
    }
}

/// Operations every pixel storage format has to provide.
///
/// `to_crgb`/`from_crgb` go through the canonical 24-bit form, so converting
/// between two formats is `T::from_crgb(c.to_crgb())`.
pub trait LedColor: Pod + PartialEq + core::fmt::Debug {
    /// Zero color. Also the default transparent key for overlays.
    const BLACK: Self;

    /// Expand to the canonical 24-bit representation.
    fn to_crgb(self) -> Crgb;

    /// Quantize from the canonical 24-bit representation.
    fn from_crgb(c: Crgb) -> Self;

    /// Blend `overlay` over `self`; `amount` is the overlay share, 0..=255.
    fn blend(self, overlay: Self, amount: u8) -> Self;

    /// Scale brightness by `scale / 256`.
    fn scale8(self, scale: u8) -> Self;

    /// Convert into another storage format.
    #[inline]
    fn convert<T: LedColor>(self) -> T {
        T::from_crgb(self.to_crgb())
    }

    /// Dim towards black by `amount` (FastLED `fadeToBlackBy`).
    #[inline]
    fn fade_to_black_by(self, amount: u8) -> Self {
        self.scale8(255 - amount)
    }
}

impl LedColor for Crgb {
    const BLACK: Self = Crgb::BLACK;

    #[inline]
    fn to_crgb(self) -> Crgb {
        self
    }

    #[inline]
    fn from_crgb(c: Crgb) -> Self {
        c
    }

    fn blend(self, overlay: Self, amount: u8) -> Self {
        nblend(self, overlay, amount)
    }

    fn scale8(mut self, scale: u8) -> Self {
        self.nscale8(scale);
        self
    }
}

impl LedColor for u16 {
    const BLACK: Self = 0;

    #[inline]
    fn to_crgb(self) -> Crgb {
        expand_565(self)
    }

    #[inline]
    fn from_crgb(c: Crgb) -> Self {
        color565(c)
    }

    fn blend(self, overlay: Self, amount: u8) -> Self {
        alpha_blend_rgb565(overlay, self, amount)
    }

    fn scale8(self, scale: u8) -> Self {
        color565(expand_565(self).scale8(scale))
    }
}

// ---- 565 <-> 888 ----

/// Expand a packed RGB565 value to 24-bit color.
#[inline]
pub fn expand_565(c: u16) -> Crgb {
    let c = c as u32;
    let r = (((c >> 11) & 0x1f) * 527 + 23) >> 6;
    let g = (((c >> 5) & 0x3f) * 259 + 33) >> 6;
    let b = ((c & 0x1f) * 527 + 23) >> 6;
    Crgb::new(r as u8, g as u8, b as u8)
}

/// Quantize 24-bit color to packed RGB565.
#[inline]
pub fn color565(c: Crgb) -> u16 {
    ((c.r as u16 >> 3) << 11) | ((c.g as u16 >> 2) << 5) | (c.b as u16 >> 3)
}

// ---- 8-bit math ----

/// `i * scale / 256`, where scale 255 leaves the value untouched.
#[inline]
pub fn scale8(i: u8, scale: u8) -> u8 {
    ((i as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Linear blend of `b` over `a` by `amount_of_b`.
#[inline]
pub fn blend8(a: u8, b: u8, amount_of_b: u8) -> u8 {
    let (a, b, amt) = (a as u32, b as u32, amount_of_b as u32);
    let partial = ((a << 8) | b) + b * amt - a * amt;
    (partial >> 8) as u8
}

/// Blend `overlay` into `existing`; 0 keeps `existing`, 255 yields `overlay`.
pub fn nblend(existing: Crgb, overlay: Crgb, amount: u8) -> Crgb {
    match amount {
        0 => existing,
        255 => overlay,
        _ => Crgb::new(
            blend8(existing.r, overlay.r, amount),
            blend8(existing.g, overlay.g, amount),
            blend8(existing.b, overlay.b, amount),
        ),
    }
}

/// Fast RGB565 alpha blend of `fg` over `bg`, alpha 0..=255.
///
/// Spreads the three fields over a 32-bit word so one multiply blends them
/// all; alpha is reduced to 5 bits.
pub fn alpha_blend_rgb565(fg: u16, bg: u16, alpha: u8) -> u16 {
    const MASK: u32 = 0b0000_0111_1110_0000_1111_1000_0001_1111;
    let alpha = (alpha as u32 + 4) >> 3;
    let (fg, bg) = (fg as u32, bg as u32);
    let bg = (bg | (bg << 16)) & MASK;
    let fg = (fg | (fg << 16)) & MASK;
    let result = ((fg.wrapping_sub(bg).wrapping_mul(alpha) >> 5).wrapping_add(bg)) & MASK;
    ((result >> 16) | result) as u16
}
