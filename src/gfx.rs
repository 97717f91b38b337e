//! Drawing adapter.
//!
//! [`LedFbGfx`] puts a graphics front end over a 24-bit or a packed RGB565
//! view. Every primitive is written once, generic over [`LedColor`], and the
//! color is converted to the view's storage format at the write. Rotation is
//! applied before the view's topology mapper sees the coordinates.
//!
//! The adapter is an embedded-graphics `DrawTarget<Color = Rgb888>`;
//! [`as_rgb565`](LedFbGfx::as_rgb565) gives an `Rgb565` target over the same
//! view.

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Point, Size};
use embedded_graphics::pixelcolor::{IntoStorage, Rgb565, Rgb888};
use embedded_graphics::Pixel;

use crate::color::{Crgb, LedColor};
use crate::ledfb::LedFb;

/// The view a [`LedFbGfx`] draws into.
#[derive(Clone, Debug)]
pub enum GfxBuffer {
    Rgb(LedFb<Crgb>),
    Rgb565(LedFb<u16>),
}

impl From<LedFb<Crgb>> for GfxBuffer {
    fn from(fb: LedFb<Crgb>) -> Self {
        GfxBuffer::Rgb(fb)
    }
}

impl From<LedFb<u16>> for GfxBuffer {
    fn from(fb: LedFb<u16>) -> Self {
        GfxBuffer::Rgb565(fb)
    }
}

/// Quarter-turn rotation, clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

#[derive(Clone, Debug)]
pub struct LedFbGfx {
    fb: GfxBuffer,
    rotation: Rotation,
}

impl LedFbGfx {
    pub fn new(fb: impl Into<GfxBuffer>) -> Self {
        Self { fb: fb.into(), rotation: Rotation::Deg0 }
    }

    pub fn buffer(&self) -> &GfxBuffer {
        &self.fb
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Unrotated view dimensions.
    fn raw_size(&self) -> (i32, i32) {
        match &self.fb {
            GfxBuffer::Rgb(fb) => (fb.w() as i32, fb.h() as i32),
            GfxBuffer::Rgb565(fb) => (fb.w() as i32, fb.h() as i32),
        }
    }

    /// Drawing surface dimensions after rotation.
    pub fn width(&self) -> i32 {
        let (w, h) = self.raw_size();
        match self.rotation {
            Rotation::Deg0 | Rotation::Deg180 => w,
            Rotation::Deg90 | Rotation::Deg270 => h,
        }
    }

    pub fn height(&self) -> i32 {
        let (w, h) = self.raw_size();
        match self.rotation {
            Rotation::Deg0 | Rotation::Deg180 => h,
            Rotation::Deg90 | Rotation::Deg270 => w,
        }
    }

    /// Clip in rotated space, then map back to view coordinates.
    fn rotate(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return None;
        }
        let (w, h) = self.raw_size();
        Some(match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (w - 1 - y, x),
            Rotation::Deg180 => (w - 1 - x, h - 1 - y),
            Rotation::Deg270 => (y, h - 1 - x),
        })
    }

    /// Write one pixel, converting `color` to the view's format.
    pub fn write_pixel<K: LedColor>(&self, x: i32, y: i32, color: K) {
        let Some((x, y)) = self.rotate(x, y) else { return };
        match &self.fb {
            GfxBuffer::Rgb(fb) => fb.set_pixel(x, y, color.convert()),
            GfxBuffer::Rgb565(fb) => fb.set_pixel(x, y, color.convert()),
        }
    }

    /// Blend `color` over the pixel by `alpha`: 0 leaves it, 255 overwrites.
    pub fn blend_pixel<K: LedColor>(&self, x: i32, y: i32, color: K, alpha: u8) {
        match alpha {
            0 => {}
            255 => self.write_pixel(x, y, color),
            _ => {
                let Some((x, y)) = self.rotate(x, y) else { return };
                match &self.fb {
                    GfxBuffer::Rgb(fb) => fb.with_pixel(x, y, |px| *px = px.blend(color.convert(), alpha)),
                    GfxBuffer::Rgb565(fb) => fb.with_pixel(x, y, |px| *px = px.blend(color.convert(), alpha)),
                };
            }
        }
    }

    fn fade_pixel(&self, x: i32, y: i32, fade_by: u8) {
        let Some((x, y)) = self.rotate(x, y) else { return };
        match &self.fb {
            GfxBuffer::Rgb(fb) => fb.with_pixel(x, y, |px| *px = px.fade_to_black_by(fade_by)),
            GfxBuffer::Rgb565(fb) => fb.with_pixel(x, y, |px| *px = px.fade_to_black_by(fade_by)),
        };
    }

    /// Fill the whole view. Rotation doesn't matter here.
    pub fn fill_screen<K: LedColor>(&self, color: K) {
        match &self.fb {
            GfxBuffer::Rgb(fb) => fb.fill(color.convert()),
            GfxBuffer::Rgb565(fb) => fb.fill(color.convert()),
        }
    }

    /// Blend a 1-bit bitmap at `origin`.
    ///
    /// Set bits blend `front` (color, alpha), clear bits blend `back`. Rows are
    /// MSB first and padded to whole bytes; a short `bitmap` reads as zeros.
    pub fn blend_bitmap<K: LedColor>(
        &self,
        origin: Point,
        bitmap: &[u8],
        size: Size,
        front: (K, u8),
        back: (K, u8),
    ) {
        for_each_bit(bitmap, size, |i, j, set| {
            let (color, alpha) = if set { front } else { back };
            self.blend_pixel(origin.x.saturating_add(i), origin.y.saturating_add(j), color, alpha);
        });
    }

    /// Draw a 1-bit bitmap at `origin` in `front`, fading the pixels under
    /// clear bits towards black by `fade_by`.
    pub fn fade_bitmap<K: LedColor>(
        &self,
        origin: Point,
        bitmap: &[u8],
        size: Size,
        front: K,
        fade_by: u8,
    ) {
        for_each_bit(bitmap, size, |i, j, set| {
            let (x, y) = (origin.x.saturating_add(i), origin.y.saturating_add(j));
            if set {
                self.write_pixel(x, y, front);
            } else {
                self.fade_pixel(x, y, fade_by);
            }
        });
    }

    /// `Rgb565` drawing target over the same view.
    pub fn as_rgb565(&mut self) -> Rgb565Target<'_> {
        Rgb565Target { gfx: self }
    }
}

fn for_each_bit(bitmap: &[u8], size: Size, mut f: impl FnMut(i32, i32, bool)) {
    let byte_width = (size.width as usize + 7) / 8;
    for j in 0..size.height as usize {
        for i in 0..size.width as usize {
            let byte = bitmap.get(j * byte_width + i / 8).copied().unwrap_or(0);
            f(i as i32, j as i32, byte & (0x80 >> (i & 7)) != 0);
        }
    }
}

impl OriginDimensions for LedFbGfx {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

impl DrawTarget for LedFbGfx {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            self.write_pixel(p.x, p.y, Crgb::from(c));
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_screen(Crgb::from(color));
        Ok(())
    }
}

/// `Rgb565` drawing target, see [`LedFbGfx::as_rgb565`].
pub struct Rgb565Target<'a> {
    gfx: &'a mut LedFbGfx,
}

impl OriginDimensions for Rgb565Target<'_> {
    fn size(&self) -> Size {
        self.gfx.size()
    }
}

impl DrawTarget for Rgb565Target<'_> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            self.gfx.write_pixel::<u16>(p.x, p.y, c.into_storage());
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.gfx.fill_screen::<u16>(color.into_storage());
        Ok(())
    }
}
