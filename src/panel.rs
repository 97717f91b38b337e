//! Sink writing onto an embedded-graphics panel.
//!
//! The pushed buffer is taken as row-major with the panel's width, full rows
//! are streamed through `fill_contiguous`, a trailing partial row goes pixel
//! by pixel. Panel geometry is fixed, so the engine refuses to resize a
//! canvas bound to this sink.

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{Dimensions, Point, Size};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::Pixel;
use tracing::warn;

use crate::color::LedColor;
use crate::sink::LedSink;

pub struct PanelSink<D> {
    display: D,
    size: Size,
    brightness: u8,
    source_len: usize,
}

impl<D: DrawTarget> PanelSink<D> {
    /// Wrap `display`, taking its bounding box as the panel geometry.
    pub fn new(display: D) -> Self {
        let size = display.bounding_box().size;
        Self { display, size, brightness: 255, source_len: 0 }
    }

    /// Pixel count matching the panel.
    pub fn len(&self) -> usize {
        self.size.width as usize * self.size.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Length of the buffer last attached.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_inner(self) -> D {
        self.display
    }
}

impl<C, D> LedSink<C> for PanelSink<D>
where
    C: LedColor,
    D: DrawTarget,
    D::Color: From<Rgb888>,
{
    fn attach(&mut self, source: &[C]) {
        self.source_len = source.len();
        if source.len() > self.len() {
            warn!(source = source.len(), panel = self.len(), "source larger than panel, tail is dropped");
        }
    }

    fn push(&mut self, pixels: &[C]) {
        let width = self.size.width as usize;
        if width == 0 {
            return;
        }
        let pixels = &pixels[..pixels.len().min(self.len())];
        let level = self.brightness;
        let convert = |c: &C| {
            let mut px = c.to_crgb();
            px.nscale8(level);
            D::Color::from(Rgb888::from(px))
        };

        let rows = pixels.len() / width;
        let (full, tail) = pixels.split_at(rows * width);
        if rows > 0 {
            let area = Rectangle::new(Point::zero(), Size::new(self.size.width, rows as u32));
            if self.display.fill_contiguous(&area, full.iter().map(convert)).is_err() {
                warn!("panel write failed");
                return;
            }
        }
        if !tail.is_empty() {
            let y = rows as i32;
            let tail = tail
                .iter()
                .enumerate()
                .map(|(x, c)| Pixel(Point::new(x as i32, y), convert(c)));
            if self.display.draw_iter(tail).is_err() {
                warn!("panel write failed");
            }
        }
    }

    fn set_brightness(&mut self, level: u8) -> u8 {
        self.brightness = level;
        self.brightness
    }

    fn resizable(&self) -> bool {
        false
    }
}

impl<D> core::fmt::Debug for PanelSink<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PanelSink")
            .field("size", &self.size)
            .field("brightness", &self.brightness)
            .finish()
    }
}
