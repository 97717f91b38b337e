//! 2D view over pixel storage.
//!
//! A [`LedFb`] gives a flat pixel store a width, a height and a topology
//! mapper, so drawing code works in `(x, y)` whatever the LED wiring is.
//! Cloning a view yields a second view over the *same* storage.
//!
//! Pixel access never hands out a borrow that outlives the call, so
//! `fb.set_pixel(0, 0, fb.pixel(1, 1))` is fine. While the store is
//! borrowed elsewhere, reads return black and writes are dropped with a
//! warning.

use alloc::rc::Rc;
use core::cell::{Ref, RefCell, RefMut};

use tracing::warn;

use crate::buffer::{PixelBuffer, PixelStore, SharedStore};
use crate::color::LedColor;
use crate::error::{LedFbError, Result};
use crate::layout::{map_2d, Transpose};

pub struct LedFb<C: LedColor> {
    w: u16,
    h: u16,
    buffer: SharedStore<C>,
    xymap: Rc<dyn Transpose>,
}

impl<C: LedColor> Clone for LedFb<C> {
    fn clone(&self) -> Self {
        Self {
            w: self.w,
            h: self.h,
            buffer: self.buffer.clone(),
            xymap: self.xymap.clone(),
        }
    }
}

impl<C: LedColor> LedFb<C> {
    /// View over a fresh `w`×`h` buffer.
    pub fn new(w: u16, h: u16) -> Self {
        let buffer: SharedStore<C> =
            Rc::new(RefCell::new(PixelBuffer::new(w as usize * h as usize)));
        Self::with_store(w, h, buffer)
    }

    /// View over existing storage. A store whose size doesn't match `w`×`h`
    /// is resized (and so cleared).
    pub fn with_store(w: u16, h: u16, buffer: SharedStore<C>) -> Self {
        let len = w as usize * h as usize;
        if buffer.borrow().len() != len {
            // a store that refuses keeps its size; out-of-range pixels hit the sentinel
            let _ = buffer.borrow_mut().resize(len);
        }
        Self { w, h, buffer, xymap: Rc::new(map_2d) }
    }

    pub fn w(&self) -> u16 { self.w }
    pub fn h(&self) -> u16 { self.h }

    /// Pixel count of the underlying store.
    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_dim(&self) -> u16 { self.w.max(self.h) }
    pub fn min_dim(&self) -> u16 { self.w.min(self.h) }
    pub fn max_width_index(&self) -> u16 { self.w.saturating_sub(1) }
    pub fn max_height_index(&self) -> u16 { self.h.saturating_sub(1) }

    /// The shared storage behind this view.
    pub fn store(&self) -> SharedStore<C> {
        self.buffer.clone()
    }

    /// Replace the coordinate mapper. Takes effect on the next access.
    pub fn set_remap_function<F>(&mut self, mapper: F)
    where
        F: Fn(usize, usize, usize, usize) -> usize + 'static,
    {
        self.xymap = Rc::new(mapper);
    }

    /// Use a topology descriptor ([`LedStripe`](crate::LedStripe),
    /// [`LedTiles`](crate::LedTiles)) as the mapper.
    pub fn set_layout<T: Transpose + 'static>(&mut self, layout: T) {
        self.xymap = Rc::new(layout);
    }

    /// Resize storage to `w`×`h`. Dimensions change only when the store
    /// complied.
    pub fn resize(&mut self, w: u16, h: u16) -> Result<()> {
        let len = w as usize * h as usize;
        let mut buffer = self.buffer.borrow_mut();
        buffer.resize(len)?;
        if buffer.len() != len {
            return Err(LedFbError::SizeMismatch { requested: len, actual: buffer.len() });
        }
        self.w = w;
        self.h = h;
        Ok(())
    }

    /// Linear index of `(x, y)`, `None` when outside the view.
    ///
    /// `x >= w` is outside even where the mapped index would land in range.
    #[inline]
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.w as i32 || y >= self.h as i32 {
            return None;
        }
        Some(self.xymap.transpose(self.w as usize, self.h as usize, x as usize, y as usize))
    }

    /// Run `f` on the pixel at `(x, y)`, the store's sentinel when outside
    /// the view. `None` if the store is borrowed elsewhere.
    pub fn with_pixel<R>(&self, x: i32, y: i32, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let idx = self.index_of(x, y).unwrap_or(usize::MAX);
        self.with_pixel_at(idx, f)
    }

    /// Like [`with_pixel`](Self::with_pixel) at linear index `idx`, bypassing
    /// the mapper.
    pub fn with_pixel_at<R>(&self, idx: usize, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let mut store = self.store_mut()?;
        Some(f(store.at_mut(idx)))
    }

    pub fn pixel(&self, x: i32, y: i32) -> C {
        self.pixel_at(self.index_of(x, y).unwrap_or(usize::MAX))
    }

    pub fn pixel_at(&self, idx: usize) -> C {
        match self.buffer.try_borrow() {
            Ok(store) => *store.at(idx),
            Err(_) => C::BLACK,
        }
    }

    pub fn set_pixel(&self, x: i32, y: i32, color: C) {
        self.with_pixel(x, y, |px| *px = color);
    }

    pub fn set_pixel_at(&self, idx: usize, color: C) {
        self.with_pixel_at(idx, |px| *px = color);
    }

    /// Read access to all pixels in chain order.
    pub fn data(&self) -> Ref<'_, [C]> {
        Ref::map(self.buffer.borrow(), |b| b.data())
    }

    pub fn fill(&self, color: C) {
        if let Some(mut store) = self.store_mut() {
            store.fill(color);
        }
    }

    pub fn clear(&self) {
        if let Some(mut store) = self.store_mut() {
            store.clear();
        }
    }

    /// Dim every pixel towards black by `v` (FastLED `fadeToBlackBy`).
    pub fn fade(&self, v: u8) {
        if let Some(mut store) = self.store_mut() {
            for px in store.data_mut() {
                *px = px.fade_to_black_by(v);
            }
        }
    }

    /// Scale every pixel by `v / 256` (FastLED `nscale8`).
    pub fn dim(&self, v: u8) {
        if let Some(mut store) = self.store_mut() {
            for px in store.data_mut() {
                *px = px.scale8(v);
            }
        }
    }

    fn store_mut(&self) -> Option<RefMut<'_, dyn PixelStore<C>>> {
        match self.buffer.try_borrow_mut() {
            Ok(store) => Some(store),
            Err(_) => {
                warn!("pixel store busy, write dropped");
                None
            }
        }
    }
}

impl<C: LedColor> core::fmt::Debug for LedFb<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedFb").field("w", &self.w).field("h", &self.h).finish()
    }
}
