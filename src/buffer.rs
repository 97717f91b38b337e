//! Pixel storage.
//!
//! [`PixelBuffer`] owns a contiguous run of pixels. Indexed access never
//! panics: an out-of-range index resolves to the buffer's sentinel pixel, so
//! a bad coordinate corrupts at most that scratch pixel and never a visible
//! one.
//!
//! [`PixelStore`] is the storage interface views draw through; it is
//! implemented by [`PixelBuffer`] and by the sink-bound
//! [`BoundBuffer`](crate::BoundBuffer).

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::color::LedColor;
use crate::error::{LedFbError, Result};

/// Storage shared between views, overlays and the engine.
pub type SharedStore<C> = Rc<RefCell<dyn PixelStore<C>>>;

/// Pixel storage a [`LedFb`](crate::LedFb) view can address.
pub trait PixelStore<C: LedColor> {
    /// All pixels, in chain order.
    fn data(&self) -> &[C];

    fn data_mut(&mut self) -> &mut [C];

    /// Pixel at `idx`, or the sentinel when `idx` is out of range.
    fn at(&self, idx: usize) -> &C;

    /// Mutable pixel at `idx`, or the sentinel when `idx` is out of range.
    fn at_mut(&mut self, idx: usize) -> &mut C;

    /// Reallocate to `len` pixels. Content is lost.
    fn resize(&mut self, len: usize) -> Result<()>;

    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill(&mut self, color: C) {
        self.data_mut().fill(color);
    }

    fn clear(&mut self) {
        self.fill(C::BLACK);
    }
}

/// Owned pixel storage with a per-buffer sentinel.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer<C: LedColor> {
    fb: Vec<C>,
    stub: C,
}

impl<C: LedColor> PixelBuffer<C> {
    /// Create `len` black pixels.
    pub fn new(len: usize) -> Self {
        Self { fb: vec![C::BLACK; len], stub: C::BLACK }
    }

    /// Wrap an existing pixel vector.
    pub fn from_vec(fb: Vec<C>) -> Self {
        Self { fb, stub: C::BLACK }
    }

    /// Zero-copy content exchange.
    pub fn swap(&mut self, other: &mut PixelBuffer<C>) {
        core::mem::swap(&mut self.fb, &mut other.fb);
    }

    /// Copy content from `other`; takes over its length when they differ.
    pub fn copy_from(&mut self, other: &[C]) {
        if self.fb.len() == other.len() {
            self.fb.copy_from_slice(other);
        } else {
            self.fb = other.to_vec();
        }
    }

    pub fn iter(&self) -> core::slice::Iter<'_, C> {
        self.fb.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, C> {
        self.fb.iter_mut()
    }

    /// Raw bytes of the pixel run, for transports that ship memory as is.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.fb)
    }

    /// Current sentinel value (whatever the last out-of-range write left).
    pub fn stub(&self) -> C {
        self.stub
    }
}

impl<C: LedColor> PixelStore<C> for PixelBuffer<C> {
    fn data(&self) -> &[C] {
        &self.fb
    }

    fn data_mut(&mut self) -> &mut [C] {
        &mut self.fb
    }

    #[inline]
    fn at(&self, idx: usize) -> &C {
        self.fb.get(idx).unwrap_or(&self.stub)
    }

    #[inline]
    fn at_mut(&mut self, idx: usize) -> &mut C {
        match self.fb.get_mut(idx) {
            Some(px) => px,
            None => &mut self.stub,
        }
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        self.fb.resize(len, C::BLACK);
        self.clear();
        if self.fb.len() == len {
            Ok(())
        } else {
            Err(LedFbError::SizeMismatch { requested: len, actual: self.fb.len() })
        }
    }
}

impl<'a, C: LedColor> IntoIterator for &'a PixelBuffer<C> {
    type Item = &'a C;
    type IntoIter = core::slice::Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.fb.iter()
    }
}
