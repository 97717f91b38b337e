//! Output sink contract.
//!
//! A sink is the backend that ships pixels to hardware: a clockless LED
//! driver, an SPI panel, a HUB75 DMA engine. The core only needs three
//! things from it:
//!
//! - [`attach`](LedSink::attach): "read from this buffer from now on";
//!   called again every time the source storage moves, grows or is swapped
//! - [`push`](LedSink::push): transmit the current source now
//! - [`set_brightness`](LedSink::set_brightness): optional global dimming
//!
//! Sinks never keep a borrow of the source; `attach` hands them the slice so
//! they can note its address and length (e.g. to program a DMA descriptor),
//! and `push` hands the same storage again for the actual transfer.
//!
//! A sink lives in a [`SinkCell`], which records whether some
//! [`BoundBuffer`](crate::BoundBuffer) has claimed it. Handles can be cloned
//! freely, but only one buffer at a time gets to bind.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell, RefMut};

use crate::color::LedColor;

/// Sink handle; at most one [`BoundBuffer`](crate::BoundBuffer) holds the claim.
pub type SharedSink<C> = Rc<SinkCell<dyn LedSink<C>>>;

/// A sink plus its binding claim.
pub struct SinkCell<S: ?Sized> {
    claimed: Cell<bool>,
    sink: RefCell<S>,
}

impl<S> SinkCell<S> {
    pub fn new(sink: S) -> Self {
        Self { claimed: Cell::new(false), sink: RefCell::new(sink) }
    }

    /// Wrap `sink` in a fresh shared handle.
    pub fn shared(sink: S) -> Rc<Self> {
        Rc::new(Self::new(sink))
    }
}

impl<S: ?Sized> SinkCell<S> {
    pub fn borrow(&self) -> Ref<'_, S> {
        self.sink.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, S> {
        self.sink.borrow_mut()
    }

    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, S>> {
        self.sink.try_borrow_mut().ok()
    }

    /// Whether a buffer is currently bound to this sink.
    pub fn is_claimed(&self) -> bool {
        self.claimed.get()
    }

    /// Take the claim. `false` if someone already holds it.
    pub(crate) fn claim(&self) -> bool {
        !self.claimed.replace(true)
    }

    pub(crate) fn release(&self) {
        self.claimed.set(false);
    }
}

impl<S: ?Sized> core::fmt::Debug for SinkCell<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SinkCell").field("claimed", &self.claimed.get()).finish()
    }
}

pub trait LedSink<C: LedColor> {
    /// Install `source` as the data this sink reads from.
    fn attach(&mut self, source: &[C]);

    /// Transmit `pixels` (the attached source) synchronously.
    fn push(&mut self, pixels: &[C]);

    /// Set global brightness, returns the level now in effect.
    /// Sinks without dimming support report 0.
    fn set_brightness(&mut self, _level: u8) -> u8 {
        0
    }

    /// Whether the source may change length. Fixed-geometry panels say no.
    fn resizable(&self) -> bool {
        true
    }
}

/// RAM-backed sink: keeps a copy of the last pushed frame.
///
/// Useful as a host-side stand-in for real hardware and for inspecting what
/// the engine actually sent.
#[derive(Debug)]
pub struct MemorySink<C: LedColor> {
    source: Option<(usize, usize)>,
    attach_count: usize,
    frame: Vec<C>,
    push_count: usize,
    brightness: u8,
}

impl<C: LedColor> MemorySink<C> {
    pub fn new() -> Self {
        Self {
            source: None,
            attach_count: 0,
            frame: Vec::new(),
            push_count: 0,
            brightness: 255,
        }
    }

    /// Convenience constructor returning the shared handle form.
    pub fn shared() -> Rc<SinkCell<Self>> {
        SinkCell::shared(Self::new())
    }

    /// Address and length of the currently attached source.
    pub fn source(&self) -> Option<(usize, usize)> {
        self.source
    }

    /// Whether `data` is the storage this sink currently reads from.
    pub fn is_attached_to(&self, data: &[C]) -> bool {
        self.source == Some((data.as_ptr() as usize, data.len()))
    }

    pub fn attach_count(&self) -> usize { self.attach_count }

    /// Last transmitted frame.
    pub fn frame(&self) -> &[C] { &self.frame }

    pub fn push_count(&self) -> usize { self.push_count }

    pub fn brightness(&self) -> u8 { self.brightness }
}

impl<C: LedColor> Default for MemorySink<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LedColor> LedSink<C> for MemorySink<C> {
    fn attach(&mut self, source: &[C]) {
        self.source = Some((source.as_ptr() as usize, source.len()));
        self.attach_count += 1;
    }

    fn push(&mut self, pixels: &[C]) {
        self.frame.clear();
        self.frame.extend_from_slice(pixels);
        self.push_count += 1;
    }

    fn set_brightness(&mut self, level: u8) -> u8 {
        self.brightness = level;
        self.brightness
    }
}
