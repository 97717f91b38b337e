//! Display engine: canvas, back buffer and overlay compositing.
//!
//! The engine owns the canvas, which is bound to the output sink. On top of
//! it a client can ask for an overlay: a buffer of the same size whose
//! non-key pixels replace the canvas pixels on output. The engine only keeps
//! a weak reference to the overlay, so dropping the last client handle ends
//! it, and the next [`show`](DisplayEngine::show) notices.
//!
//! With canvas protection on, compositing never writes into the canvas.
//! Instead a back buffer takes over the sink binding and receives
//! `canvas + overlay` every frame. That compositor back buffer is released,
//! and the binding returned to the canvas, once the overlay is gone or
//! protection is turned off.
//!
//! Independently the client may enable double buffering, i.e. a second
//! buffer to draw into and [`flip`](DisplayEngine::flip_buffer) with the
//! canvas.

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use tracing::{debug, warn};

use crate::bound::BoundBuffer;
use crate::buffer::{PixelBuffer, PixelStore};
use crate::color::LedColor;
use crate::error::{LedFbError, Result};
use crate::sink::SharedSink;

/// Buffer bound (or bindable) to the engine's sink.
pub type SharedBound<C> = Rc<RefCell<BoundBuffer<C>>>;

/// Overlay handle. The overlay lives as long as a client holds one.
pub type Overlay<C> = Rc<RefCell<PixelBuffer<C>>>;

/// Engine startup options.
///
/// ```
/// # use ledfb::{Crgb, EngineConfig};
/// let cfg = EngineConfig::<Crgb>::default()
///     .with_canvas_protect(true)
///     .with_brightness(64);
/// # let _ = cfg;
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig<C: LedColor> {
    canvas_protect: bool,
    transparent_color: C,
    double_buffer: bool,
    brightness: Option<u8>,
}

impl<C: LedColor> Default for EngineConfig<C> {
    fn default() -> Self {
        Self {
            canvas_protect: false,
            transparent_color: C::BLACK,
            double_buffer: false,
            brightness: None,
        }
    }
}

impl<C: LedColor> EngineConfig<C> {
    /// Composite through a back buffer instead of drawing the overlay into the canvas.
    pub fn with_canvas_protect(mut self, protect: bool) -> Self {
        self.canvas_protect = protect;
        self
    }

    /// Overlay key color, black unless set.
    pub fn with_transparent_color(mut self, color: C) -> Self {
        self.transparent_color = color;
        self
    }

    /// Start with a client back buffer.
    pub fn with_double_buffer(mut self, active: bool) -> Self {
        self.double_buffer = active;
        self
    }

    /// Initial sink brightness. Left as the sink has it when unset.
    pub fn with_brightness(mut self, level: u8) -> Self {
        self.brightness = Some(level);
        self
    }
}

pub struct DisplayEngine<C: LedColor> {
    sink: SharedSink<C>,
    canvas: SharedBound<C>,
    back: Option<SharedBound<C>>,
    // back buffer allocated by the compositor rather than by double_buffer(true)
    back_is_scratch: bool,
    overlay: Option<Weak<RefCell<PixelBuffer<C>>>>,
    front_active: bool,
    canvas_protect: bool,
    transparent: C,
}

impl<C: LedColor> DisplayEngine<C> {
    /// Engine with a fresh `len` pixel canvas bound to `sink`. Fails when
    /// some other buffer already holds the sink.
    pub fn new(sink: SharedSink<C>, len: usize) -> Result<Self> {
        Self::with_config(sink, len, EngineConfig::default())
    }

    pub fn with_config(sink: SharedSink<C>, len: usize, config: EngineConfig<C>) -> Result<Self> {
        let canvas = Rc::new(RefCell::new(BoundBuffer::new(len)));
        canvas.borrow_mut().bind(&sink)?;
        Ok(Self::assemble(sink, canvas, config))
    }

    /// Engine over an existing canvas. Fails when the canvas is bound to
    /// some other sink.
    pub fn with_canvas(
        sink: SharedSink<C>,
        canvas: SharedBound<C>,
        config: EngineConfig<C>,
    ) -> Result<Self> {
        canvas.borrow_mut().bind(&sink)?;
        Ok(Self::assemble(sink, canvas, config))
    }

    fn assemble(sink: SharedSink<C>, canvas: SharedBound<C>, config: EngineConfig<C>) -> Self {
        let mut engine = Self {
            sink,
            canvas,
            back: None,
            back_is_scratch: false,
            overlay: None,
            front_active: true,
            canvas_protect: config.canvas_protect,
            transparent: config.transparent_color,
        };
        if let Some(level) = config.brightness {
            engine.brightness(level);
        }
        if config.double_buffer {
            engine.double_buffer(true);
        }
        debug!(len = engine.canvas.borrow().len(), "display engine ready");
        engine
    }

    /// Composite the overlay, if any, and push a frame to the sink.
    pub fn show(&mut self) {
        let overlay = self.live_overlay();
        if overlay.is_some() && self.canvas_protect {
            self.engage_back_buffer();
        } else {
            self.release_back_buffer();
        }
        if let Some(ovr) = overlay {
            self.composite(&ovr.borrow());
        }
        self.push();
    }

    /// Clear canvas and back buffer, empty the overlay, then push.
    pub fn clear(&mut self) {
        self.canvas.borrow_mut().clear();
        if let Some(back) = &self.back {
            back.borrow_mut().clear();
        }
        if let Some(ovr) = self.live_overlay() {
            ovr.borrow_mut().fill(self.transparent);
        }
        self.push();
    }

    /// Forward a brightness level to the sink, returns the level in effect.
    pub fn brightness(&self, level: u8) -> u8 {
        self.sink.borrow_mut().set_brightness(level)
    }

    /// The live overlay, allocated (canvas sized, all key color) if there
    /// is none. The engine doesn't keep it alive.
    pub fn overlay(&mut self) -> Overlay<C> {
        if let Some(ovr) = self.live_overlay() {
            return ovr;
        }
        let len = self.canvas.borrow().len();
        let mut buf = PixelBuffer::new(len);
        buf.fill(self.transparent);
        let ovr = Rc::new(RefCell::new(buf));
        self.overlay = Some(Rc::downgrade(&ovr));
        debug!(len, "overlay allocated");
        ovr
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    fn live_overlay(&mut self) -> Option<Overlay<C>> {
        let weak = self.overlay.as_ref()?;
        match weak.upgrade() {
            Some(ovr) => Some(ovr),
            None => {
                debug!("overlay expired");
                self.overlay = None;
                None
            }
        }
    }

    /// Enable or disable the client back buffer.
    ///
    /// Disabling returns the sink binding to the canvas and makes the canvas
    /// the active buffer again.
    pub fn double_buffer(&mut self, active: bool) {
        if active {
            if self.back.is_none() {
                let len = self.canvas.borrow().len();
                self.back = Some(Rc::new(RefCell::new(BoundBuffer::new(len))));
                debug!(len, "back buffer allocated");
            } else if self.back_is_scratch {
                self.back_is_scratch = false;
                debug!("compositor back buffer handed to client");
            }
            return;
        }
        if let Some(back) = self.back.take() {
            if back.borrow().is_bound() {
                self.canvas.borrow_mut().rebind(&mut back.borrow_mut());
            }
            debug!("back buffer released");
        }
        self.back_is_scratch = false;
        self.front_active = true;
    }

    /// Whether a client back buffer exists.
    pub fn is_double_buffered(&self) -> bool {
        self.back.is_some() && !self.back_is_scratch
    }

    /// Exchange canvas and back buffer content, zero-copy.
    pub fn flip_buffer(&mut self) {
        if let Some(back) = self.client_back() {
            self.canvas.borrow_mut().swap(&mut back.borrow_mut());
        }
    }

    /// Switch which buffer [`active_buffer`](Self::active_buffer) hands out.
    /// Returns `true` when the canvas is now the active one. The sink
    /// binding stays where it is.
    pub fn toggle_buffer(&mut self) -> bool {
        if self.is_double_buffered() {
            self.front_active = !self.front_active;
        }
        self.front_active
    }

    pub fn copy_back_to_front(&mut self) {
        if let Some(back) = self.client_back() {
            self.canvas.borrow_mut().copy_from(back.borrow().data());
        }
    }

    pub fn copy_front_to_back(&mut self) {
        if let Some(back) = self.client_back() {
            back.borrow_mut().copy_from(self.canvas.borrow().data());
        }
    }

    /// The canvas.
    pub fn buffer(&self) -> SharedBound<C> {
        self.canvas.clone()
    }

    /// The client back buffer, or the canvas when not double buffering.
    pub fn back_buffer(&self) -> SharedBound<C> {
        self.client_back().unwrap_or_else(|| self.canvas.clone())
    }

    /// The buffer drawing should go to right now.
    pub fn active_buffer(&self) -> SharedBound<C> {
        if self.front_active {
            self.canvas.clone()
        } else {
            self.back_buffer()
        }
    }

    pub fn canvas_protect(&self) -> bool {
        self.canvas_protect
    }

    /// Takes effect on the next [`show`](Self::show).
    pub fn set_canvas_protect(&mut self, protect: bool) {
        self.canvas_protect = protect;
    }

    pub fn transparent_color(&self) -> C {
        self.transparent
    }

    /// Change the key color. A live overlay is re-keyed: its pixels holding
    /// the old key take the new one, so they stay see-through. Pixels that
    /// were already drawn in the new color become see-through as well.
    pub fn set_transparent_color(&mut self, color: C) {
        let old = core::mem::replace(&mut self.transparent, color);
        if old == color {
            return;
        }
        if let Some(ovr) = self.live_overlay() {
            for px in ovr.borrow_mut().data_mut() {
                if *px == old {
                    *px = color;
                }
            }
            debug!("overlay re-keyed");
        }
    }

    /// Resize canvas, back buffer and overlay to `len` pixels.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if !self.sink.borrow().resizable() {
            warn!(len, "resize refused by fixed geometry sink");
            return Err(LedFbError::Unsupported);
        }
        self.canvas.borrow_mut().resize(len)?;
        if let Some(back) = &self.back {
            back.borrow_mut().resize(len)?;
        }
        if let Some(ovr) = self.live_overlay() {
            ovr.borrow_mut().resize(len)?;
            ovr.borrow_mut().fill(self.transparent);
        }
        Ok(())
    }

    fn client_back(&self) -> Option<SharedBound<C>> {
        if self.back_is_scratch {
            return None;
        }
        self.back.clone()
    }

    /// Make sure a back buffer exists and holds the sink binding.
    fn engage_back_buffer(&mut self) {
        if self.back.is_none() {
            let len = self.canvas.borrow().len();
            self.back = Some(Rc::new(RefCell::new(BoundBuffer::new(len))));
            self.back_is_scratch = true;
            debug!(len, "compositor back buffer allocated");
        }
        if let Some(back) = &self.back {
            let mut back = back.borrow_mut();
            if !back.is_bound() {
                self.canvas.borrow_mut().rebind(&mut back);
                debug!("sink moved to back buffer");
            }
        }
    }

    /// Return the binding to the canvas and drop a compositor back buffer.
    fn release_back_buffer(&mut self) {
        let Some(back) = &self.back else { return };
        if back.borrow().is_bound() {
            self.canvas.borrow_mut().rebind(&mut back.borrow_mut());
            debug!("sink returned to canvas");
        }
        if self.back_is_scratch {
            self.back = None;
            self.back_is_scratch = false;
            debug!("compositor back buffer released");
        }
    }

    fn composite(&self, ovr: &PixelBuffer<C>) {
        let key = self.transparent;
        let bound_back = self.back.as_ref().filter(|b| b.borrow().is_bound());
        match bound_back {
            Some(back) => {
                let canvas = self.canvas.borrow();
                if ovr.len() != canvas.len() {
                    warn!(overlay = ovr.len(), canvas = canvas.len(), "overlay size mismatch, skipped");
                    return;
                }
                let mut back = back.borrow_mut();
                let dst = back.data_mut().iter_mut();
                for ((d, &c), &o) in dst.zip(canvas.data()).zip(ovr.data()) {
                    *d = if o == key { c } else { o };
                }
            }
            None => {
                let mut canvas = self.canvas.borrow_mut();
                if ovr.len() != canvas.len() {
                    warn!(overlay = ovr.len(), canvas = canvas.len(), "overlay size mismatch, skipped");
                    return;
                }
                for (d, &o) in canvas.data_mut().iter_mut().zip(ovr.data()) {
                    if o != key {
                        *d = o;
                    }
                }
            }
        }
    }

    /// Push through whichever buffer holds the binding.
    fn push(&self) {
        if let Some(back) = &self.back {
            let back = back.borrow();
            if back.is_bound() {
                back.show();
                return;
            }
        }
        self.canvas.borrow().show();
    }
}

impl<C: LedColor> core::fmt::Debug for DisplayEngine<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DisplayEngine")
            .field("canvas", &self.canvas.borrow().len())
            .field("double_buffered", &self.is_double_buffered())
            .field("overlay", &self.has_overlay())
            .field("canvas_protect", &self.canvas_protect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Crgb;
    use crate::ledfb::LedFb;
    use crate::sink::{LedSink, MemorySink, SinkCell};

    fn engine(len: usize) -> (Rc<SinkCell<MemorySink<Crgb>>>, DisplayEngine<Crgb>) {
        let mem = MemorySink::<Crgb>::shared();
        let sink: SharedSink<Crgb> = mem.clone();
        (mem, DisplayEngine::new(sink, len).unwrap())
    }

    #[test]
    fn plain_show_pushes_canvas() {
        let (mem, mut e) = engine(3);
        e.buffer().borrow_mut().fill(Crgb::RED);
        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::RED; 3]);
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));
    }

    #[test]
    fn overlay_key_pixels_show_canvas() {
        let (mem, mut e) = engine(4);
        e.buffer().borrow_mut().fill(Crgb::RED);
        let ovr = e.overlay();
        *ovr.borrow_mut().at_mut(1) = Crgb::GREEN;
        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::RED, Crgb::GREEN, Crgb::RED, Crgb::RED]);
        // unprotected: drawn straight into the canvas
        assert_eq!(*e.buffer().borrow().at(1), Crgb::GREEN);
    }

    #[test]
    fn protected_canvas_is_untouched() {
        let mem = MemorySink::<Crgb>::shared();
        let sink: SharedSink<Crgb> = mem.clone();
        let mut e = DisplayEngine::with_config(
            sink,
            4,
            EngineConfig::default().with_canvas_protect(true),
        )
        .unwrap();
        e.buffer().borrow_mut().fill(Crgb::RED);
        let ovr = e.overlay();
        ovr.borrow_mut().fill(Crgb::BLUE);
        *ovr.borrow_mut().at_mut(2) = Crgb::BLACK;

        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::BLUE, Crgb::BLUE, Crgb::RED, Crgb::BLUE]);
        assert!(e.buffer().borrow().data().iter().all(|c| *c == Crgb::RED));
        assert!(!e.buffer().borrow().is_bound());
        assert!(!e.is_double_buffered());

        // overlay gone: binding returns to canvas, frame is canvas again
        drop(ovr);
        e.show();
        assert!(e.buffer().borrow().is_bound());
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));
        assert_eq!(mem.borrow().frame(), &[Crgb::RED; 4]);
        assert!(!e.has_overlay());
    }

    #[test]
    fn dropping_protection_releases_back_buffer() {
        let (mem, mut e) = engine(2);
        e.set_canvas_protect(true);
        let ovr = e.overlay();
        ovr.borrow_mut().fill(Crgb::WHITE);
        e.show();
        assert!(!e.buffer().borrow().is_bound());

        e.set_canvas_protect(false);
        e.show();
        assert!(e.buffer().borrow().is_bound());
        assert_eq!(mem.borrow().frame(), &[Crgb::WHITE; 2]);
        assert_eq!(*e.buffer().borrow().at(0), Crgb::WHITE);
    }

    #[test]
    fn overlay_is_reused_while_alive() {
        let (_mem, mut e) = engine(2);
        let a = e.overlay();
        let b = e.overlay();
        assert!(Rc::ptr_eq(&a, &b));
        drop(a);
        drop(b);
        assert!(!e.has_overlay());
        assert_eq!(e.overlay().borrow().len(), 2);
    }

    #[test]
    fn custom_key_color() {
        let mem = MemorySink::<u16>::shared();
        let sink: SharedSink<u16> = mem.clone();
        let mut e = DisplayEngine::with_config(
            sink,
            2,
            EngineConfig::default().with_transparent_color(0xF81F),
        )
        .unwrap();
        e.buffer().borrow_mut().fill(0x07E0);
        let ovr = e.overlay();
        assert_eq!(ovr.borrow().data(), &[0xF81F, 0xF81F]);
        *ovr.borrow_mut().at_mut(0) = 0x0000;
        e.show();
        assert_eq!(mem.borrow().frame(), &[0x0000, 0x07E0]);
    }

    #[test]
    fn mismatched_overlay_is_skipped() {
        let (mem, mut e) = engine(4);
        e.buffer().borrow_mut().fill(Crgb::RED);
        let ovr = e.overlay();
        ovr.borrow_mut().resize(2).unwrap();
        ovr.borrow_mut().fill(Crgb::BLUE);
        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::RED; 4]);
    }

    #[test]
    fn double_buffer_flip() {
        let (mem, mut e) = engine(3);
        e.buffer().borrow_mut().fill(Crgb::RED);
        e.double_buffer(true);
        assert!(e.is_double_buffered());
        assert!(!e.toggle_buffer());

        let back = LedFb::with_store(3, 1, e.active_buffer());
        back.fill(Crgb::GREEN);
        e.flip_buffer();

        assert!(e.buffer().borrow().data().iter().all(|c| *c == Crgb::GREEN));
        assert!(e.back_buffer().borrow().data().iter().all(|c| *c == Crgb::RED));
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));
        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::GREEN; 3]);
    }

    #[test]
    fn toggle_without_back_buffer_keeps_canvas() {
        let (_mem, mut e) = engine(1);
        assert!(e.toggle_buffer());
        assert!(Rc::ptr_eq(&e.active_buffer(), &e.buffer()));
        assert!(Rc::ptr_eq(&e.back_buffer(), &e.buffer()));
    }

    #[test]
    fn disabling_double_buffer_resets_active() {
        let (mem, mut e) = engine(2);
        e.double_buffer(true);
        e.toggle_buffer();
        e.double_buffer(false);
        assert!(!e.is_double_buffered());
        assert!(Rc::ptr_eq(&e.active_buffer(), &e.buffer()));
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));
    }

    #[test]
    fn copies_between_buffers() {
        let (_mem, mut e) = engine(2);
        e.double_buffer(true);
        e.buffer().borrow_mut().fill(Crgb::BLUE);
        e.copy_front_to_back();
        assert_eq!(e.back_buffer().borrow().data(), &[Crgb::BLUE; 2]);
        e.back_buffer().borrow_mut().fill(Crgb::WHITE);
        e.copy_back_to_front();
        assert_eq!(e.buffer().borrow().data(), &[Crgb::WHITE; 2]);
    }

    #[test]
    fn clear_blanks_everything_and_pushes() {
        let (mem, mut e) = engine(2);
        e.double_buffer(true);
        e.buffer().borrow_mut().fill(Crgb::RED);
        e.back_buffer().borrow_mut().fill(Crgb::RED);
        let ovr = e.overlay();
        ovr.borrow_mut().fill(Crgb::RED);
        e.clear();
        assert_eq!(mem.borrow().frame(), &[Crgb::BLACK; 2]);
        assert_eq!(ovr.borrow().data(), &[Crgb::BLACK; 2]);
        assert_eq!(e.back_buffer().borrow().data(), &[Crgb::BLACK; 2]);
    }

    #[test]
    fn existing_canvas_bound_elsewhere_is_refused() {
        let other = MemorySink::<Crgb>::shared();
        let other: SharedSink<Crgb> = other;
        let canvas = Rc::new(RefCell::new(BoundBuffer::new(4)));
        canvas.borrow_mut().bind(&other).unwrap();

        let mem = MemorySink::<Crgb>::shared();
        let sink: SharedSink<Crgb> = mem;
        let res = DisplayEngine::with_canvas(sink.clone(), canvas.clone(), EngineConfig::default());
        assert_eq!(res.err(), Some(LedFbError::AlreadyBound));

        canvas.borrow_mut().unbind();
        assert!(DisplayEngine::with_canvas(sink, canvas, EngineConfig::default()).is_ok());
    }

    #[test]
    fn brightness_is_forwarded() {
        let mem = MemorySink::<Crgb>::shared();
        let sink: SharedSink<Crgb> = mem.clone();
        let e = DisplayEngine::with_config(sink, 1, EngineConfig::default().with_brightness(40))
            .unwrap();
        assert_eq!(mem.borrow().brightness(), 40);
        assert_eq!(e.brightness(200), 200);
    }

    struct FixedSink;

    impl LedSink<Crgb> for FixedSink {
        fn attach(&mut self, _source: &[Crgb]) {}
        fn push(&mut self, _pixels: &[Crgb]) {}
        fn resizable(&self) -> bool {
            false
        }
    }

    #[test]
    fn resize_follows_sink_geometry() {
        let (mem, mut e) = engine(2);
        e.double_buffer(true);
        assert_eq!(e.resize(6), Ok(()));
        assert_eq!(e.back_buffer().borrow().len(), 6);
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));

        let fixed: SharedSink<Crgb> = SinkCell::shared(FixedSink);
        let mut e = DisplayEngine::new(fixed, 4).unwrap();
        assert_eq!(e.resize(8), Err(LedFbError::Unsupported));
        assert_eq!(e.buffer().borrow().len(), 4);
    }

    #[test]
    fn engine_sink_cannot_be_bound_twice() {
        let (mem, mut e) = engine(3);
        let sink: SharedSink<Crgb> = mem.clone();
        e.buffer().borrow_mut().fill(Crgb::RED);

        let mut intruder = BoundBuffer::new(1);
        assert_eq!(intruder.bind(&sink), Err(LedFbError::AlreadyBound));
        drop(intruder);
        assert_eq!(DisplayEngine::new(sink, 3).err(), Some(LedFbError::AlreadyBound));

        assert!(e.buffer().borrow().is_bound());
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));
        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::RED; 3]);
    }

    #[test]
    fn client_back_buffer_receives_composite() {
        let (mem, mut e) = engine(3);
        e.double_buffer(true);
        e.back_buffer().borrow_mut().fill(Crgb::GREEN);
        e.buffer().borrow_mut().fill(Crgb::RED);
        e.set_canvas_protect(true);
        let ovr = e.overlay();
        *ovr.borrow_mut().at_mut(0) = Crgb::BLUE;

        e.show();
        let back = e.back_buffer();
        assert!(!e.buffer().borrow().is_bound());
        assert!(back.borrow().is_bound());
        assert!(mem.borrow().is_attached_to(back.borrow().data()));
        assert_eq!(mem.borrow().frame(), &[Crgb::BLUE, Crgb::RED, Crgb::RED]);
        assert_eq!(back.borrow().data(), mem.borrow().frame());
        assert!(e.buffer().borrow().data().iter().all(|c| *c == Crgb::RED));

        drop(ovr);
        e.show();
        assert!(e.buffer().borrow().is_bound());
        assert!(e.is_double_buffered());
        assert!(Rc::ptr_eq(&e.back_buffer(), &back));
        assert_eq!(mem.borrow().frame(), &[Crgb::RED; 3]);
    }

    #[test]
    fn double_buffer_adopts_compositor_buffer() {
        let (mem, mut e) = engine(2);
        e.set_canvas_protect(true);
        let ovr = e.overlay();
        ovr.borrow_mut().fill(Crgb::WHITE);
        e.show();
        assert!(!e.is_double_buffered());
        assert!(Rc::ptr_eq(&e.back_buffer(), &e.buffer()));

        e.double_buffer(true);
        assert!(e.is_double_buffered());
        let back = e.back_buffer();
        assert!(!Rc::ptr_eq(&back, &e.buffer()));
        assert!(back.borrow().is_bound());
        assert!(mem.borrow().is_attached_to(back.borrow().data()));

        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::WHITE; 2]);
        assert_eq!(e.buffer().borrow().data(), &[Crgb::BLACK; 2]);

        drop(ovr);
        e.show();
        assert!(e.buffer().borrow().is_bound());
        assert!(e.is_double_buffered());
        assert!(Rc::ptr_eq(&e.back_buffer(), &back));
        assert_eq!(mem.borrow().frame(), &[Crgb::BLACK; 2]);
    }

    #[test]
    fn disabling_double_buffer_while_compositing() {
        let (mem, mut e) = engine(2);
        e.buffer().borrow_mut().fill(Crgb::RED);
        e.set_canvas_protect(true);
        let ovr = e.overlay();
        *ovr.borrow_mut().at_mut(1) = Crgb::BLUE;
        e.show();
        assert!(!e.buffer().borrow().is_bound());

        e.double_buffer(false);
        assert!(e.buffer().borrow().is_bound());
        assert!(mem.borrow().is_attached_to(e.buffer().borrow().data()));
        assert!(!e.is_double_buffered());
        assert!(Rc::ptr_eq(&e.back_buffer(), &e.buffer()));

        e.show();
        assert!(!e.buffer().borrow().is_bound());
        assert_eq!(mem.borrow().frame(), &[Crgb::RED, Crgb::BLUE]);
        assert_eq!(e.buffer().borrow().data(), &[Crgb::RED; 2]);
    }

    #[test]
    fn new_key_color_rekeys_overlay() {
        let (mem, mut e) = engine(2);
        e.buffer().borrow_mut().fill(Crgb::RED);
        let ovr = e.overlay();
        *ovr.borrow_mut().at_mut(1) = Crgb::GREEN;

        e.set_transparent_color(Crgb::BLUE);
        assert_eq!(ovr.borrow().data(), &[Crgb::BLUE, Crgb::GREEN]);
        e.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::RED, Crgb::GREEN]);
        assert_eq!(e.buffer().borrow().data(), &[Crgb::RED, Crgb::GREEN]);
    }
}
