//! Pixel buffer wired to an output sink.
//!
//! A [`BoundBuffer`] holds at most one sink handle. Whoever holds the handle
//! is the only buffer whose data reaches that sink: [`show`](BoundBuffer::show)
//! pushes the buffer's own storage, and every operation that moves the
//! storage (resize, swap, copy with a length change) re-attaches the sink
//! before returning. `rebind` moves the handle between two buffers without
//! touching pixel data.
//!
//! The claim is recorded on the sink itself, so a second buffer holding a
//! clone of the same handle cannot bind it. Dropping a buffer that is still
//! bound releases the claim and points the sink at a one-pixel black
//! placeholder.

use alloc::rc::Rc;

use tracing::{debug, warn};

use crate::buffer::{PixelBuffer, PixelStore};
use crate::color::LedColor;
use crate::error::{LedFbError, Result};
use crate::sink::SharedSink;

pub struct BoundBuffer<C: LedColor> {
    buf: PixelBuffer<C>,
    sink: Option<SharedSink<C>>,
}

impl<C: LedColor> BoundBuffer<C> {
    /// Unbound buffer of `len` black pixels.
    pub fn new(len: usize) -> Self {
        Self { buf: PixelBuffer::new(len), sink: None }
    }

    /// Bind to `sink` and attach it to this buffer's storage.
    ///
    /// Binding again to the same sink is a no-op re-attach. Binding while
    /// bound to a different sink fails, and so does binding a sink some other
    /// buffer has claimed. Either way the current bindings are left alone.
    pub fn bind(&mut self, sink: &SharedSink<C>) -> Result<()> {
        if let Some(current) = &self.sink {
            if !Rc::ptr_eq(current, sink) {
                warn!("bind refused: buffer already bound to another sink");
                return Err(LedFbError::AlreadyBound);
            }
            self.reset_sink();
            return Ok(());
        }
        if !sink.claim() {
            warn!("bind refused: sink is held by another buffer");
            return Err(LedFbError::AlreadyBound);
        }
        self.sink = Some(sink.clone());
        self.reset_sink();
        debug!(len = self.buf.len(), "buffer bound to sink");
        Ok(())
    }

    /// Release the binding. The sink is pointed at the placeholder first.
    pub fn unbind(&mut self) -> Option<SharedSink<C>> {
        let sink = self.sink.take()?;
        sink.release();
        sink.borrow_mut().attach(&[C::BLACK]);
        Some(sink)
    }

    pub fn is_bound(&self) -> bool {
        self.sink.is_some()
    }

    /// Whether this buffer holds `sink`.
    pub fn is_bound_to(&self, sink: &SharedSink<C>) -> bool {
        self.sink.as_ref().is_some_and(|s| Rc::ptr_eq(s, sink))
    }

    /// Exchange bindings (not data) with `other`.
    ///
    /// If only one side is bound the other one takes the binding over. The
    /// sink claims travel with the handles.
    pub fn rebind(&mut self, other: &mut BoundBuffer<C>) {
        core::mem::swap(&mut self.sink, &mut other.sink);
        self.reset_sink();
        other.reset_sink();
    }

    /// Zero-copy content exchange, both sinks follow their new storage.
    pub fn swap(&mut self, other: &mut BoundBuffer<C>) {
        self.buf.swap(&mut other.buf);
        self.reset_sink();
        other.reset_sink();
    }

    /// Zero-copy content exchange with an unbound buffer.
    pub fn swap_with(&mut self, other: &mut PixelBuffer<C>) {
        self.buf.swap(other);
        self.reset_sink();
    }

    /// Copy pixels from `src`, re-attaching if the length changed.
    pub fn copy_from(&mut self, src: &[C]) {
        let len = self.buf.len();
        self.buf.copy_from(src);
        if len != self.buf.len() {
            self.reset_sink();
        }
    }

    /// Push this buffer's data through its binding. No-op when unbound.
    pub fn show(&self) {
        if let Some(sink) = &self.sink {
            sink.borrow_mut().push(self.buf.data());
        }
    }

    /// The unbound pixel storage.
    pub fn buffer(&self) -> &PixelBuffer<C> {
        &self.buf
    }

    fn reset_sink(&self) {
        if let Some(sink) = &self.sink {
            sink.borrow_mut().attach(self.buf.data());
        }
    }
}

impl<C: LedColor> PixelStore<C> for BoundBuffer<C> {
    fn data(&self) -> &[C] {
        self.buf.data()
    }

    fn data_mut(&mut self) -> &mut [C] {
        self.buf.data_mut()
    }

    #[inline]
    fn at(&self, idx: usize) -> &C {
        self.buf.at(idx)
    }

    #[inline]
    fn at_mut(&mut self, idx: usize) -> &mut C {
        self.buf.at_mut(idx)
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        let result = self.buf.resize(len);
        self.reset_sink();
        result
    }
}

impl<C: LedColor> Drop for BoundBuffer<C> {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.release();
            // the sink may be mid-call into us; leave it alone then
            if let Some(mut s) = sink.try_borrow_mut() {
                s.attach(&[C::BLACK]);
            }
        }
    }
}

impl<C: LedColor> core::fmt::Debug for BoundBuffer<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoundBuffer")
            .field("len", &self.buf.len())
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Crgb;
    use crate::sink::{MemorySink, SinkCell};
    use alloc::rc::Rc;

    fn sink() -> (Rc<SinkCell<MemorySink<Crgb>>>, SharedSink<Crgb>) {
        let s = MemorySink::<Crgb>::shared();
        let shared: SharedSink<Crgb> = s.clone();
        (s, shared)
    }

    #[test]
    fn bind_attaches() {
        let (mem, sink) = sink();
        let mut b = BoundBuffer::new(4);
        assert!(b.bind(&sink).is_ok());
        assert!(b.is_bound_to(&sink));
        assert!(mem.borrow().is_attached_to(b.data()));
    }

    #[test]
    fn bind_is_exclusive_and_idempotent() {
        let (_a_mem, a) = sink();
        let (b_mem, b) = sink();
        let mut buf = BoundBuffer::new(4);
        assert_eq!(buf.bind(&a), Ok(()));
        assert_eq!(buf.bind(&b), Err(LedFbError::AlreadyBound));
        assert!(buf.is_bound_to(&a));
        assert_eq!(b_mem.borrow().attach_count(), 0);
        assert_eq!(buf.bind(&a), Ok(()));
    }

    #[test]
    fn second_buffer_cannot_take_a_held_sink() {
        let (mem, sink) = sink();
        let mut first = BoundBuffer::new(4);
        first.bind(&sink).unwrap();

        let mut second = BoundBuffer::new(2);
        let stolen = sink.clone();
        assert_eq!(second.bind(&stolen), Err(LedFbError::AlreadyBound));
        assert!(!second.is_bound());
        drop(second);
        assert!(mem.borrow().is_attached_to(first.data()));
        assert!(sink.is_claimed());

        first.unbind();
        assert!(!sink.is_claimed());
        let mut third = BoundBuffer::new(2);
        assert_eq!(third.bind(&stolen), Ok(()));
        assert!(mem.borrow().is_attached_to(third.data()));
    }

    #[test]
    fn dropping_a_bound_buffer_frees_the_sink() {
        let (_mem, sink) = sink();
        {
            let mut b = BoundBuffer::new(1);
            b.bind(&sink).unwrap();
        }
        assert!(!sink.is_claimed());
        assert_eq!(BoundBuffer::new(1).bind(&sink), Ok(()));
    }

    #[test]
    fn rebind_keeps_the_claim() {
        let (_mem, sink) = sink();
        let mut front = BoundBuffer::new(1);
        let mut back = BoundBuffer::new(1);
        front.bind(&sink).unwrap();
        front.rebind(&mut back);
        assert!(sink.is_claimed());
        assert_eq!(front.bind(&sink), Err(LedFbError::AlreadyBound));
        assert!(back.is_bound_to(&sink));
    }

    #[test]
    fn resize_reattaches() {
        let (mem, sink) = sink();
        let mut b = BoundBuffer::new(2);
        b.bind(&sink).unwrap();
        b.fill(Crgb::RED);
        assert_eq!(b.resize(64), Ok(()));
        assert!(mem.borrow().is_attached_to(b.data()));
        assert_eq!(mem.borrow().source().map(|s| s.1), Some(64));
        assert!(b.data().iter().all(|c| *c == Crgb::BLACK));
    }

    #[test]
    fn swap_resyncs_both_sinks() {
        let (a_mem, a) = sink();
        let (b_mem, b) = sink();
        let mut x = BoundBuffer::new(3);
        let mut y = BoundBuffer::new(5);
        x.bind(&a).unwrap();
        y.bind(&b).unwrap();
        let (x_ptr, y_ptr) = (x.data().as_ptr(), y.data().as_ptr());

        x.swap(&mut y);
        assert_eq!(x.data().as_ptr(), y_ptr);
        assert_eq!(y.data().as_ptr(), x_ptr);
        assert!(a_mem.borrow().is_attached_to(x.data()));
        assert!(b_mem.borrow().is_attached_to(y.data()));
        assert_eq!(a_mem.borrow().source(), Some((y_ptr as usize, 5)));
    }

    #[test]
    fn rebind_moves_the_binding() {
        let (mem, sink) = sink();
        let mut front = BoundBuffer::new(2);
        let mut back = BoundBuffer::new(2);
        front.bind(&sink).unwrap();
        back.fill(Crgb::GREEN);
        let data_ptr = front.data().as_ptr();

        front.rebind(&mut back);
        assert!(!front.is_bound());
        assert!(back.is_bound_to(&sink));
        assert_eq!(front.data().as_ptr(), data_ptr);
        assert!(mem.borrow().is_attached_to(back.data()));

        back.show();
        assert_eq!(mem.borrow().frame(), &[Crgb::GREEN; 2]);
    }

    #[test]
    fn rebind_swaps_two_bindings() {
        let (a_mem, a) = sink();
        let (b_mem, b) = sink();
        let mut x = BoundBuffer::new(1);
        let mut y = BoundBuffer::new(1);
        x.bind(&a).unwrap();
        y.bind(&b).unwrap();
        x.rebind(&mut y);
        assert!(x.is_bound_to(&b) && y.is_bound_to(&a));
        assert!(a_mem.borrow().is_attached_to(y.data()));
        assert!(b_mem.borrow().is_attached_to(x.data()));
    }

    #[test]
    fn drop_redirects_to_placeholder() {
        let (mem, sink) = sink();
        {
            let mut b = BoundBuffer::new(8);
            b.bind(&sink).unwrap();
        }
        assert_eq!(mem.borrow().source().map(|s| s.1), Some(1));
    }

    #[test]
    fn unbind_returns_handle() {
        let (mem, sink) = sink();
        let mut b = BoundBuffer::new(8);
        b.bind(&sink).unwrap();
        let handle = b.unbind().unwrap();
        assert!(Rc::ptr_eq(&handle, &sink));
        assert!(!b.is_bound());
        assert_eq!(mem.borrow().source().map(|s| s.1), Some(1));
        b.show();
        assert_eq!(mem.borrow().push_count(), 0);
    }

    #[test]
    fn copy_from_with_new_length_reattaches() {
        let (mem, sink) = sink();
        let mut b = BoundBuffer::new(2);
        b.bind(&sink).unwrap();
        b.copy_from(&[Crgb::RED; 6]);
        assert!(mem.borrow().is_attached_to(b.data()));
        assert_eq!(b.len(), 6);
    }

    #[test]
    fn swap_with_plain_buffer() {
        let (mem, sink) = sink();
        let mut b = BoundBuffer::new(2);
        b.bind(&sink).unwrap();
        let mut plain = PixelBuffer::new(2);
        plain.fill(Crgb::BLUE);
        b.swap_with(&mut plain);
        assert!(mem.borrow().is_attached_to(b.data()));
        assert_eq!(*b.at(1), Crgb::BLUE);
        assert_eq!(*b.buffer().at(0), Crgb::BLUE);
    }
}
