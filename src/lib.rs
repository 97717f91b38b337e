//! Pixel framebuffer for addressable LED displays.
//!
//! - [`buffer`] / [`bound`] - pixel storage, optionally bound to an output sink
//! - [`layout`] - stripe and tile topologies, `(x, y)` to chain index
//! - [`ledfb`] - 2D view over a store
//! - [`display`] - canvas / overlay / back buffer compositing engine
//! - [`gfx`] - drawing adapter, embedded-graphics `DrawTarget`
//! - [`panel`] - sink driving an embedded-graphics panel

#![no_std]

extern crate alloc;

pub mod bound;
pub mod buffer;
pub mod color;
pub mod display;
pub mod error;
pub mod gfx;
pub mod layout;
pub mod ledfb;
pub mod sink;

#[cfg(feature = "panel")]
pub mod panel;

pub use bound::BoundBuffer;
pub use buffer::{PixelBuffer, PixelStore, SharedStore};
pub use color::{Crgb, LedColor};
pub use display::{DisplayEngine, EngineConfig, Overlay, SharedBound};
pub use error::{LedFbError, Result};
pub use gfx::{GfxBuffer, LedFbGfx, Rotation};
pub use layout::{LedStripe, LedTiles, Transpose};
pub use ledfb::LedFb;
pub use sink::{LedSink, MemorySink, SharedSink, SinkCell};

#[cfg(feature = "panel")]
pub use panel::PanelSink;
