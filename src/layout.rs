//! LED topology mapping.
//!
//! Translates logical `(x, y)` canvas coordinates (origin top-left, X to the
//! right, Y downwards) into the linear index of the pixel along the physical
//! LED chain.
//!
//! - [`LedStripe`]: a rectangle wired as one continuous chain: row or column
//!   primary axis, optional zigzag ("snake") chaining, optional mirroring of
//!   either axis
//! - [`LedTiles`]: identical stripe tiles chained together, where the chain
//!   of tiles itself follows a stripe layout
//!
//! Mapping is pure and unchecked: callers guarantee `x < w` and `y < h`.
//! [`LedFb`](crate::LedFb) does that before calling into a mapper.
//!
//! Snake alternation is evaluated on mirrored coordinates: with a vertical
//! mirror the zigzag starts from the bottom row, with a horizontal mirror
//! (vertical stripes) from the rightmost column.

/// Maps `(x, y)` on a `w`×`h` canvas to a linear pixel index.
pub trait Transpose {
    fn transpose(&self, w: usize, h: usize, x: usize, y: usize) -> usize;
}

impl<F> Transpose for F
where
    F: Fn(usize, usize, usize, usize) -> usize,
{
    #[inline]
    fn transpose(&self, w: usize, h: usize, x: usize, y: usize) -> usize {
        self(w, h, x, y)
    }
}

/// Plain row-by-row mapping, the default for every view.
#[inline]
pub fn map_2d(w: usize, _h: usize, x: usize, y: usize) -> usize {
    y * w + x
}

/// Single-chain rectangular layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LedStripe {
    snake: bool,
    vertical: bool,
    vmirror: bool,
    hmirror: bool,
}

impl Default for LedStripe {
    /// Zigzag rows, starting top-left.
    fn default() -> Self {
        Self::new(true, false, false, false)
    }
}

impl LedStripe {
    /// * `snake` - zigzag chaining, every other row (column) runs backwards
    /// * `vertical` - pixels are chained along columns instead of rows
    /// * `vmirror` - chain starts at the bottom edge
    /// * `hmirror` - chain starts at the right edge
    pub const fn new(snake: bool, vertical: bool, vmirror: bool, hmirror: bool) -> Self {
        Self { snake, vertical, vmirror, hmirror }
    }

    pub fn snake(&self) -> bool { self.snake }
    pub fn vertical(&self) -> bool { self.vertical }
    pub fn vmirror(&self) -> bool { self.vmirror }
    pub fn hmirror(&self) -> bool { self.hmirror }

    pub fn set_snake(&mut self, m: bool) { self.snake = m; }
    pub fn set_vertical(&mut self, m: bool) { self.vertical = m; }
    pub fn set_vmirror(&mut self, m: bool) { self.vmirror = m; }
    pub fn set_hmirror(&mut self, m: bool) { self.hmirror = m; }

    pub fn set_layout(&mut self, snake: bool, vertical: bool, vmirror: bool, hmirror: bool) {
        *self = Self::new(snake, vertical, vmirror, hmirror);
    }
}

impl Transpose for LedStripe {
    fn transpose(&self, w: usize, h: usize, x: usize, y: usize) -> usize {
        if self.vertical {
            // columns, counted after horizontal mirroring
            let xx = if self.hmirror { w - x - 1 } else { x };
            let flip = self.snake && xx % 2 == 1;
            let yy = if self.vmirror != flip { h - y - 1 } else { y };
            xx * h + yy
        } else {
            // rows, counted after vertical mirroring
            let yy = if self.vmirror { h - y - 1 } else { y };
            let flip = self.snake && yy % 2 == 1;
            let xx = if self.hmirror != flip { w - x - 1 } else { x };
            yy * w + xx
        }
    }
}

/// Canvas built from equally sized, equally oriented [`LedStripe`] tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LedTiles {
    tile_w: usize,
    tile_h: usize,
    tile_wcnt: usize,
    tile_hcnt: usize,
    /// Wiring inside every tile.
    pub stripe: LedStripe,
    /// How the tiles themselves are chained.
    pub tile_layout: LedStripe,
}

impl Default for LedTiles {
    /// One 16x16 zigzag tile.
    fn default() -> Self {
        Self::new(16, 16, 1, 1, LedStripe::new(false, false, false, false))
    }
}

impl LedTiles {
    /// * `tile_w`, `tile_h` - single tile dimensions
    /// * `tile_wcnt`, `tile_hcnt` - number of tiles in a row and in a column
    /// * `tile_layout` - chaining order of the tiles
    ///
    /// Pixel wiring inside tiles starts as [`LedStripe::default`]; change it
    /// through [`stripe`](Self::stripe).
    pub const fn new(
        tile_w: usize,
        tile_h: usize,
        tile_wcnt: usize,
        tile_hcnt: usize,
        tile_layout: LedStripe,
    ) -> Self {
        Self {
            tile_w,
            tile_h,
            tile_wcnt,
            tile_hcnt,
            stripe: LedStripe::new(true, false, false, false),
            tile_layout,
        }
    }

    pub fn canvas_w(&self) -> usize { self.tile_w * self.tile_wcnt }
    pub fn canvas_h(&self) -> usize { self.tile_h * self.tile_hcnt }
    pub fn tile_w(&self) -> usize { self.tile_w }
    pub fn tile_h(&self) -> usize { self.tile_h }
    pub fn tile_wcnt(&self) -> usize { self.tile_wcnt }
    pub fn tile_hcnt(&self) -> usize { self.tile_hcnt }

    /// Resize tiles and tile counts, canvas dimensions follow.
    pub fn set_tile_dimensions(&mut self, w: usize, h: usize, wcnt: usize, hcnt: usize) {
        self.tile_w = w;
        self.tile_h = h;
        self.tile_wcnt = wcnt;
        self.tile_hcnt = hcnt;
    }

    fn tiled_transpose(&self, x: usize, y: usize) -> usize {
        let tile_num = self.tile_layout.transpose(
            self.tile_wcnt,
            self.tile_hcnt,
            x / self.tile_w,
            y / self.tile_h,
        );
        let px_in_tile =
            self.stripe
                .transpose(self.tile_w, self.tile_h, x % self.tile_w, y % self.tile_h);
        self.tile_w * self.tile_h * tile_num + px_in_tile
    }
}

impl Transpose for LedTiles {
    /// `w`, `h` are the full canvas dimensions.
    fn transpose(&self, w: usize, h: usize, x: usize, y: usize) -> usize {
        if self.tile_wcnt == 1 && self.tile_hcnt == 1 {
            return self.stripe.transpose(w, h, x, y);
        }
        self.tiled_transpose(x, y)
    }
}
