//! Row-major pixel storage shared by the source and the rectified picture

use crate::error::{Result, TransformError};

/// Four 8-bit channels, colour then alpha
///
/// The core never interprets the channels, so the byte order of the
/// surrounding picture format is irrelevant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_rgba(rgba: [u8; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Number of cells in a `width` x `height` grid, if addressable
pub fn pixel_count(width: usize, height: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .ok_or(TransformError::TooLarge { width, height })
}

/// Allocate `len` copies of `value`, reporting allocator refusal as an error
pub(crate) fn try_filled<T: Clone>(value: T, len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| TransformError::Allocation(len))?;
    data.resize(len, value);
    Ok(data)
}

/// A width x height grid of colours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl PixelBuffer {
    /// A buffer filled with transparent black
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::filled(width, height, Color::default())
    }

    pub fn filled(width: usize, height: usize, color: Color) -> Result<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: try_filled(color, len)?,
        })
    }

    /// Wrap existing row-major storage
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Color>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(TransformError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.index(x, y)])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.pixels[index] = color;
        }
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Rows as slices, top row first
    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        // chunks() rejects a zero size
        self.pixels.chunks(self.width.max(1))
    }

    pub fn into_pixels(self) -> Vec<Color> {
        self.pixels
    }
}

/// Per-cell flag telling which target pixels received a source pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CoverageMask {
    width: usize,
    height: usize,
    covered: Vec<bool>,
}

impl CoverageMask {
    pub(crate) fn new(width: usize, height: usize) -> Result<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            covered: try_filled(false, len)?,
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub(crate) fn is_covered(&self, x: usize, y: usize) -> bool {
        self.covered[y * self.width + x]
    }

    #[inline]
    pub(crate) fn cover(&mut self, index: usize) {
        self.covered[index] = true;
    }

    pub(crate) fn count(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.covered.iter().all(|&c| c)
    }
}
