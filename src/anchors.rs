//! Anchor pixels and the set of control points picked on the source picture

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransformError};

/// Signed pixel coordinate, negative values are off-canvas positions
pub type Coord = i32;

/// Maximum number of anchors in a set
pub const MAX_ANCHORS: usize = 4;

/// A discrete position on the picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: Coord,
    pub y: Coord,
}

impl Pixel {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(Coord, Coord)> for Pixel {
    fn from((x, y): (Coord, Coord)) -> Self {
        Self { x, y }
    }
}

impl From<[Coord; 2]> for Pixel {
    fn from([x, y]: [Coord; 2]) -> Self {
        Self { x, y }
    }
}

/// Parses `x,y`, optionally wrapped in parentheses
impl FromStr for Pixel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let inner = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')');
        let (x, y) = inner
            .split_once(',')
            .ok_or_else(|| format!("expected `x,y`, got `{}`", s))?;
        let x = x
            .trim()
            .parse::<Coord>()
            .map_err(|e| format!("invalid x in `{}`: {}", s, e))?;
        let y = y
            .trim()
            .parse::<Coord>()
            .map_err(|e| format!("invalid y in `{}`: {}", s, e))?;
        Ok(Self { x, y })
    }
}

/// A real-valued position, only used for intermediate geometry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box spanned by the anchors, bounds included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: Pixel,
    pub max: Pixel,
}

impl BoundingBox {
    pub fn width(&self) -> u64 {
        (self.max.x as i64 - self.min.x as i64) as u64
    }

    pub fn height(&self) -> u64 {
        (self.max.y as i64 - self.min.y as i64) as u64
    }
}

/// Unordered collection of at most 4 anchors
///
/// Insertion order carries no meaning for the geometry, it only decides
/// which anchor [`AnchorSet::remove_near`] drops first when markers overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchorSet {
    pixels: [Pixel; MAX_ANCHORS],
    count: usize,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a slice, dropping repeated pixels
    pub fn from_pixels(pixels: &[Pixel]) -> Result<Self> {
        let mut set = Self::new();
        for &p in pixels {
            set.insert(p)?;
        }
        Ok(set)
    }

    /// Add an anchor
    ///
    /// Returns `false` when the pixel already is an anchor.
    pub fn insert(&mut self, pixel: Pixel) -> Result<bool> {
        if self.contains(pixel) {
            return Ok(false);
        }
        if self.is_full() {
            return Err(TransformError::AnchorLimit);
        }
        self.pixels[self.count] = pixel;
        self.count += 1;
        Ok(true)
    }

    /// Remove the newest anchor within `radius` (Chebyshev) of `pixel`
    ///
    /// The last anchor takes the freed slot.
    pub fn remove_near(&mut self, pixel: Pixel, radius: Coord) -> Option<Pixel> {
        let radius = (radius as i64).abs();
        let index = (0..self.count).rev().find(|&i| {
            let a = self.pixels[i];
            (a.x as i64 - pixel.x as i64).abs() <= radius
                && (a.y as i64 - pixel.y as i64).abs() <= radius
        })?;

        let removed = self.pixels[index];
        self.count -= 1;
        self.pixels[index] = self.pixels[self.count];
        self.pixels[self.count] = Pixel::default();
        Some(removed)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains(&self, pixel: Pixel) -> bool {
        self.as_slice().contains(&pixel)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_ANCHORS
    }

    pub fn as_slice(&self) -> &[Pixel] {
        &self.pixels[..self.count]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pixel> {
        self.as_slice().iter()
    }

    /// The four anchors, or an error if the set is not full
    pub fn four(&self) -> Result<[Pixel; MAX_ANCHORS]> {
        if self.count != MAX_ANCHORS {
            return Err(TransformError::AnchorCount(self.count));
        }
        Ok(self.pixels)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let (first, rest) = self.as_slice().split_first()?;
        let mut min = *first;
        let mut max = *first;
        for p in rest {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(BoundingBox { min, max })
    }

    /// Arithmetic mean of the anchors
    pub fn barycenter(&self) -> Option<Point> {
        if self.is_empty() {
            return None;
        }
        let n = self.count as f64;
        let (sx, sy) = self
            .iter()
            .fold((0i64, 0i64), |(sx, sy), p| (sx + p.x as i64, sy + p.y as i64));
        Some(Point::new(sx as f64 / n, sy as f64 / n))
    }
}
