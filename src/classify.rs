//! Assignment of four anchors to the corners of a rectangle
//!
//! The plane is split once along X and once along Y through the middle
//! anchors. With one anchor in each of the four partitions the assignment is
//! immediate. When two anchors share one partition and the other two share the
//! opposite one, an X split and a Y split can disagree; the anchors are then
//! ordered counterclockwise around their barycenter and only a split whose
//! corner sequence follows that order is kept. If both or neither do, the
//! configuration is ambiguous.
//!
//! Corners follow the mathematical orientation: "bottom" is the smaller Y.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::anchors::{AnchorSet, Pixel, MAX_ANCHORS};
use crate::error::{Ambiguity, Result};

/// Anchors labeled by the rectangle corner they map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CornerAssignment {
    pub bottom_left: Pixel,
    pub bottom_right: Pixel,
    pub top_right: Pixel,
    pub top_left: Pixel,
}

impl CornerAssignment {
    /// Corners in counterclockwise order, starting bottom-left
    pub fn ccw(&self) -> [Pixel; 4] {
        [self.bottom_left, self.bottom_right, self.top_right, self.top_left]
    }
}

/// Position of a vector relative to a reference vector, both taken from the
/// barycenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Counterclockwise of the reference
    Left,
    /// Clockwise of the reference
    Right,
    /// Same direction
    Equal,
    /// Collinear, opposite direction
    Opposed,
    /// One of the vectors is null
    Undef,
}

/// Offset from the barycenter, scaled by 4 so it stays integral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Offset {
    x: i64,
    y: i64,
}

impl Offset {
    fn from_barycenter(p: Pixel, sum_x: i64, sum_y: i64) -> Self {
        Self {
            x: 4 * p.x as i64 - sum_x,
            y: 4 * p.y as i64 - sum_y,
        }
    }

    fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// Position of `p` relative to `reference`
///
/// Uses the sign of the cross product, then of the dot product when the
/// vectors are collinear. Exact for any pair of `Coord` anchors.
fn position(p: Offset, reference: Offset) -> Position {
    if p.is_zero() || reference.is_zero() {
        return Position::Undef;
    }
    let cross = reference.x as i128 * p.y as i128 - reference.y as i128 * p.x as i128;
    match cross.cmp(&0) {
        Ordering::Greater => Position::Left,
        Ordering::Less => Position::Right,
        Ordering::Equal => {
            let dot = reference.x as i128 * p.x as i128 + reference.y as i128 * p.y as i128;
            if dot > 0 {
                Position::Equal
            } else {
                Position::Opposed
            }
        }
    }
}

/// Classify the anchors of a full set
pub fn classify(anchors: &AnchorSet) -> Result<CornerAssignment> {
    let pixels = anchors.four()?;
    classify_pixels(&pixels)
}

/// Classify four anchors given in any order
pub fn classify_pixels(pixels: &[Pixel; MAX_ANCHORS]) -> Result<CornerAssignment> {
    for i in 0..MAX_ANCHORS {
        if pixels[i + 1..].contains(&pixels[i]) {
            return Err(Ambiguity::DuplicateAnchor.into());
        }
    }

    let sum_x: i64 = pixels.iter().map(|p| p.x as i64).sum();
    let sum_y: i64 = pixels.iter().map(|p| p.y as i64).sum();
    let offsets = pixels.map(|p| Offset::from_barycenter(p, sum_x, sum_y));
    if offsets.iter().any(Offset::is_zero) {
        return Err(Ambiguity::AnchorAtBarycenter.into());
    }

    let mut xsorted = *pixels;
    xsorted.sort_by_key(|p| p.x);
    let mut ysorted = *pixels;
    ysorted.sort_by_key(|p| p.y);

    let x_tie = xsorted[1].x == xsorted[2].x;
    let y_tie = ysorted[1].y == ysorted[2].y;

    if !x_tie && !y_tie && one_per_quadrant(&xsorted) {
        let corners = split_by_x(&xsorted);
        debug!("Anchors fall one per quadrant: {:?}", corners);
        return Ok(corners);
    }

    if x_tie || y_tie {
        return Err(Ambiguity::SplitLineTie.into());
    }

    classify_pairs(pixels, &offsets, &xsorted, &ysorted)
}

/// Both X halves hold an anchor below and above the other half's anchors
fn one_per_quadrant(xsorted: &[Pixel; 4]) -> bool {
    let (left, right) = xsorted.split_at(2);
    let mut below = false;
    let mut above = false;
    for l in left {
        for r in right {
            below |= l.y < r.y;
            above |= l.y > r.y;
        }
    }
    below && above
}

/// Left pair becomes bottom-left/top-left, right pair bottom-right/top-right
fn split_by_x(xsorted: &[Pixel; 4]) -> CornerAssignment {
    let (bottom_left, top_left) = order_by(xsorted[0], xsorted[1], |p| p.y);
    let (bottom_right, top_right) = order_by(xsorted[2], xsorted[3], |p| p.y);
    CornerAssignment {
        bottom_left,
        bottom_right,
        top_right,
        top_left,
    }
}

/// Lower pair becomes bottom-left/bottom-right, upper pair top-left/top-right
fn split_by_y(ysorted: &[Pixel; 4]) -> CornerAssignment {
    let (bottom_left, bottom_right) = order_by(ysorted[0], ysorted[1], |p| p.x);
    let (top_left, top_right) = order_by(ysorted[2], ysorted[3], |p| p.x);
    CornerAssignment {
        bottom_left,
        bottom_right,
        top_right,
        top_left,
    }
}

fn order_by(a: Pixel, b: Pixel, key: impl Fn(&Pixel) -> i32) -> (Pixel, Pixel) {
    if key(&a) < key(&b) {
        (a, b)
    } else {
        (b, a)
    }
}

/// Two anchors in one diagonal partition, two in the other
fn classify_pairs(
    pixels: &[Pixel; 4],
    offsets: &[Offset; 4],
    xsorted: &[Pixel; 4],
    ysorted: &[Pixel; 4],
) -> Result<CornerAssignment> {
    // Opposed pairs are fine: half a turn apart still orders strictly
    for i in 0..4 {
        for j in (i + 1)..4 {
            match position(offsets[i], offsets[j]) {
                Position::Undef => return Err(Ambiguity::AnchorAtBarycenter.into()),
                Position::Equal => return Err(Ambiguity::CollinearWithBarycenter.into()),
                _ => {}
            }
        }
    }

    let order = angular_order(pixels, offsets);

    let x_candidate = (xsorted[0].y != xsorted[1].y && xsorted[2].y != xsorted[3].y)
        .then(|| split_by_x(xsorted))
        .filter(|c| follows(&order, c));
    let y_candidate = (ysorted[0].x != ysorted[1].x && ysorted[2].x != ysorted[3].x)
        .then(|| split_by_y(ysorted))
        .filter(|c| follows(&order, c));

    debug!(
        "Paired anchors, angular order {:?}: x split {:?}, y split {:?}",
        order, x_candidate, y_candidate
    );

    match (x_candidate, y_candidate) {
        (Some(corners), None) | (None, Some(corners)) => Ok(corners),
        (Some(_), Some(_)) => Err(Ambiguity::BothSplitsFit.into()),
        (None, None) => Err(Ambiguity::NoSplitFits.into()),
    }
}

/// Sort anchors counterclockwise around the barycenter, starting from the
/// first anchor
///
/// No anchor may sit on the barycenter and no two may point the same way
/// from it, which makes the comparison a strict total order.
fn angular_order(pixels: &[Pixel; 4], offsets: &[Offset; 4]) -> [Pixel; 4] {
    let reference = offsets[0];

    // Half-turn sector relative to the reference
    let sector = |o: Offset| match position(o, reference) {
        Position::Equal | Position::Undef => 0,
        Position::Left => 1,
        Position::Opposed => 2,
        Position::Right => 3,
    };

    let mut indices = [0usize, 1, 2, 3];
    indices.sort_by(|&a, &b| {
        let (oa, ob) = (offsets[a], offsets[b]);
        sector(oa).cmp(&sector(ob)).then_with(|| match position(ob, oa) {
            Position::Left => Ordering::Less,
            Position::Right => Ordering::Greater,
            _ => Ordering::Equal,
        })
    });
    indices.map(|i| pixels[i])
}

/// Whether the corners appear, cyclically, in the angular order
fn follows(order: &[Pixel; 4], corners: &CornerAssignment) -> bool {
    let ccw = corners.ccw();
    let Some(start) = order.iter().position(|&p| p == ccw[0]) else {
        return false;
    };
    (1..4).all(|k| order[(start + k) % 4] == ccw[k])
}
