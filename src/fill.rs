//! Hole filling by averaging on expanding square rings

use rayon::prelude::*;
use tracing::debug;

use crate::buffer::{Color, CoverageMask, PixelBuffer};
use crate::error::{Result, TransformError};

/// Per-channel sums of the covered cells seen on one ring
#[derive(Debug, Default, Clone, Copy)]
struct RingSum {
    channels: [u64; 4],
    count: u64,
}

impl RingSum {
    #[inline]
    fn add(&mut self, color: Color) {
        for (sum, value) in self.channels.iter_mut().zip(color.to_rgba()) {
            *sum += u64::from(value);
        }
        self.count += 1;
    }

    /// Truncated mean, `None` if nothing was accumulated
    fn mean(&self) -> Option<Color> {
        if self.count == 0 {
            return None;
        }
        let c = self.channels.map(|sum| (sum / self.count) as u8);
        Some(Color::from_rgba(c))
    }
}

/// Fill every uncovered pixel of `buffer`, then mark the mask full
///
/// Each hole takes the truncated mean of the covered cells at the smallest
/// Chebyshev distance that has any. Holes are computed from the mapped pixels
/// only: a filled hole never feeds another one. Returns the number of filled
/// pixels.
pub(crate) fn fill_holes(buffer: &mut PixelBuffer, mask: &mut CoverageMask) -> Result<usize> {
    let (width, height) = (buffer.width(), buffer.height());
    debug_assert_eq!((width, height), (mask.width(), mask.height()));

    if mask.is_full() {
        return Ok(0);
    }
    if mask.count() == 0 {
        return Err(TransformError::EmptyCoverage);
    }

    let source: &PixelBuffer = buffer;
    let coverage: &CoverageMask = mask;
    let fills: Vec<(usize, Color)> = (0..height)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..width)
                .filter(move |&x| !coverage.is_covered(x, y))
                .filter_map(move |x| {
                    nearest_ring_mean(source, coverage, x, y).map(|c| (y * width + x, c))
                })
        })
        .collect();

    let pixels = buffer.pixels_mut();
    for &(index, color) in &fills {
        pixels[index] = color;
        mask.cover(index);
    }

    debug!("Filled {} holes", fills.len());
    Ok(fills.len())
}

/// Mean of the covered cells on the first non-empty ring around (x, y)
fn nearest_ring_mean(
    buffer: &PixelBuffer,
    mask: &CoverageMask,
    x: usize,
    y: usize,
) -> Option<Color> {
    let (width, height) = (buffer.width(), buffer.height());
    let reach = x.max(width - 1 - x).max(y).max(height - 1 - y);

    (1..=reach).find_map(|r| ring_sum(buffer, mask, x, y, r).mean())
}

/// Sum of the covered cells at exactly Chebyshev distance `r` from (x, y)
///
/// Edges falling outside the buffer are skipped, the others are clipped, so
/// every in-bounds cell of the ring is visited once.
fn ring_sum(buffer: &PixelBuffer, mask: &CoverageMask, x: usize, y: usize, r: usize) -> RingSum {
    let (width, height) = (buffer.width(), buffer.height());
    let pixels = buffer.pixels();
    let mut sum = RingSum::default();

    let mut visit = |cx: usize, cy: usize| {
        if mask.is_covered(cx, cy) {
            sum.add(pixels[cy * width + cx]);
        }
    };

    let x_min = x.saturating_sub(r);
    let x_max = (x + r).min(width - 1);

    // Top and bottom rows, corners included
    if y >= r {
        (x_min..=x_max).for_each(|cx| visit(cx, y - r));
    }
    if y + r < height {
        (x_min..=x_max).for_each(|cx| visit(cx, y + r));
    }

    // Left and right columns, corners excluded
    let y_min = (y + 1).saturating_sub(r);
    let y_max = (y + r - 1).min(height - 1);
    if x >= r {
        (y_min..=y_max).for_each(|cy| visit(x - r, cy));
    }
    if x + r < width {
        (y_min..=y_max).for_each(|cy| visit(x + r, cy));
    }

    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(v: u8) -> Color {
        Color::new(v, v, v, 255)
    }

    /// Buffer and mask from rows of optional gray levels, `None` for holes
    fn grid(rows: &[&[Option<u8>]]) -> (PixelBuffer, CoverageMask) {
        let height = rows.len();
        let width = rows[0].len();
        let mut buffer = PixelBuffer::new(width, height).unwrap();
        let mut mask = CoverageMask::new(width, height).unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(v) = cell {
                    buffer.set(x, y, gray(*v));
                    mask.cover(y * width + x);
                }
            }
        }
        (buffer, mask)
    }

    #[test]
    fn test_mean_is_truncated() {
        let (mut buffer, mut mask) = grid(&[
            &[Some(1), Some(2), Some(3)],
            &[Some(4), None, Some(5)],
            &[Some(6), Some(7), Some(0)],
        ]);
        assert_eq!(fill_holes(&mut buffer, &mut mask), Ok(1));
        // 28 / 8 = 3.5
        assert_eq!(buffer.get(1, 1), Some(gray(3)));
        assert!(mask.is_full());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut buffer = PixelBuffer::new(3, 1).unwrap();
        let mut mask = CoverageMask::new(3, 1).unwrap();
        buffer.set(0, 0, Color::new(10, 0, 255, 255));
        buffer.set(2, 0, Color::new(21, 1, 254, 0));
        mask.cover(0);
        mask.cover(2);
        fill_holes(&mut buffer, &mut mask).unwrap();
        assert_eq!(buffer.get(1, 0), Some(Color::new(15, 0, 254, 127)));
    }

    #[test]
    fn test_single_row_border() {
        let (mut buffer, mut mask) = grid(&[&[Some(10), None, None, None, Some(20)]]);
        assert_eq!(fill_holes(&mut buffer, &mut mask), Ok(3));
        assert_eq!(buffer.get(1, 0), Some(gray(10)));
        // Neighbours are holes too, the first non-empty ring is at distance 2
        assert_eq!(buffer.get(2, 0), Some(gray(15)));
        assert_eq!(buffer.get(3, 0), Some(gray(20)));
    }

    #[test]
    fn test_single_column_border() {
        let (mut buffer, mut mask) = grid(&[&[None], &[None], &[Some(9)]]);
        fill_holes(&mut buffer, &mut mask).unwrap();
        assert_eq!(buffer.get(0, 0), Some(gray(9)));
        assert_eq!(buffer.get(0, 1), Some(gray(9)));
    }

    #[test]
    fn test_far_corner() {
        let (mut buffer, mut mask) = grid(&[
            &[None, None, None, None],
            &[None, None, None, None],
            &[None, None, None, None],
            &[None, None, None, Some(200)],
        ]);
        assert_eq!(fill_holes(&mut buffer, &mut mask), Ok(15));
        assert!(buffer.pixels().iter().all(|&c| c == gray(200)));
    }

    #[test]
    fn test_ring_skips_inner_cells() {
        // Distance 2 ring of (0, 0) holds (2, 0), (2, 1), (2, 2), (0, 2), (1, 2)
        let (mut buffer, mut mask) = grid(&[
            &[None, None, Some(30)],
            &[None, None, Some(30)],
            &[Some(0), Some(0), Some(30)],
        ]);
        fill_holes(&mut buffer, &mut mask).unwrap();
        // Distance 1 ring of (0, 0) is (1, 0), (0, 1), (1, 1): all holes
        assert_eq!(buffer.get(0, 0), Some(gray(18)));
        // (1, 1) finds the same five cells at distance 1
        assert_eq!(buffer.get(1, 1), Some(gray(18)));
        assert_eq!(buffer.get(1, 0), Some(gray(30)));
    }

    #[test]
    fn test_covered_pixels_untouched() {
        let (mut buffer, mut mask) = grid(&[&[Some(1), Some(2)], &[Some(3), Some(4)]]);
        let before = buffer.clone();
        assert_eq!(fill_holes(&mut buffer, &mut mask), Ok(0));
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_nothing_to_average() {
        let (mut buffer, mut mask) = grid(&[&[None, None]]);
        assert_eq!(
            fill_holes(&mut buffer, &mut mask),
            Err(TransformError::EmptyCoverage)
        );
    }
}
