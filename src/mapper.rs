//! Forward mapping of source pixels into the target rectangle

use rayon::prelude::*;
use tracing::debug;

use crate::buffer::{Color, CoverageMask, PixelBuffer};
use crate::error::{Result, TransformError};
use crate::transform::PerspectiveTransform;

/// Source rows projected per parallel task
const BAND_ROWS: usize = 64;

/// Project every source pixel and write it where it lands
///
/// Pixels falling outside `[0, width) x [0, height)` are dropped. When several
/// source pixels land on the same target pixel, the last one in row-major
/// source order wins, whatever the number of threads.
pub(crate) fn map_forward(
    transform: &PerspectiveTransform,
    source: &PixelBuffer,
    width: usize,
    height: usize,
) -> Result<(PixelBuffer, CoverageMask)> {
    let mut target = PixelBuffer::new(width, height)?;
    let mut mask = CoverageMask::new(width, height)?;

    if source.is_empty() {
        return Err(TransformError::EmptyCoverage);
    }

    let src_width = source.width();
    let band_len = src_width.saturating_mul(BAND_ROWS);

    // Bands are projected in parallel, then written back in order
    let bands: Vec<Vec<(usize, Color)>> = source
        .pixels()
        .par_chunks(band_len)
        .enumerate()
        .map(|(band, pixels)| {
            project_band(transform, pixels, band * BAND_ROWS, src_width, width, height)
        })
        .collect();

    let target_pixels = target.pixels_mut();
    for (index, color) in bands.into_iter().flatten() {
        target_pixels[index] = color;
        mask.cover(index);
    }

    let covered = mask.count();
    if covered == 0 {
        return Err(TransformError::EmptyCoverage);
    }
    debug!(
        "Forward mapping covered {} of {} target pixels",
        covered,
        width * height
    );

    Ok((target, mask))
}

/// Target indices and colours for a band of source rows, in source order
fn project_band(
    transform: &PerspectiveTransform,
    pixels: &[Color],
    first_row: usize,
    src_width: usize,
    width: usize,
    height: usize,
) -> Vec<(usize, Color)> {
    let (w, h) = (width as f64, height as f64);
    let mut hits = Vec::new();

    for (row_offset, row) in pixels.chunks(src_width).enumerate() {
        let y = (first_row + row_offset) as f64;
        for (x, &color) in row.iter().enumerate() {
            let Some((tx, ty)) = transform.project(x as f64, y) else {
                continue;
            };
            let (tx, ty) = (tx.round(), ty.round());
            if tx >= 0.0 && tx < w && ty >= 0.0 && ty < h {
                hits.push((ty as usize * width + tx as usize, color));
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::{AnchorSet, Pixel};

    fn transform(coords: [(i32, i32); 4], width: usize, height: usize) -> PerspectiveTransform {
        let anchors = AnchorSet::from_pixels(&coords.map(Pixel::from)).unwrap();
        PerspectiveTransform::solve(&anchors, width, height).unwrap()
    }

    fn gradient(width: usize, height: usize) -> PixelBuffer {
        let pixels = (0..width * height)
            .map(|i| Color::new((i % 256) as u8, (i / 256) as u8, 7, 255))
            .collect();
        PixelBuffer::from_pixels(width, height, pixels).unwrap()
    }

    #[test]
    fn test_identity_mapping_covers_everything() {
        let source = gradient(8, 6);
        let t = transform([(0, 0), (8, 0), (8, 6), (0, 6)], 8, 6);
        let (target, mask) = map_forward(&t, &source, 8, 6).unwrap();
        assert!(mask.is_full());
        assert_eq!(target, source);
    }

    #[test]
    fn test_pixels_outside_the_quad_are_dropped() {
        // Quad is the central part of the source, at scale 1
        let source = gradient(20, 20);
        let t = transform([(5, 5), (15, 5), (15, 15), (5, 15)], 10, 10);
        let (target, mask) = map_forward(&t, &source, 10, 10).unwrap();
        assert!(mask.is_full());
        assert_eq!(target.get(0, 0), source.get(5, 5));
        assert_eq!(target.get(9, 9), source.get(14, 14));
    }

    #[test]
    fn test_upscaling_leaves_holes() {
        let source = gradient(4, 4);
        let t = transform([(0, 0), (4, 0), (4, 4), (0, 4)], 8, 8);
        let (target, mask) = map_forward(&t, &source, 8, 8).unwrap();
        // Each source pixel lands on an even coordinate
        assert_eq!(mask.count(), 16);
        assert!(mask.is_covered(2, 4));
        assert!(!mask.is_covered(1, 0));
        assert_eq!(target.get(2, 4), source.get(1, 2));
        assert_eq!(target.get(1, 0), Some(Color::default()));
    }

    #[test]
    fn test_last_source_pixel_wins() {
        // A third of the size: source 2, 3 and 4 all round to target 1
        let source = gradient(9, 9);
        let t = transform([(0, 0), (9, 0), (9, 9), (0, 9)], 3, 3);
        let (target, mask) = map_forward(&t, &source, 3, 3).unwrap();
        assert!(mask.is_full());
        assert_eq!(target.get(1, 1), source.get(4, 4));
        assert_eq!(target.get(0, 2), source.get(1, 7));
    }

    #[test]
    fn test_bands_keep_source_order() {
        // Taller than one band so that collisions cross band boundaries
        let source = gradient(3, BAND_ROWS * 2 + 5);
        let rows = source.height() as i32;
        let t = transform([(0, 0), (3, 0), (3, rows), (0, rows)], 3, 4);
        let (target, _) = map_forward(&t, &source, 3, 4).unwrap();

        // Recompute sequentially
        let mut expected = PixelBuffer::new(3, 4).unwrap();
        for y in 0..source.height() {
            for x in 0..source.width() {
                if let Some((tx, ty)) = t.project(x as f64, y as f64) {
                    let (tx, ty) = (tx.round(), ty.round());
                    if (0.0..3.0).contains(&tx) && (0.0..4.0).contains(&ty) {
                        expected.set(tx as usize, ty as usize, source.get(x, y).unwrap());
                    }
                }
            }
        }
        assert_eq!(target, expected);
    }

    #[test]
    fn test_empty_coverage() {
        // The quad lies far away from the 4x4 source
        let source = gradient(4, 4);
        let t = transform([(100, 100), (110, 100), (110, 110), (100, 110)], 5, 5);
        let result = map_forward(&t, &source, 5, 5);
        assert_eq!(result.unwrap_err(), TransformError::EmptyCoverage);
    }
}
