//! Anchor markers drawn over the source picture

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::anchors::{AnchorSet, Pixel};
use crate::config::MarkerConfig;

/// Inner square is this much smaller than the outer one
const BORDER: u32 = 3;

/// Draw every anchor as an outer square with a smaller inner square
///
/// Markers are centred on their anchor and clipped to the picture.
pub fn draw_anchors(image: &mut RgbaImage, anchors: &AnchorSet, marker: &MarkerConfig) {
    for &anchor in anchors.iter() {
        fill_square(image, anchor, marker.size, Rgba(marker.outer));
        fill_square(image, anchor, marker.size.saturating_sub(BORDER), Rgba(marker.inner));
    }
}

fn fill_square(image: &mut RgbaImage, center: Pixel, size: u32, color: Rgba<u8>) {
    if size == 0 {
        return;
    }
    let half = i32::try_from(size / 2).unwrap_or(i32::MAX);
    let rect = Rect::at(center.x.saturating_sub(half), center.y.saturating_sub(half))
        .of_size(size, size);
    draw_filled_rect_mut(image, rect, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn test_marker_layout() {
        let mut image = RgbaImage::from_pixel(40, 40, Rgba(WHITE));
        let anchors = AnchorSet::from_pixels(&[Pixel::new(20, 20)]).unwrap();
        draw_anchors(&mut image, &anchors, &MarkerConfig::default());

        // Outer square spans 15..25, inner square 17..24
        assert_eq!(image.get_pixel(15, 15).0, RED);
        assert_eq!(image.get_pixel(24, 24).0, RED);
        assert_eq!(image.get_pixel(20, 20).0, BLACK);
        assert_eq!(image.get_pixel(17, 17).0, BLACK);
        assert_eq!(image.get_pixel(16, 16).0, RED);
        assert_eq!(image.get_pixel(14, 14).0, WHITE);
        assert_eq!(image.get_pixel(25, 25).0, WHITE);
    }

    #[test]
    fn test_markers_are_clipped() {
        let mut image = RgbaImage::from_pixel(8, 8, Rgba(WHITE));
        let anchors = AnchorSet::from_pixels(&[Pixel::new(0, 0), Pixel::new(-50, 3)]).unwrap();
        draw_anchors(&mut image, &anchors, &MarkerConfig::default());
        assert_eq!(image.get_pixel(0, 0).0, BLACK);
        assert_eq!(image.get_pixel(4, 4).0, RED);
        assert_eq!(image.get_pixel(7, 7).0, WHITE);
    }

    #[test]
    fn test_tiny_marker() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba(WHITE));
        let anchors = AnchorSet::from_pixels(&[Pixel::new(1, 1)]).unwrap();
        let marker = MarkerConfig {
            size: 2,
            ..MarkerConfig::default()
        };
        draw_anchors(&mut image, &anchors, &marker);
        assert_eq!(image.get_pixel(0, 0).0, RED);
        assert_eq!(image.get_pixel(1, 1).0, RED);
        assert_eq!(image.get_pixel(2, 2).0, WHITE);
    }
}
