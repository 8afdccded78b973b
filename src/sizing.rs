//! Target size selection from the anchors and a width:height ratio

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::anchors::{AnchorSet, MAX_ANCHORS};
use crate::error::{Result, TransformError};

/// Width to height proportion of the rectified picture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

impl AspectRatio {
    /// Both sides must be finite and positive
    pub fn new(width: f64, height: f64) -> std::result::Result<Self, String> {
        if !(width.is_finite() && width > 0.0) {
            return Err(format!("invalid ratio width: {}", width));
        }
        if !(height.is_finite() && height > 0.0) {
            return Err(format!("invalid ratio height: {}", height));
        }
        Ok(Self { width, height })
    }

    pub fn value(&self) -> f64 {
        self.width / self.height
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Parses `W:H`, `WxH`, `W/H` or a lone `R` meaning `R:1`
impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (w, h) = s
            .split_once([':', 'x', 'X', '/'])
            .unwrap_or((s, "1"));

        let width = w
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid ratio width: `{}`", w.trim()))?;
        let height = h
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid ratio height: `{}`", h.trim()))?;
        Self::new(width, height)
    }
}

/// Smallest rectangle with the requested ratio containing the anchors'
/// bounding box
///
/// Only one side of the bounding box is enlarged, to the nearest pixel.
pub fn target_size(anchors: &AnchorSet, ratio: AspectRatio) -> Result<(usize, usize)> {
    if anchors.len() != MAX_ANCHORS {
        return Err(TransformError::AnchorCount(anchors.len()));
    }
    let bbox = anchors
        .bounding_box()
        .ok_or(TransformError::AnchorCount(0))?;

    let (bw, bh) = (bbox.width() as f64, bbox.height() as f64);
    if bw == 0.0 && bh == 0.0 {
        return Err(TransformError::InvalidDimensions {
            width: 0,
            height: 0,
        });
    }

    let r = ratio.value();
    let (width, height) = if bw < bh * r {
        ((bh * r).round(), bh)
    } else if bw > bh * r {
        (bw, (bw / r).round())
    } else {
        (bw, bh)
    };

    if !(width < usize::MAX as f64 && height < usize::MAX as f64) {
        return Err(TransformError::TooLarge {
            width: usize::MAX,
            height: usize::MAX,
        });
    }
    Ok(((width as usize).max(1), (height as usize).max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::Pixel;

    fn set(coords: [(i32, i32); 4]) -> AnchorSet {
        AnchorSet::from_pixels(&coords.map(Pixel::from)).unwrap()
    }

    #[test]
    fn test_ratio_parsing() {
        assert_eq!("16:9".parse(), Ok(AspectRatio::new(16.0, 9.0).unwrap()));
        assert_eq!("4x3".parse(), Ok(AspectRatio::new(4.0, 3.0).unwrap()));
        assert_eq!(" 3 / 2 ".parse(), Ok(AspectRatio::new(3.0, 2.0).unwrap()));
        assert_eq!("1.5".parse(), Ok(AspectRatio::new(1.5, 1.0).unwrap()));
    }

    #[test]
    fn test_ratio_rejects_bad_sides() {
        let err = "0:1".parse::<AspectRatio>().unwrap_err();
        assert!(err.starts_with("invalid ratio width"));
        let err = "3:-2".parse::<AspectRatio>().unwrap_err();
        assert!(err.starts_with("invalid ratio height"));
        let err = "a:2".parse::<AspectRatio>().unwrap_err();
        assert!(err.starts_with("invalid ratio width"));
        assert!("2:inf".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_square_ratio_enlarges_short_side() {
        let anchors = set([(10, 10), (110, 12), (108, 60), (12, 58)]);
        // Bounding box is 100x50
        assert_eq!(target_size(&anchors, AspectRatio::default()), Ok((100, 100)));
    }

    #[test]
    fn test_wide_ratio_enlarges_width() {
        let anchors = set([(0, 0), (100, 0), (100, 50), (0, 50)]);
        let ratio = AspectRatio::new(4.0, 1.0).unwrap();
        assert_eq!(target_size(&anchors, ratio), Ok((200, 50)));
        // Already at 2:1
        let ratio = AspectRatio::new(2.0, 1.0).unwrap();
        assert_eq!(target_size(&anchors, ratio), Ok((100, 50)));
    }

    #[test]
    fn test_rounding_to_nearest() {
        let anchors = set([(0, 0), (10, 0), (10, 10), (0, 10)]);
        let ratio = AspectRatio::new(3.0, 1.0).unwrap();
        assert_eq!(target_size(&anchors, ratio), Ok((30, 10)));
        let ratio = AspectRatio::new(1.0, 3.0).unwrap();
        // 10 / (1/3) = 30
        assert_eq!(target_size(&anchors, ratio), Ok((10, 30)));
        let ratio = AspectRatio::new(2.0, 3.0).unwrap();
        // 10 * 3 / 2 = 15
        assert_eq!(target_size(&anchors, ratio), Ok((10, 15)));
    }

    #[test]
    fn test_flat_bounding_box() {
        let anchors = set([(0, 5), (4, 5), (9, 5), (2, 5)]);
        assert_eq!(target_size(&anchors, AspectRatio::default()), Ok((9, 9)));
    }

    #[test]
    fn test_needs_four_anchors() {
        let anchors = AnchorSet::from_pixels(&[Pixel::new(0, 0), Pixel::new(5, 5)]).unwrap();
        assert_eq!(
            target_size(&anchors, AspectRatio::default()),
            Err(TransformError::AnchorCount(2))
        );
    }
}
