//! Unwarp - four-anchor perspective rectification
//!
//! Pick four anchors around a skewed rectangle on a picture, and [`transform`]
//! produces an upright `width` x `height` picture of that rectangle:
//!
//! 1. the anchors are assigned to rectangle corners ([`classify`]),
//! 2. the homography sending them onto the target corners is solved
//!    ([`PerspectiveTransform`]),
//! 3. every source pixel is projected forward into the target,
//! 4. target pixels nothing landed on are filled from their neighbourhood.
//!
//! The remaining modules are the pieces a front end needs around that core:
//! anchor editing, target sizing, image files, configuration and a marker
//! preview.

pub mod anchors;
pub mod buffer;
pub mod classify;
pub mod config;
pub mod error;
mod fill;
pub mod image_io;
mod mapper;
pub mod preview;
pub mod sizing;
pub mod transform;

use tracing::debug;

pub use anchors::{AnchorSet, BoundingBox, Pixel, Point, MAX_ANCHORS};
pub use buffer::{Color, PixelBuffer};
pub use classify::{classify, CornerAssignment};
pub use error::{Ambiguity, Result, TransformError};
pub use sizing::{target_size, AspectRatio};
pub use transform::{PerspectiveTransform, TransformReport};

/// Rectify the quadrilateral spanned by `anchors` into a `width` x `height`
/// picture
///
/// On success every pixel of the returned buffer holds either a projected
/// source pixel or the mean of its nearest projected neighbours. No buffer
/// is returned on failure.
pub fn transform(
    source: &PixelBuffer,
    anchors: &AnchorSet,
    width: usize,
    height: usize,
) -> Result<PixelBuffer> {
    // Refuse oversized targets before doing any work
    buffer::pixel_count(width, height)?;

    let perspective = PerspectiveTransform::solve(anchors, width, height)?;
    debug!("Corner assignment: {:?}", perspective.corners());

    let (mut target, mut coverage) = mapper::map_forward(&perspective, source, width, height)?;
    fill::fill_holes(&mut target, &mut coverage)?;

    Ok(target)
}
