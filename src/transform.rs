//! Perspective transformation solving
//!
//! This module derives the homography that sends the four classified anchors
//! onto the corners of the `width` x `height` target rectangle.
//!
//! Each correspondence gives two equations in the nine matrix entries, so the
//! four anchors produce an 8x9 homogeneous system. It is padded with a zero row
//! and decomposed by SVD; the right singular vector of the smallest singular
//! value spans the null space and is the matrix, up to scale.

use nalgebra::{DMatrix, Matrix3, Vector3};
use serde::Serialize;
use tracing::debug;

use crate::anchors::{AnchorSet, Pixel};
use crate::classify::{classify, CornerAssignment};
use crate::error::{Result, TransformError};

/// Size of the padded linear system
const UNKNOWNS: usize = 9;

/// Singular values below this fraction of the largest count as zero
const RANK_TOLERANCE: f64 = 1e-12;

/// Homogeneous coordinates this small relative to the matrix and the input
/// are treated as points on the horizon line
const HORIZON_TOLERANCE: f64 = 1e-13;

const SVD_MAX_ITERATIONS: usize = 1000;

/// Perspective transformation matrix (3x3 homography)
#[derive(Debug, Clone)]
pub struct PerspectiveTransform {
    /// Row-major null vector of the system, unit norm
    matrix: Matrix3<f64>,
    /// Anchors by target corner
    corners: CornerAssignment,
    /// Target dimensions
    width: usize,
    height: usize,
}

/// Serializable view of a solved transform
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub corners: CornerAssignment,
    pub width: usize,
    pub height: usize,
    pub matrix: [[f64; 3]; 3],
}

impl PerspectiveTransform {
    /// Classify the anchors then solve for their target rectangle
    pub fn solve(anchors: &AnchorSet, width: usize, height: usize) -> Result<Self> {
        let corners = classify(anchors)?;
        Self::from_corners(corners, width, height)
    }

    /// Solve for already classified anchors
    pub fn from_corners(corners: CornerAssignment, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidDimensions { width, height });
        }

        let system = build_system(&corners, width as f64, height as f64);
        let matrix = null_vector(system)?;

        let transform = Self {
            matrix,
            corners,
            width,
            height,
        };
        transform.verify()?;

        debug!(
            "Solved perspective for {}x{} target: {:?}",
            width, height, transform.matrix
        );
        Ok(transform)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn corners(&self) -> &CornerAssignment {
        &self.corners
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Transform a point from source to target coordinates
    ///
    /// Returns `None` for points on (or numerically at) the horizon line.
    #[inline]
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let v = self.matrix * Vector3::new(x, y, 1.0);
        let limit = HORIZON_TOLERANCE * (x.abs() + y.abs() + 1.0);
        if !v.z.is_finite() || v.z.abs() <= limit {
            return None;
        }
        let (tx, ty) = (v.x / v.z, v.y / v.z);
        (tx.is_finite() && ty.is_finite()).then_some((tx, ty))
    }

    /// Target pixel a source pixel lands on, rounded half away from zero
    #[inline]
    pub fn project_pixel(&self, p: Pixel) -> Option<(i64, i64)> {
        let (x, y) = self.project(p.x as f64, p.y as f64)?;
        let (x, y) = (x.round(), y.round());
        let range = i64::MIN as f64..=i64::MAX as f64;
        (range.contains(&x) && range.contains(&y)).then_some((x as i64, y as i64))
    }

    /// Target corners, in the order of [`CornerAssignment::ccw`]
    pub fn target_corners(&self) -> [(i64, i64); 4] {
        let (w, h) = (self.width as i64, self.height as i64);
        [(0, 0), (w, 0), (w, h), (0, h)]
    }

    pub fn report(&self) -> TransformReport {
        let m = &self.matrix;
        TransformReport {
            corners: self.corners,
            width: self.width,
            height: self.height,
            matrix: [
                [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
            ],
        }
    }

    /// Every anchor must land exactly on its corner
    ///
    /// Fails for matrices that only satisfy the system by being singular,
    /// e.g. when three anchors are collinear.
    fn verify(&self) -> Result<()> {
        for (anchor, corner) in self.corners.ccw().iter().zip(self.target_corners()) {
            if self.project_pixel(*anchor) != Some(corner) {
                return Err(TransformError::Degenerate(format!(
                    "anchor {} does not map onto corner {:?}",
                    anchor, corner
                )));
            }
        }
        Ok(())
    }
}

/// Solve the perspective transform for a full anchor set
pub fn solve(anchors: &AnchorSet, width: usize, height: usize) -> Result<PerspectiveTransform> {
    PerspectiveTransform::solve(anchors, width, height)
}

/// Build the 9x9 system (last row zero) for the four correspondences
///
/// For a source (x, y) and target (u, v), with unknown rows h1, h2, h3:
///   h1 . (x, y, 1) - u * h3 . (x, y, 1) = 0
///   h2 . (x, y, 1) - v * h3 . (x, y, 1) = 0
/// Targets on u = 0 or v = 0 drop the h3 terms.
fn build_system(corners: &CornerAssignment, w: f64, h: f64) -> [f64; UNKNOWNS * UNKNOWNS] {
    let mut rows = [[0.0f64; UNKNOWNS]; UNKNOWNS];

    let targets = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    for (i, (anchor, (u, v))) in corners.ccw().iter().zip(targets).enumerate() {
        let (x, y) = (anchor.x as f64, anchor.y as f64);

        rows[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u];
        rows[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v];
    }

    let mut flat = [0.0f64; UNKNOWNS * UNKNOWNS];
    for (dst, src) in flat.chunks_exact_mut(UNKNOWNS).zip(rows.iter()) {
        dst.copy_from_slice(src);
    }
    flat
}

/// Right singular vector of the smallest singular value, as a 3x3 matrix
fn null_vector(system: [f64; UNKNOWNS * UNKNOWNS]) -> Result<Matrix3<f64>> {
    let a = DMatrix::from_row_slice(UNKNOWNS, UNKNOWNS, &system);
    let svd = a
        .try_svd(false, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| TransformError::Degenerate("SVD did not converge".into()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| TransformError::Degenerate("SVD returned no right vectors".into()))?;

    let singular = svd.singular_values.as_slice();
    let largest = singular.iter().copied().fold(0.0f64, f64::max);
    if !(largest.is_finite() && largest > 0.0) {
        return Err(TransformError::Degenerate("empty system".into()));
    }

    let rank = singular
        .iter()
        .filter(|&&s| s > largest * RANK_TOLERANCE)
        .count();
    if rank != UNKNOWNS - 1 {
        return Err(TransformError::Degenerate(format!(
            "system has rank {}, expected {}",
            rank,
            UNKNOWNS - 1
        )));
    }

    // nalgebra does not promise any ordering of the singular values
    let smallest = singular
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(UNKNOWNS - 1);

    let h = v_t.row(smallest);
    Ok(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], h[8],
    ))
}
