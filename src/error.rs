//! Error types for the rectification core

use thiserror::Error;

/// Why a set of anchors cannot be assigned to rectangle corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ambiguity {
    /// Two anchors are the same pixel
    #[error("two anchors share the same position")]
    DuplicateAnchor,

    /// The two middle anchors share the splitting coordinate (e.g. a losange)
    #[error("anchors lie on a splitting line")]
    SplitLineTie,

    /// An anchor sits exactly on the barycenter of the four
    #[error("an anchor coincides with the barycenter")]
    AnchorAtBarycenter,

    /// Two anchors point the same way from the barycenter
    #[error("anchors are collinear with the barycenter")]
    CollinearWithBarycenter,

    /// Both the X split and the Y split respect the angular order
    #[error("X and Y splits both fit, the assignment is ambiguous")]
    BothSplitsFit,

    /// Neither split respects the angular order
    #[error("no split matches the angular order of the anchors")]
    NoSplitFits,
}

/// Errors that can occur while rectifying a picture
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Exactly 4 anchors are needed to classify
    #[error("4 anchors required, got {0}")]
    AnchorCount(usize),

    /// An anchor set can hold at most 4 anchors
    #[error("max number of anchors reached")]
    AnchorLimit,

    /// The anchors cannot be unambiguously assigned to corners
    #[error("anchors configuration is not usable: {0}")]
    Ambiguous(#[from] Ambiguity),

    /// The linear system does not yield a usable perspective matrix
    #[error("degenerate perspective system: {0}")]
    Degenerate(String),

    /// Target width or height is zero
    #[error("invalid target dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Target pixel count does not fit in memory addressing
    #[error("target {width}x{height} is too big to be allocated")]
    TooLarge { width: usize, height: usize },

    /// The allocator refused the target buffers
    #[error("failed to allocate {0} pixels")]
    Allocation(usize),

    /// Pixel storage does not match the declared dimensions
    #[error("buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// No source pixel landed inside the target rectangle
    #[error("no source pixel maps into the target rectangle")]
    EmptyCoverage,
}

impl TransformError {
    /// Whether the caller should ask the user to move the anchors
    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            TransformError::AnchorCount(_)
                | TransformError::Ambiguous(_)
                | TransformError::Degenerate(_)
        )
    }
}

/// Result type for rectification operations
pub type Result<T> = std::result::Result<T, TransformError>;
