//! Free-hand region selection: stroke capture, display → native mapping, mask
//! rasterization and the session lifecycle that ties them together.

mod mapper;
mod raster;
mod render;
mod session;
mod stroke;

use crate::compose::ComposeError;
use crate::geometry::{DisplaySize, ImageSize};
use crate::state::StateError;
use thiserror::Error;

pub use mapper::{map_to_native, ScaleFactor};
pub use raster::{rasterize, FillRule, Mask, MASK_CLEAR, MASK_OPAQUE};
pub use render::{render, DrawCommand};
pub use session::{Instruction, SelectionSession};
pub use stroke::{StrokePoints, StrokeRecorder, MIN_SELECTION_POINTS};

pub type SelectionResult<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection needs at least {required} points, got {actual}")]
    InsufficientSelection { actual: usize, required: usize },
    #[error("instruction needs non-empty text or a reference image")]
    EmptyInstruction,
    #[error("invalid selection polygon: {reason}")]
    InvalidSelection { reason: &'static str },
    #[error("image layout is not available yet")]
    LayoutUnavailable,
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl SelectionError {
    /// Conditions the user fixes by redrawing or re-entering input.
    pub const fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientSelection { .. } | Self::EmptyInstruction | Self::LayoutUnavailable
        )
    }
}

/// Live geometry of the displayed base image. Implementations must report the
/// current rendered size at call time.
pub trait ImageLayout {
    fn native_size(&self) -> ImageSize;
    fn display_size(&self) -> DisplaySize;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSnapshot {
    pub native: ImageSize,
    pub display: DisplaySize,
}

impl LayoutSnapshot {
    pub const fn new(native: ImageSize, display: DisplaySize) -> Self {
        Self { native, display }
    }
}

impl ImageLayout for LayoutSnapshot {
    fn native_size(&self) -> ImageSize {
        self.native
    }

    fn display_size(&self) -> DisplaySize {
        self.display
    }
}
