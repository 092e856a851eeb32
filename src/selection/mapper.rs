use crate::geometry::{DisplaySize, ImageSize, Point};

/// Ratio between native pixels and display pixels on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactor {
    /// Derives the display → native scale. Returns `None` while the image element has no
    /// layout yet (zero or non-finite display extent).
    pub fn between(native: ImageSize, display: DisplaySize) -> Option<Self> {
        if !display.is_laid_out() || native.is_empty() {
            return None;
        }
        Some(Self {
            x: f64::from(native.width) / display.width,
            y: f64::from(native.height) / display.height,
        })
    }

    pub fn to_native(self, point: Point) -> Point {
        Point::new(point.x * self.x, point.y * self.y)
    }

    pub fn to_display(self, point: Point) -> Point {
        Point::new(point.x / self.x, point.y / self.y)
    }
}

pub fn map_to_native<'a>(
    points: impl IntoIterator<Item = &'a Point>,
    scale: ScaleFactor,
) -> Vec<Point> {
    points
        .into_iter()
        .map(|point| scale.to_native(*point))
        .collect()
}
