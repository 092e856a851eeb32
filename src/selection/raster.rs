use image::{GrayImage, Luma, Rgba, RgbaImage};
use serde::Deserialize;

use super::stroke::MIN_SELECTION_POINTS;
use super::{SelectionError, SelectionResult};
use crate::geometry::{ImageSize, Point};

pub const MASK_OPAQUE: u8 = 255;
pub const MASK_CLEAR: u8 = 0;

/// Interior test used when a scanline crosses the polygon boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonZero,
}

impl FillRule {
    const fn is_inside(self, winding: i32, crossings: u32) -> bool {
        match self {
            Self::EvenOdd => crossings % 2 == 1,
            Self::NonZero => winding != 0,
        }
    }
}

/// Single-channel selection raster at native resolution. Selected pixels are
/// `MASK_OPAQUE`, everything else `MASK_CLEAR`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn empty(size: ImageSize) -> Self {
        Self {
            image: GrayImage::new(size.width, size.height),
        }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.image.width(), self.image.height())
    }

    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        if x >= self.image.width() || y >= self.image.height() {
            return false;
        }
        self.image.get_pixel(x, y).0[0] == MASK_OPAQUE
    }

    /// Number of selected pixels.
    pub fn coverage(&self) -> u64 {
        self.image
            .as_raw()
            .iter()
            .filter(|value| **value != MASK_CLEAR)
            .count() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|value| *value == MASK_CLEAR)
    }

    pub fn as_luma(&self) -> &GrayImage {
        &self.image
    }

    /// White where selected, fully transparent elsewhere.
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            let value = self.image.get_pixel(x, y).0[0];
            if value == MASK_CLEAR {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, value])
            }
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Crossing {
    x: f64,
    winding: i32,
}

/// Fills the polygon formed by `points` (implicitly closed) into a mask of `size`.
///
/// Pixels are sampled at their centres. Each edge covers the half-open vertical range
/// `[min_y, max_y)`, so shared vertices are counted once and horizontal edges never
/// produce crossings.
pub fn rasterize(points: &[Point], size: ImageSize, rule: FillRule) -> SelectionResult<Mask> {
    if points.len() < MIN_SELECTION_POINTS {
        return Err(SelectionError::InvalidSelection {
            reason: "polygon needs at least three points",
        });
    }
    if points
        .iter()
        .any(|point| !point.x.is_finite() || !point.y.is_finite())
    {
        return Err(SelectionError::InvalidSelection {
            reason: "polygon contains non-finite coordinates",
        });
    }

    let mut image = GrayImage::new(size.width, size.height);
    if size.is_empty() {
        return Ok(Mask { image });
    }

    let (min_y, max_y) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), point| {
            (low.min(point.y), high.max(point.y))
        });
    let first_row = centre_index(min_y, size.height);
    let end_row = centre_index(max_y, size.height);

    let mut crossings = Vec::with_capacity(points.len());
    for row in first_row..end_row {
        let sample_y = f64::from(row) + 0.5;
        collect_crossings(points, sample_y, &mut crossings);
        crossings.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut winding = 0;
        let mut count = 0_u32;
        for pair in crossings.windows(2) {
            winding += pair[0].winding;
            count += 1;
            if !rule.is_inside(winding, count) {
                continue;
            }
            let start = centre_index(pair[0].x, size.width);
            let end = centre_index(pair[1].x, size.width);
            for column in start..end {
                image.put_pixel(column, row, Luma([MASK_OPAQUE]));
            }
        }
    }

    Ok(Mask { image })
}

fn collect_crossings(points: &[Point], sample_y: f64, crossings: &mut Vec<Crossing>) {
    crossings.clear();
    let count = points.len();
    for (index, start) in points.iter().enumerate() {
        let end = points[(index + 1) % count];
        let winding = if start.y <= sample_y && end.y > sample_y {
            1
        } else if end.y <= sample_y && start.y > sample_y {
            -1
        } else {
            continue;
        };
        let t = (sample_y - start.y) / (end.y - start.y);
        crossings.push(Crossing {
            x: start.x + t * (end.x - start.x),
            winding,
        });
    }
}

/// First pixel index whose centre lies at or beyond `coordinate`, clamped to `[0, limit]`.
fn centre_index(coordinate: f64, limit: u32) -> u32 {
    let index = (coordinate - 0.5).ceil();
    if index <= 0.0 {
        0
    } else if index >= f64::from(limit) {
        limit
    } else {
        index as u32
    }
}
