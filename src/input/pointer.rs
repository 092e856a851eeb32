use crate::geometry::Point;

pub type PointerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Pointer sample in element-relative display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: PointerId,
    pub position: Point,
    pub phase: PointerPhase,
}

impl PointerEvent {
    pub const fn new(pointer_id: PointerId, x: f64, y: f64, phase: PointerPhase) -> Self {
        Self {
            pointer_id,
            position: Point::new(x, y),
            phase,
        }
    }

    pub const fn down(pointer_id: PointerId, x: f64, y: f64) -> Self {
        Self::new(pointer_id, x, y, PointerPhase::Down)
    }

    pub const fn moved(pointer_id: PointerId, x: f64, y: f64) -> Self {
        Self::new(pointer_id, x, y, PointerPhase::Move)
    }

    pub const fn up(pointer_id: PointerId, x: f64, y: f64) -> Self {
        Self::new(pointer_id, x, y, PointerPhase::Up)
    }

    pub const fn ends_gesture(&self) -> bool {
        matches!(self.phase, PointerPhase::Up | PointerPhase::Cancel)
    }
}

/// Converts a raw client-space coordinate into the image element's display space by
/// subtracting the element's bounding-box origin.
pub fn element_relative(raw: Point, element_origin: Point) -> Point {
    Point::new(raw.x - element_origin.x, raw.y - element_origin.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_relative_subtracts_origin() {
        let point = element_relative(Point::new(130.5, 48.0), Point::new(30.5, 8.0));
        assert_eq!(point, Point::new(100.0, 40.0));
    }

    #[test]
    fn up_and_cancel_end_the_gesture() {
        assert!(PointerEvent::up(1, 0.0, 0.0).ends_gesture());
        assert!(PointerEvent::new(1, 0.0, 0.0, PointerPhase::Cancel).ends_gesture());
        assert!(!PointerEvent::moved(1, 0.0, 0.0).ends_gesture());
        assert!(!PointerEvent::down(1, 0.0, 0.0).ends_gesture());
    }
}
