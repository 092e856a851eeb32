use std::iter::Copied;
use std::slice::Iter;

use crate::geometry::Point;

/// Points of a stroke cannot enclose an area below this count.
pub const MIN_SELECTION_POINTS: usize = 3;

/// Ordered display-space points traced by one pointer-down-to-up gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeRecorder {
    points: Vec<Point>,
    recording: bool,
}

/// Read-only, restartable view over recorded points. Cloning restarts iteration.
pub type StrokePoints<'a> = Copied<Iter<'a, Point>>;

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, start: Point) {
        self.points.clear();
        self.points.push(start);
        self.recording = true;
    }

    /// Appends a point to the gesture in progress; ignored when no gesture is active.
    pub fn extend(&mut self, point: Point) {
        if !self.recording {
            return;
        }
        self.points.push(point);
    }

    /// Ends the gesture. Points are kept so the stroke can be inspected before finalizing.
    pub fn end(&mut self) {
        self.recording = false;
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.recording = false;
    }

    pub fn current_points(&self) -> StrokePoints<'_> {
        self.points.iter().copied()
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_finalizable(&self) -> bool {
        self.points.len() >= MIN_SELECTION_POINTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_discards_previous_points() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(Point::new(1.0, 1.0));
        recorder.extend(Point::new(2.0, 2.0));
        recorder.end();

        recorder.begin(Point::new(9.0, 9.0));
        assert_eq!(recorder.as_slice(), &[Point::new(9.0, 9.0)]);
        assert!(recorder.is_recording());
    }

    #[test]
    fn extend_without_active_gesture_is_ignored() {
        let mut recorder = StrokeRecorder::new();
        recorder.extend(Point::new(5.0, 5.0));
        assert!(recorder.is_empty());

        recorder.begin(Point::new(0.0, 0.0));
        recorder.end();
        recorder.extend(Point::new(5.0, 5.0));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn duplicate_points_are_kept_in_arrival_order() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(Point::new(0.0, 0.0));
        recorder.extend(Point::new(0.0, 0.0));
        recorder.extend(Point::new(3.0, 1.0));
        recorder.extend(Point::new(3.0, 1.0));
        assert_eq!(
            recorder.as_slice(),
            &[
                Point::new(0.0, 0.0),
                Point::new(0.0, 0.0),
                Point::new(3.0, 1.0),
                Point::new(3.0, 1.0),
            ]
        );
        assert!(recorder.is_finalizable());
    }

    #[test]
    fn current_points_can_be_read_repeatedly() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(Point::new(0.0, 0.0));
        recorder.extend(Point::new(1.0, 0.0));

        let view = recorder.current_points();
        let first: Vec<Point> = view.clone().collect();
        let second: Vec<Point> = view.collect();
        assert_eq!(first, second);
        assert_eq!(recorder.current_points().count(), 2);
    }

    #[test]
    fn clear_resets_points_and_gesture() {
        let mut recorder = StrokeRecorder::new();
        recorder.begin(Point::new(0.0, 0.0));
        recorder.clear();
        assert!(recorder.is_empty());
        assert!(!recorder.is_recording());
        recorder.extend(Point::new(1.0, 1.0));
        assert!(recorder.is_empty());
    }
}
