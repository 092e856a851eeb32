use crate::geometry::Point;

/// Backend-agnostic drawing instruction for the live selection overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    MoveTo(Point),
    LineTo(Point),
    ClosePath,
}

/// Derives the overlay path for a stroke. Consecutive duplicates are dropped; when
/// `closed` is set and at least three distinct points remain, the implicit closing edge
/// is emitted as `ClosePath`.
pub fn render<I>(points: I, closed: bool) -> Vec<DrawCommand>
where
    I: IntoIterator<Item = Point>,
{
    let mut commands = Vec::new();
    let mut previous: Option<Point> = None;
    let mut distinct = 0_usize;

    for point in points {
        if previous == Some(point) {
            continue;
        }
        commands.push(if previous.is_none() {
            DrawCommand::MoveTo(point)
        } else {
            DrawCommand::LineTo(point)
        });
        previous = Some(point);
        distinct += 1;
    }

    if closed && distinct >= 3 {
        commands.push(DrawCommand::ClosePath);
    }
    commands
}
