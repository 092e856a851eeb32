mod pointer;

pub use pointer::{element_relative, PointerEvent, PointerId, PointerPhase};
