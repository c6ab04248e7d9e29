//! Stroke-granular erasing.

use super::stroke::Stroke;
use super::width::WidthModel;
use crate::input::PointerId;
use kurbo::Point;
use std::collections::BTreeMap;

/// Whether a disc of `radius` at `center` intersects the segment `from`-`to`.
pub fn touches(from: Point, to: Point, center: Point, radius: f64) -> bool {
    let segment = to - from;
    let length_sq = segment.hypot2();
    let closest = if length_sq == 0.0 {
        from
    } else {
        let t = ((center - from).dot(segment) / length_sq).clamp(0.0, 1.0);
        from + segment * t
    };
    (center - closest).hypot2() <= radius * radius
}

/// Mark every live stroke touched by an eraser disc of diameter
/// `eraser_width` as erased. Returns how many strokes changed.
pub fn erase(strokes: &mut [Stroke], center: Point, eraser_width: f64, model: &WidthModel) -> usize {
    let mut erased = 0;
    for stroke in strokes.iter_mut().filter(|s| !s.is_erased()) {
        let hit = model.segments(stroke).any(|segment| {
            let radius = (eraser_width + segment.width) / 2.0;
            touches(segment.from.position, segment.to.position, center, radius)
        });
        if hit {
            stroke.erase();
            erased += 1;
        }
    }
    if erased > 0 {
        log::debug!("eraser at ({:.1}, {:.1}) removed {erased} strokes", center.x, center.y);
    }
    erased
}

/// Live eraser cursors, one per pressed pointer.
#[derive(Debug, Clone, Default)]
pub struct Eraser {
    cursors: BTreeMap<PointerId, Point>,
}

impl Eraser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, id: PointerId, position: Point) {
        self.cursors.insert(id, position);
    }

    /// Move a pressed cursor. Returns false for pointers not erasing.
    pub fn move_to(&mut self, id: PointerId, position: Point) -> bool {
        match self.cursors.get_mut(&id) {
            Some(cursor) => {
                *cursor = position;
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, id: PointerId) -> bool {
        self.cursors.remove(&id).is_some()
    }

    pub fn is_erasing(&self, id: PointerId) -> bool {
        self.cursors.contains_key(&id)
    }

    pub fn cursors(&self) -> impl Iterator<Item = Point> + '_ {
        self.cursors.values().copied()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }
}
