//! Tracked pointers and generation-based invalidation.

use crate::input::PointerId;
use kurbo::{Point, Vec2};

/// Role of a pointer within a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

/// A pointer followed by a gesture interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPointer {
    pub id: PointerId,
    /// Where the current gesture segment began.
    pub origin: Point,
    /// Latest observed position.
    pub position: Point,
    pub moved: bool,
    pub role: Role,
}

impl TrackedPointer {
    /// A freshly pressed pointer that has not moved yet.
    pub fn pending(id: PointerId, position: Point) -> Self {
        Self {
            id,
            origin: position,
            position,
            moved: false,
            role: Role::Primary,
        }
    }

    /// A pointer joining an ongoing pan as the second finger.
    pub fn secondary(id: PointerId, position: Point) -> Self {
        Self {
            id,
            origin: position,
            position,
            moved: true,
            role: Role::Secondary,
        }
    }

    /// Mark as moved in the given role.
    pub fn promote(&mut self, role: Role) {
        self.moved = true;
        self.role = role;
    }

    /// Restart displacement measurement from the live position.
    pub fn rebase(&mut self) {
        self.origin = self.position;
    }

    /// Displacement from the origin.
    pub fn displacement(&self) -> Vec2 {
        self.position - self.origin
    }
}

/// Surface-wide invalidation counter.
///
/// Bumping it invalidates every pointer held by every interpreter that
/// has not adopted the new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generation(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    pub fn bump(&mut self) -> u64 {
        self.0 += 1;
        log::debug!("pointer generation bumped to {}", self.0);
        self.0
    }
}

/// An interpreter's cached view of the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerTracker {
    token: u64,
}

impl PointerTracker {
    pub fn new(generation: &Generation) -> Self {
        Self {
            token: generation.current(),
        }
    }

    /// Returns true if the cached token was stale; the caller must drop
    /// its pointers. The token is refreshed either way.
    pub fn refresh(&mut self, generation: &Generation) -> bool {
        let stale = self.token != generation.current();
        self.token = generation.current();
        stale
    }

    pub fn is_current(&self, generation: &Generation) -> bool {
        self.token == generation.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_pointer() {
        let pointer = TrackedPointer::pending(PointerId(1), Point::new(5.0, 5.0));
        assert!(!pointer.moved);
        assert_eq!(pointer.displacement(), Vec2::ZERO);
    }

    #[test]
    fn test_rebase_resets_displacement() {
        let mut pointer = TrackedPointer::pending(PointerId(1), Point::new(0.0, 0.0));
        pointer.position = Point::new(30.0, 40.0);
        assert!((pointer.displacement().hypot() - 50.0).abs() < f64::EPSILON);
        pointer.rebase();
        assert_eq!(pointer.displacement(), Vec2::ZERO);
    }

    #[test]
    fn test_tracker_detects_bump_once() {
        let mut generation = Generation::new();
        let mut tracker = PointerTracker::new(&generation);
        assert!(!tracker.refresh(&generation));

        generation.bump();
        assert!(!tracker.is_current(&generation));
        assert!(tracker.refresh(&generation));
        assert!(!tracker.refresh(&generation));
    }
}
