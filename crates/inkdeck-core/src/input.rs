//! Pointer input events for unified mouse/touch/stylus handling.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Stable identifier of a pointer contact, unique while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerId(pub i64);

/// A raw pointer event in surface coordinates.
///
/// `time` is the host clock in milliseconds; it is only compared and
/// subtracted, never interpreted as wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        id: PointerId,
        position: Point,
        time: f64,
    },
    Move {
        id: PointerId,
        position: Point,
        time: f64,
    },
    Up {
        id: PointerId,
        position: Point,
        time: f64,
    },
    Cancel {
        id: PointerId,
        position: Point,
        time: f64,
    },
}

impl PointerEvent {
    pub fn down(id: i64, x: f64, y: f64, time: f64) -> Self {
        Self::Down {
            id: PointerId(id),
            position: Point::new(x, y),
            time,
        }
    }

    pub fn moved(id: i64, x: f64, y: f64, time: f64) -> Self {
        Self::Move {
            id: PointerId(id),
            position: Point::new(x, y),
            time,
        }
    }

    pub fn up(id: i64, x: f64, y: f64, time: f64) -> Self {
        Self::Up {
            id: PointerId(id),
            position: Point::new(x, y),
            time,
        }
    }

    pub fn cancel(id: i64, x: f64, y: f64, time: f64) -> Self {
        Self::Cancel {
            id: PointerId(id),
            position: Point::new(x, y),
            time,
        }
    }

    pub fn id(&self) -> PointerId {
        match *self {
            Self::Down { id, .. } | Self::Move { id, .. } | Self::Up { id, .. } | Self::Cancel { id, .. } => id,
        }
    }

    pub fn position(&self) -> Point {
        match *self {
            Self::Down { position, .. }
            | Self::Move { position, .. }
            | Self::Up { position, .. }
            | Self::Cancel { position, .. } => position,
        }
    }

    pub fn time(&self) -> f64 {
        match *self {
            Self::Down { time, .. } | Self::Move { time, .. } | Self::Up { time, .. } | Self::Cancel { time, .. } => time,
        }
    }

    /// Whether this event ends the contact.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::Up { .. } | Self::Cancel { .. })
    }
}

/// Whether `position` has left `origin` by at least `threshold` on either axis.
pub fn exceeds_threshold(origin: Point, position: Point, threshold: f64) -> bool {
    let delta: Vec2 = position - origin;
    delta.x.abs() >= threshold || delta.y.abs() >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let event = PointerEvent::moved(3, 10.0, 20.0, 42.0);
        assert_eq!(event.id(), PointerId(3));
        assert_eq!(event.position(), Point::new(10.0, 20.0));
        assert!((event.time() - 42.0).abs() < f64::EPSILON);
        assert!(!event.is_end());
        assert!(PointerEvent::cancel(3, 0.0, 0.0, 0.0).is_end());
    }

    #[test]
    fn test_decode_host_event() {
        let json = r#"{"phase":"down","id":7,"position":{"x":1.5,"y":2.0},"time":100}"#;
        let event: PointerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, PointerEvent::down(7, 1.5, 2.0, 100.0));
    }

    #[test]
    fn test_threshold_on_either_axis() {
        let origin = Point::new(100.0, 100.0);
        assert!(!exceeds_threshold(origin, Point::new(109.0, 91.0), 10.0));
        assert!(exceeds_threshold(origin, Point::new(110.0, 100.0), 10.0));
        assert!(exceeds_threshold(origin, Point::new(100.0, 90.0), 10.0));
    }
}
