//! Speed-sensitive ink width.
//!
//! Slow movement lays down wide ink, fast movement thin ink:
//!
//! ```text
//! target = min_width + max_width * k / (k + speed^p)
//! width  = smoothing * previous + (1 - smoothing) * target
//! ```
//!
//! with `speed = distance / max(1, dt)` and distance clamped to at least 1.

use super::stroke::{Sample, Stroke};
use crate::config::InkConfig;

/// Width model constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthModel {
    pub min_width: f64,
    pub max_width: f64,
    pub diffuseness: f64,
    pub speed_sensitivity: f64,
    pub smoothing: f64,
}

impl Default for WidthModel {
    fn default() -> Self {
        Self::from_config(&InkConfig::default())
    }
}

/// One drawable piece of a stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub width: f64,
    pub from: Sample,
    pub to: Sample,
}

impl WidthModel {
    pub fn from_config(config: &InkConfig) -> Self {
        Self {
            min_width: config.min_width,
            max_width: config.max_width,
            diffuseness: config.diffuseness,
            speed_sensitivity: config.speed_sensitivity,
            smoothing: config.smoothing,
        }
    }

    /// Unsmoothed width for the move from `prev` to `curr`.
    pub fn target(&self, prev: &Sample, curr: &Sample) -> f64 {
        let dt = (curr.t - prev.t).max(1.0);
        let distance = (curr.position - prev.position).hypot().max(1.0);
        let speed = distance / dt;
        let k = self.diffuseness;
        self.min_width + self.max_width * k / (k + speed.powf(self.speed_sensitivity))
    }

    /// Width of the next segment given the width of the previous one.
    pub fn next_width(&self, previous: Option<f64>, prev: &Sample, curr: &Sample) -> f64 {
        let target = self.target(prev, curr);
        match previous {
            Some(width) => self.smoothing * width + (1.0 - self.smoothing) * target,
            None => target,
        }
    }

    /// Every segment of a stroke with its smoothed width.
    pub fn segments<'a>(&'a self, stroke: &'a Stroke) -> impl Iterator<Item = Segment> + 'a {
        stroke.pairs().scan(None, move |width: &mut Option<f64>, (from, to)| {
            let next = self.next_width(*width, &from, &to);
            *width = Some(next);
            Some(Segment { width: next, from, to })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::InkStyle;
    use kurbo::Point;

    fn model() -> WidthModel {
        WidthModel {
            min_width: 1.0,
            max_width: 6.0,
            diffuseness: 0.3,
            speed_sensitivity: 0.5,
            smoothing: 0.7,
        }
    }

    #[test]
    fn test_slow_is_wider_than_fast() {
        let m = model();
        let start = Sample::new(0.0, 0.0, 0.0);
        let slow = m.target(&start, &Sample::new(100.0, 10.0, 0.0));
        let fast = m.target(&start, &Sample::new(1.0, 100.0, 0.0));
        assert!(slow > fast);
        assert!(slow <= m.min_width + m.max_width);
        assert!(fast >= m.min_width);
    }

    #[test]
    fn test_zero_deltas_are_clamped() {
        let m = model();
        let p = Sample::new(5.0, 3.0, 3.0);
        let width = m.target(&p, &p);
        // speed = 1 / 1
        let expected = 1.0 + 6.0 * 0.3 / 1.3;
        assert!((width - expected).abs() < 1e-12);
        assert!(width.is_finite());
    }

    #[test]
    fn test_moving_average() {
        let m = model();
        let a = Sample::new(0.0, 0.0, 0.0);
        let b = Sample::new(10.0, 40.0, 0.0);
        let target = m.target(&a, &b);
        let smoothed = m.next_width(Some(2.0), &a, &b);
        assert!((smoothed - (0.7 * 2.0 + 0.3 * target)).abs() < 1e-12);
    }

    #[test]
    fn test_segments_chain_widths() {
        let m = model();
        let mut stroke = Stroke::begin(0.0, InkStyle::Color("red".into()), Point::new(0.0, 0.0));
        stroke.push(10.0, Point::new(10.0, 0.0));
        stroke.push(20.0, Point::new(20.0, 0.0));

        let segments: Vec<_> = m.segments(&stroke).collect();
        assert_eq!(segments.len(), 2);
        let first = m.next_width(None, &segments[0].from, &segments[0].to);
        assert!((segments[0].width - first).abs() < 1e-12);
        let second = m.next_width(Some(first), &segments[1].from, &segments[1].to);
        assert!((segments[1].width - second).abs() < 1e-12);
    }
}
