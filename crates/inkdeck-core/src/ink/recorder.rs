//! Freehand stroke capture, one stroke per drawing pointer.

use super::stroke::{InkStyle, Sample, Stroke};
use super::timeline::Slide;
use super::width::{Segment, WidthModel};
use crate::input::PointerId;
use crate::scheduler::TaskHandle;
use kurbo::Point;
use std::collections::BTreeMap;

/// Where a new stroke sits on the slide's time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeAnchor {
    pub t0: f64,
    /// The slide must be truncated at the scrub position first.
    pub truncate: bool,
}

#[derive(Debug, Clone)]
struct ActiveStroke {
    stroke: Stroke,
    /// Host time of the first sample.
    begin: f64,
    width: Option<f64>,
    diffuse: Option<TaskHandle>,
}

/// Records in-progress strokes and anchors them on the timeline.
#[derive(Debug, Clone)]
pub struct StrokeRecorder {
    model: WidthModel,
    max_pause: f64,
    active: BTreeMap<PointerId, ActiveStroke>,
    last_release: Option<f64>,
}

impl StrokeRecorder {
    pub fn new(model: WidthModel, max_pause: f64) -> Self {
        Self {
            model,
            max_pause,
            active: BTreeMap::new(),
            last_release: None,
        }
    }

    pub fn model(&self) -> &WidthModel {
        &self.model
    }

    /// Choose `t0` for a stroke starting at host time `now`.
    ///
    /// A scrub position wins: the stroke starts there and later ink is
    /// truncated. Otherwise it follows the latest stroke end, plus the real
    /// pause since the previous release capped at `max_pause`.
    pub fn anchor(&self, slide: Option<&Slide>, now: f64) -> StrokeAnchor {
        let Some(slide) = slide else {
            return StrokeAnchor { t0: 0.0, truncate: false };
        };
        if let Some(time) = slide.scrub_time() {
            return StrokeAnchor { t0: time, truncate: true };
        }
        let t0 = match slide.end_time() {
            Some(end) => {
                let pause = self
                    .last_release
                    .map_or(0.0, |released| (now - released).clamp(0.0, self.max_pause));
                end + pause
            }
            None => 0.0,
        };
        StrokeAnchor { t0, truncate: false }
    }

    /// Open a stroke for `id`.
    pub fn begin(&mut self, id: PointerId, anchor: StrokeAnchor, style: InkStyle, now: f64, position: Point) {
        log::debug!("pointer {} starts stroke at t0={}", id.0, anchor.t0);
        self.active.insert(
            id,
            ActiveStroke {
                stroke: Stroke::begin(anchor.t0, style, position),
                begin: now,
                width: None,
                diffuse: None,
            },
        );
    }

    /// Append a sample and return the segment to paint live.
    pub fn extend(&mut self, id: PointerId, now: f64, position: Point) -> Option<Segment> {
        let active = self.active.get_mut(&id)?;
        let from = *active.stroke.last()?;
        let to = active.stroke.push(now - active.begin, position);
        let width = self.model.next_width(active.width, &from, &to);
        active.width = Some(width);
        log::trace!("pointer {} extends stroke, width {width:.2}", id.0);
        Some(Segment { width, from, to })
    }

    /// Seal the stroke with a final sample at the release position.
    pub fn finish(&mut self, id: PointerId, now: f64, position: Point) -> Option<Stroke> {
        let mut active = self.active.remove(&id)?;
        active.stroke.push(now - active.begin, position);
        self.last_release = Some(now);
        Some(active.stroke)
    }

    /// Style of the stroke `id` is drawing.
    pub fn style(&self, id: PointerId) -> Option<&InkStyle> {
        self.active.get(&id).map(|a| &a.stroke.style)
    }

    /// Resting tail of a stroke at host time `now`: its last point and the
    /// width it would have if the pen stayed still until now.
    pub fn tail(&self, id: PointerId, now: f64) -> Option<(Point, f64)> {
        let active = self.active.get(&id)?;
        let last = *active.stroke.last()?;
        let resting = Sample { t: now - active.begin, position: last.position };
        Some((last.position, self.model.next_width(None, &last, &resting)))
    }

    /// Timer slot of the diffuse refresh for `id`.
    pub fn diffuse_slot(&mut self, id: PointerId) -> Option<&mut Option<TaskHandle>> {
        self.active.get_mut(&id).map(|a| &mut a.diffuse)
    }

    /// Forget the previous release so the next stroke gets no pause.
    pub fn forget_release(&mut self) {
        self.last_release = None;
    }

    pub fn is_drawing(&self, id: PointerId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }
}
