//! Per-slide stroke history and scrub position.

use super::eraser;
use super::stroke::{Knob, Stroke};
use super::width::WidthModel;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Host-assigned slide identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideId(pub String);

impl SlideId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlideId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Timeline state reported to the session owner.
///
/// Both fields are `None` once the slide's history has been cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekState {
    pub knob: Option<usize>,
    pub knobs: Option<Vec<Knob>>,
}

impl SeekState {
    pub fn cleared() -> Self {
        Self { knob: None, knobs: None }
    }

    /// Number of seekable positions, the last meaning "end".
    pub fn max_seek(&self) -> Option<usize> {
        self.knobs.as_ref().map(Vec::len)
    }
}

/// Stroke log of one slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    strokes: Vec<Stroke>,
    /// Scrub position as an index into [`Slide::knobs`]; `None` is the end.
    knob: Option<usize>,
    /// Strokes removed by undo, most recent last.
    redo: Vec<Stroke>,
}

impl Slide {
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Start time and style of every live stroke, sorted and
    /// deduplicated by start time. The latest stroke's style wins a tie.
    pub fn knobs(&self) -> Vec<Knob> {
        let mut knobs: Vec<Knob> = self
            .strokes
            .iter()
            .filter(|s| !s.is_erased())
            .map(|s| Knob { time: s.start_time(), style: s.style.clone() })
            .collect();
        knobs.sort_by(|a, b| a.time.total_cmp(&b.time));
        knobs.dedup_by(|later, kept| {
            let same = later.time == kept.time;
            if same {
                std::mem::swap(&mut later.style, &mut kept.style);
            }
            same
        });
        knobs
    }

    /// Effective scrub index, `knobs().len()` when unset.
    pub fn knob(&self) -> usize {
        let len = self.knobs().len();
        self.knob.map_or(len, |k| k.min(len))
    }

    /// Time at which ink turns "future", if the scrub position is set
    /// before the end.
    pub fn scrub_time(&self) -> Option<f64> {
        let knob = self.knob?;
        self.knobs().get(knob).map(|k| k.time)
    }

    /// Latest end time over all strokes.
    pub fn end_time(&self) -> Option<f64> {
        self.strokes.iter().map(Stroke::end_time).max_by(f64::total_cmp)
    }

    /// Move the scrub position, clamped to the end.
    pub fn seek(&mut self, knob: usize) -> usize {
        let knob = knob.min(self.knobs().len());
        self.knob = Some(knob);
        knob
    }

    /// Drop everything at and after the scrub position.
    ///
    /// Returns `None` when no scrub position is set before the end.
    pub fn terminate(&mut self) -> Option<SeekState> {
        let knob = self.knob?;
        let knobs = self.knobs();
        let cut = knobs.get(knob)?.time;
        self.knob = None;
        self.redo.clear();
        if knob == 0 {
            self.strokes.clear();
            return Some(SeekState::cleared());
        }
        self.strokes.retain(|s| s.start_time() < cut);
        Some(self.seek_state())
    }

    /// Append a sealed stroke. The scrub position moves to the first knob
    /// at or after the stroke's end, or to the end.
    pub fn append(&mut self, stroke: Stroke) -> SeekState {
        let end = stroke.end_time();
        self.strokes.push(stroke);
        self.redo.clear();
        self.knob = self.knobs().iter().position(|k| k.time >= end);
        self.seek_state()
    }

    pub fn clear(&mut self) -> SeekState {
        self.strokes.clear();
        self.redo.clear();
        self.knob = None;
        SeekState::cleared()
    }

    /// Replace the whole history.
    pub fn replace(&mut self, strokes: Vec<Stroke>) {
        self.strokes = strokes;
        self.redo.clear();
        self.knob = None;
    }

    pub fn undo(&mut self) -> Option<SeekState> {
        let stroke = self.strokes.pop()?;
        self.redo.push(stroke);
        self.knob = None;
        Some(self.seek_state())
    }

    pub fn redo(&mut self) -> Option<SeekState> {
        let stroke = self.redo.pop()?;
        self.strokes.push(stroke);
        self.knob = None;
        Some(self.seek_state())
    }

    /// Erase every stroke touched by an eraser disc at `center`.
    ///
    /// Returns the new state when at least one stroke was erased.
    pub fn erase_at(&mut self, center: Point, eraser_width: f64, model: &WidthModel) -> Option<SeekState> {
        let erased = eraser::erase(&mut self.strokes, center, eraser_width, model);
        if erased == 0 {
            return None;
        }
        self.knob = None;
        Some(self.seek_state())
    }

    pub fn seek_state(&self) -> SeekState {
        SeekState {
            knob: Some(self.knob()),
            knobs: Some(self.knobs()),
        }
    }
}

/// Stroke logs for every slide of a session.
#[derive(Debug, Clone, Default)]
pub struct TimelineStore {
    slides: BTreeMap<SlideId, Slide>,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(&self, id: &SlideId) -> Option<&Slide> {
        self.slides.get(id)
    }

    /// The slide, created empty on first use.
    pub fn slide_mut(&mut self, id: &SlideId) -> &mut Slide {
        self.slides.entry(id.clone()).or_default()
    }

    pub fn strokes(&self, id: &SlideId) -> &[Stroke] {
        self.slide(id).map_or(&[], Slide::strokes)
    }

    pub fn knobs(&self, id: &SlideId) -> Vec<Knob> {
        self.slide(id).map(Slide::knobs).unwrap_or_default()
    }

    pub fn knob(&self, id: &SlideId) -> usize {
        self.slide(id).map_or(0, Slide::knob)
    }

    pub fn seek(&mut self, id: &SlideId, knob: usize) -> usize {
        log::debug!("seek {id} to knob {knob}");
        self.slide_mut(id).seek(knob)
    }

    pub fn terminate(&mut self, id: &SlideId) -> Option<SeekState> {
        let state = self.slides.get_mut(id)?.terminate();
        if state.is_some() {
            log::debug!("terminated {id} at scrub position");
        }
        state
    }

    pub fn append(&mut self, id: &SlideId, stroke: Stroke) -> SeekState {
        log::debug!("append stroke at t0={} to {id}", stroke.t0);
        self.slide_mut(id).append(stroke)
    }

    pub fn clear(&mut self, id: &SlideId) -> SeekState {
        self.slide_mut(id).clear()
    }

    pub fn replace(&mut self, id: &SlideId, strokes: Vec<Stroke>) {
        log::debug!("replace {id} with {} strokes", strokes.len());
        self.slide_mut(id).replace(strokes);
    }

    pub fn undo(&mut self, id: &SlideId) -> Option<SeekState> {
        self.slides.get_mut(id)?.undo()
    }

    pub fn redo(&mut self, id: &SlideId) -> Option<SeekState> {
        self.slides.get_mut(id)?.redo()
    }

    pub fn erase_at(
        &mut self,
        id: &SlideId,
        center: Point,
        eraser_width: f64,
        model: &WidthModel,
    ) -> Option<SeekState> {
        self.slides.get_mut(id)?.erase_at(center, eraser_width, model)
    }
}
