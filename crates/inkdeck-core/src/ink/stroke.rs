//! Stroke data model.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Wire value marking an erased stroke.
pub const ERASED_STYLE: &str = "erased";

/// Paint style of a stroke.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InkStyle {
    Color(String),
    /// Excluded from rendering, hit-testing and knobs.
    Erased,
}

impl From<String> for InkStyle {
    fn from(value: String) -> Self {
        if value == ERASED_STYLE {
            Self::Erased
        } else {
            Self::Color(value)
        }
    }
}

impl From<InkStyle> for String {
    fn from(style: InkStyle) -> Self {
        match style {
            InkStyle::Color(color) => color,
            InkStyle::Erased => ERASED_STYLE.to_string(),
        }
    }
}

impl InkStyle {
    pub fn color(&self) -> Option<&str> {
        match self {
            Self::Color(color) => Some(color),
            Self::Erased => None,
        }
    }
}

/// One time-stamped point, relative to its stroke's `t0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Sample {
    pub t: f64,
    pub position: Point,
}

impl Sample {
    pub fn new(t: f64, x: f64, y: f64) -> Self {
        Self {
            t,
            position: Point::new(x, y),
        }
    }
}

impl From<[f64; 3]> for Sample {
    fn from([t, x, y]: [f64; 3]) -> Self {
        Self::new(t, x, y)
    }
}

impl From<Sample> for [f64; 3] {
    fn from(sample: Sample) -> Self {
        [sample.t, sample.position.x, sample.position.y]
    }
}

/// A continuous ink path on a slide's shared time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Start offset on the slide time axis.
    pub t0: f64,
    pub style: InkStyle,
    #[serde(rename = "txys")]
    pub samples: Vec<Sample>,
}

impl Stroke {
    /// Open a stroke whose first sample is at relative time 0.
    pub fn begin(t0: f64, style: InkStyle, position: Point) -> Self {
        Self {
            t0,
            style,
            samples: vec![Sample { t: 0.0, position }],
        }
    }

    /// Append a sample, clamping its time so samples never go backwards.
    pub fn push(&mut self, t: f64, position: Point) -> Sample {
        let t = self.samples.last().map_or(t, |last| t.max(last.t));
        let sample = Sample { t, position };
        self.samples.push(sample);
        sample
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Absolute start time.
    pub fn start_time(&self) -> f64 {
        self.t0 + self.samples.first().map_or(0.0, |s| s.t)
    }

    /// Absolute end time.
    pub fn end_time(&self) -> f64 {
        self.t0 + self.samples.last().map_or(0.0, |s| s.t)
    }

    pub fn is_erased(&self) -> bool {
        self.style == InkStyle::Erased
    }

    pub fn erase(&mut self) {
        self.style = InkStyle::Erased;
    }

    /// Consecutive sample pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (Sample, Sample)> + '_ {
        self.samples.windows(2).map(|w| (w[0], w[1]))
    }

    /// Whether sample times are non-decreasing.
    pub fn is_monotonic(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].t <= w[1].t)
    }
}

/// A seekable position: the start of a live stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, InkStyle)", into = "(f64, InkStyle)")]
pub struct Knob {
    pub time: f64,
    pub style: InkStyle,
}

impl From<(f64, InkStyle)> for Knob {
    fn from((time, style): (f64, InkStyle)) -> Self {
        Self { time, style }
    }
}

impl From<Knob> for (f64, InkStyle) {
    fn from(knob: Knob) -> Self {
        (knob.time, knob.style)
    }
}
