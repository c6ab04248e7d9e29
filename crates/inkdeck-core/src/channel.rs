//! Messages exchanged with the session-state owner.
//!
//! The transport is opaque to the core: outbound events are queued on the
//! surface and drained by the host, inbound commands are handed to
//! [`crate::Surface::handle_command`].

use crate::config::Capabilities;
use crate::element::{Element, ElementId};
use crate::error::{SurfaceError, SurfaceResult};
use crate::ink::{Knob, SeekState, SlideId, Stroke};
use serde::{Deserialize, Serialize};

/// Geometry of one element as reported to the session owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformUpdate {
    pub item: ElementId,
    pub x: i64,
    pub y: i64,
    pub z: i32,
    pub size: i64,
}

impl From<&Element> for TransformUpdate {
    fn from(element: &Element) -> Self {
        let g = &element.geometry;
        Self {
            item: element.id.clone(),
            x: g.position.x.round() as i64,
            y: g.position.y.round() as i64,
            z: g.z,
            size: g.size.round() as i64,
        }
    }
}

/// Events sent to the session owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Outbound {
    /// Throttled batch while a gesture is in progress.
    Drags { updates: Vec<TransformUpdate> },
    /// Final batch when a gesture ends.
    Commit { updates: Vec<TransformUpdate> },
    ToggleHighlight { key: ElementId },
    Flip { image: ElementId },
    Focus { avatar: ElementId },
    MediaToggled { item: ElementId, playing: bool },
    /// Timeline state after an append, erase, terminate or redraw.
    /// All fields are null once a slide's history is cleared.
    Seeked {
        knob: Option<usize>,
        knobs: Option<Vec<Knob>>,
        max_seek: Option<usize>,
    },
    IdleDisconnect,
    /// Every stroke of the current slide, sent back on request.
    Submit { strokes: Vec<Stroke> },
}

impl Outbound {
    pub fn to_json(&self) -> SurfaceResult<String> {
        serde_json::to_string(self).map_err(|e| SurfaceError::Encode(e.to_string()))
    }

    /// Whether this is a transform batch of either tier.
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Drags { .. } | Self::Commit { .. })
    }
}

impl From<SeekState> for Outbound {
    fn from(state: SeekState) -> Self {
        let max_seek = state.max_seek();
        Self::Seeked {
            knob: state.knob,
            knobs: state.knobs,
            max_seek,
        }
    }
}

/// Drawing tool selected by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Pointers go to gestures.
    #[default]
    None,
    Eraser,
    Pen { color: String },
    /// Each new stroke takes the next colour, by stroke count on the slide.
    Palette { colors: Vec<String> },
}

/// Commands received from the session owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Inbound {
    Seek { knob: usize },
    Play { knob: usize },
    Terminate,
    Redraw,
    Clear,
    /// Replace the current slide's timeline.
    Init { strokes: Vec<Stroke> },
    Undo,
    Redo,
    SelectSlide { slide: SlideId },
    SetTool { tool: ToolChoice },
    SetCapabilities { capabilities: Capabilities },
    ResetMedia { item: ElementId },
    /// Ask for the current slide's strokes as a `submit` event.
    RequestSubmit,
}

impl Inbound {
    pub fn from_json(json: &str) -> SurfaceResult<Self> {
        serde_json::from_str(json).map_err(|e| SurfaceError::Message(e.to_string()))
    }
}
