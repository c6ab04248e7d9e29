//! Freehand ink: recording, timeline, erasing and replay.

mod eraser;
mod playback;
mod recorder;
mod render;
mod stroke;
mod timeline;
mod width;

pub use eraser::{Eraser, erase, touches};
pub use playback::{DrawCommand, PlaybackEngine};
pub use recorder::{StrokeAnchor, StrokeRecorder};
pub use render::{PaintOp, Renderer, Scene};
pub use stroke::{ERASED_STYLE, InkStyle, Knob, Sample, Stroke};
pub use timeline::{SeekState, Slide, SlideId, TimelineStore};
pub use width::{Segment, WidthModel};
