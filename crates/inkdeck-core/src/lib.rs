//! inkdeck Core Library
//!
//! Platform-agnostic interaction core for the inkdeck annotation surface:
//! multi-pointer gestures over slide elements and a replayable, scrubbable
//! ink timeline per slide.

pub mod channel;
pub mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod gesture;
pub mod ink;
pub mod input;
pub mod media;
pub mod pointer;
pub mod scheduler;
pub mod surface;
pub mod transform;

pub use channel::{Inbound, Outbound, ToolChoice, TransformUpdate};
pub use config::{Capabilities, GestureConfig, InkConfig, SurfaceConfig};
pub use element::{Category, Element, ElementId, ElementIndex, ElementKind, Geometry, PINNED_Z};
pub use error::{SurfaceError, SurfaceResult};
pub use gesture::{GestureInterpreter, GestureState};
pub use ink::{InkStyle, Knob, PaintOp, Sample, Scene, SlideId, Stroke, TimelineStore};
pub use input::{PointerEvent, PointerId};
pub use scheduler::{Scheduler, Task, TaskHandle};
pub use surface::Surface;
