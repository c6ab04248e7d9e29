//! The interaction surface: one slide view with its elements, gestures
//! and ink.
//!
//! The host feeds pointer events, channel commands and clock ticks in;
//! outbound events, media commands and two display lists come out. All
//! state lives here and is handed to the subsystems explicitly per event.

use crate::channel::{Inbound, Outbound, ToolChoice};
use crate::commit::CommitScheduler;
use crate::config::{Capabilities, SurfaceConfig};
use crate::element::{Element, ElementId, ElementIndex, ElementKind};
use crate::error::SurfaceResult;
use crate::gesture::{GestureEnv, GestureInterpreter};
use crate::ink::{
    Eraser, InkStyle, PlaybackEngine, Renderer, Scene, Slide, SlideId, StrokeRecorder, TimelineStore,
    WidthModel,
};
use crate::input::{PointerEvent, PointerId};
use crate::media::{MediaCommand, MediaDeck};
use crate::pointer::Generation;
use crate::scheduler::{Scheduler, Task, TaskHandle};
use kurbo::{Affine, Point};
use std::collections::BTreeMap;

/// Client-side interaction core for one surface.
pub struct Surface {
    config: SurfaceConfig,
    capabilities: Capabilities,
    elements: ElementIndex,
    gestures: BTreeMap<ElementId, GestureInterpreter>,
    generation: Generation,
    commits: CommitScheduler,
    scheduler: Scheduler,
    outgoing: Vec<Outbound>,
    media: MediaDeck,
    tool: ToolChoice,
    slide: SlideId,
    timeline: TimelineStore,
    recorder: StrokeRecorder,
    eraser: Eraser,
    renderer: Renderer,
    playback: PlaybackEngine,
    static_layer: Scene,
    live_layer: Scene,
    idle_timer: Option<TaskHandle>,
    /// Index of each drawing pointer's resting dot in the live layer.
    resting: BTreeMap<PointerId, usize>,
}

impl Surface {
    /// Build a surface, rejecting configurations that fail validation.
    pub fn new(config: SurfaceConfig) -> SurfaceResult<Self> {
        config.validate()?;
        let model = WidthModel::from_config(&config.ink);
        Ok(Self {
            capabilities: Capabilities::default(),
            elements: ElementIndex::new(),
            gestures: BTreeMap::new(),
            generation: Generation::new(),
            commits: CommitScheduler::new(config.gesture.commit_interval),
            scheduler: Scheduler::new(),
            outgoing: Vec::new(),
            media: MediaDeck::new(config.media.restart_delay),
            tool: ToolChoice::None,
            slide: SlideId::default(),
            timeline: TimelineStore::new(),
            recorder: StrokeRecorder::new(model, config.ink.max_pause),
            eraser: Eraser::new(),
            renderer: Renderer::new(&config.ink),
            playback: PlaybackEngine::new(config.ink.replay_pause),
            static_layer: Scene::new(),
            live_layer: Scene::new(),
            idle_timer: None,
            resting: BTreeMap::new(),
            config,
        })
    }

    /// Parse and validate a JSON configuration, then build a surface.
    pub fn from_json(config: &str) -> SurfaceResult<Self> {
        Self::new(SurfaceConfig::from_json(config)?)
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        log::debug!("capabilities {capabilities:?}");
        self.capabilities = capabilities;
    }

    pub fn set_tool(&mut self, tool: ToolChoice) {
        if tool != ToolChoice::Eraser {
            self.eraser.clear();
        }
        self.tool = tool;
    }

    pub fn tool(&self) -> &ToolChoice {
        &self.tool
    }

    /// Surface to device transform used when painting ink.
    pub fn set_view(&mut self, view: Affine) {
        self.renderer.view = view;
    }

    // Elements

    /// Insert or replace an element. Media elements get a clip with no
    /// segment unless one was set.
    pub fn insert_element(&mut self, element: Element) {
        let id = element.id.clone();
        if element.kind == ElementKind::Media && !self.media.contains(&id) {
            self.media.register(id.clone(), "");
        }
        self.gestures
            .entry(id.clone())
            .or_insert_with(|| GestureInterpreter::new(id, &self.generation));
        self.elements.insert(element);
    }

    /// Set the `m:ss-m:ss` play segment of a media element.
    pub fn set_media_segment(&mut self, item: &ElementId, segment: &str) {
        self.media.remove(item, &mut self.scheduler);
        self.media.register(item.clone(), segment);
    }

    pub fn remove_element(&mut self, id: &ElementId) -> Option<Element> {
        if let Some(mut gesture) = self.gestures.remove(id) {
            gesture.reset(&mut self.scheduler);
        }
        self.commits.forget(id);
        self.media.remove(id, &mut self.scheduler);
        self.elements.remove(id)
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn elements(&self) -> &ElementIndex {
        &self.elements
    }

    pub fn gesture(&self, id: &ElementId) -> Option<&GestureInterpreter> {
        self.gestures.get(id)
    }

    fn split(&mut self, now: f64) -> (&mut BTreeMap<ElementId, GestureInterpreter>, GestureEnv<'_>) {
        (
            &mut self.gestures,
            GestureEnv {
                elements: &mut self.elements,
                commits: &mut self.commits,
                scheduler: &mut self.scheduler,
                generation: &mut self.generation,
                outgoing: &mut self.outgoing,
                capabilities: self.capabilities,
                config: &self.config.gesture,
                now,
            },
        )
    }

    // Pointer input

    /// A pointer went down on `target` (`None` for the ink canvas itself).
    pub fn pointer_down(&mut self, target: Option<&ElementId>, event: PointerEvent) {
        let (id, position, now) = (event.id(), event.position(), event.time());
        self.touch(now);
        match self.tool.clone() {
            ToolChoice::Eraser => {
                self.eraser.press(id, position);
                self.erase_at(position);
            }
            ToolChoice::Pen { color } => self.begin_stroke(id, color, now, position),
            ToolChoice::Palette { colors } => {
                if colors.is_empty() {
                    return;
                }
                let drawn = self.timeline.strokes(&self.slide).len();
                let color = colors[drawn % colors.len()].clone();
                self.begin_stroke(id, color, now, position);
            }
            ToolChoice::None => {
                let Some(target) = target else { return };
                let (gestures, mut env) = self.split(now);
                if let Some(gesture) = gestures.get_mut(target) {
                    gesture.on_down(&mut env, id, position);
                }
            }
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        let (id, position, now) = (event.id(), event.position(), event.time());
        self.touch(now);
        if self.eraser.move_to(id, position) {
            self.erase_at(position);
            return;
        }
        if self.recorder.is_drawing(id) {
            self.extend_stroke(id, now, position);
            return;
        }
        let (gestures, mut env) = self.split(now);
        for gesture in gestures.values_mut() {
            gesture.on_move(&mut env, id, position);
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.release(event);
    }

    pub fn pointer_cancel(&mut self, event: PointerEvent) {
        self.release(event);
    }

    fn release(&mut self, event: PointerEvent) {
        let (id, position, now) = (event.id(), event.position(), event.time());
        if self.eraser.release(id) {
            self.erase_at(position);
            return;
        }
        if self.recorder.is_drawing(id) {
            self.finish_stroke(id, now, position);
            return;
        }
        let (gestures, mut env) = self.split(now);
        let tapped: Vec<ElementId> = gestures
            .values_mut()
            .filter_map(|gesture| gesture.on_up(&mut env, id).then(|| gesture.target().clone()))
            .collect();
        for target in &tapped {
            self.dispatch_tap(target);
        }
    }

    fn dispatch_tap(&mut self, target: &ElementId) {
        let Some(kind) = self.elements.get(target).map(|e| e.kind) else { return };
        let event = match kind {
            ElementKind::Background => return,
            ElementKind::Text => Outbound::ToggleHighlight { key: target.clone() },
            ElementKind::Image => Outbound::Flip { image: target.clone() },
            ElementKind::Avatar => Outbound::Focus { avatar: target.clone() },
            ElementKind::Media => match self.media.toggle(target) {
                Some(playing) => Outbound::MediaToggled { item: target.clone(), playing },
                None => return,
            },
        };
        self.outgoing.push(event);
    }

    /// Re-arm the idle disconnect timer.
    fn touch(&mut self, now: f64) {
        self.scheduler.cancel_slot(&mut self.idle_timer);
        self.idle_timer = Some(self.scheduler.schedule_at(now + self.config.idle_timeout, Task::IdleTimeout));
    }

    // Ink

    fn begin_stroke(&mut self, id: PointerId, color: String, now: f64, position: Point) {
        let anchor = self.recorder.anchor(self.timeline.slide(&self.slide), now);
        if anchor.truncate {
            self.timeline.terminate(&self.slide);
            self.static_redraw();
        }
        self.recorder.begin(id, anchor, InkStyle::Color(color), now, position);
        self.schedule_diffuse(id, now);
    }

    fn extend_stroke(&mut self, id: PointerId, now: f64, position: Point) {
        let Some(segment) = self.recorder.extend(id, now, position) else { return };
        if let Some(style) = self.recorder.style(id).and_then(InkStyle::color) {
            self.renderer.paint_live_segment(&mut self.live_layer, style, &segment);
        }
        self.schedule_diffuse(id, now);
    }

    fn finish_stroke(&mut self, id: PointerId, now: f64, position: Point) {
        if let Some(slot) = self.recorder.diffuse_slot(id) {
            self.scheduler.cancel_slot(slot);
        }
        let Some(stroke) = self.recorder.finish(id, now, position) else { return };
        self.resting.remove(&id);
        let state = self.timeline.append(&self.slide, stroke);
        self.outgoing.push(state.into());
        if !self.recorder.has_active() {
            self.clear_live_layer();
        }
        self.static_redraw();
    }

    fn schedule_diffuse(&mut self, id: PointerId, now: f64) {
        let due = now + self.config.ink.diffuse_interval;
        if let Some(slot) = self.recorder.diffuse_slot(id) {
            self.scheduler.cancel_slot(slot);
            *slot = Some(self.scheduler.schedule_at(due, Task::Diffuse(id)));
        }
    }

    fn diffuse(&mut self, id: PointerId, now: f64) {
        if !self.recorder.has_active() {
            self.clear_live_layer();
            return;
        }
        if let Some(slot) = self.recorder.diffuse_slot(id) {
            *slot = None;
        }
        let Some((at, width)) = self.recorder.tail(id, now) else { return };
        if let Some(style) = self.recorder.style(id).and_then(InkStyle::color) {
            let previous = self.resting.get(&id).copied();
            let index = self.renderer.diffuse(&mut self.live_layer, previous, style, at, width);
            self.resting.insert(id, index);
        }
        self.schedule_diffuse(id, now);
    }

    fn clear_live_layer(&mut self) {
        self.live_layer.clear();
        self.resting.clear();
    }

    fn erase_at(&mut self, position: Point) {
        let width = self.config.ink.eraser_width();
        if let Some(state) = self.timeline.erase_at(&self.slide, position, width, self.recorder.model()) {
            self.outgoing.push(state.into());
        }
        self.static_redraw();
    }

    /// Repaint committed ink, cancelling any playback in flight.
    fn static_redraw(&mut self) {
        self.playback.stop(&mut self.scheduler);
        self.renderer
            .static_redraw(&mut self.static_layer, self.timeline.slide(&self.slide), self.eraser.cursors());
    }

    fn seek_state(&mut self) {
        if let Some(slide) = self.timeline.slide(&self.slide) {
            self.outgoing.push(slide.seek_state().into());
        }
    }

    // Channel

    /// Decode and apply a channel message.
    pub fn handle_message(&mut self, json: &str) -> SurfaceResult<()> {
        match Inbound::from_json(json) {
            Ok(command) => {
                self.handle_command(command);
                Ok(())
            }
            Err(e) => {
                log::warn!("ignoring malformed message: {e}");
                Err(e)
            }
        }
    }

    pub fn handle_command(&mut self, command: Inbound) {
        log::debug!("command {command:?}");
        match command {
            Inbound::Seek { knob } => {
                self.recorder.forget_release();
                self.timeline.seek(&self.slide, knob);
                self.static_redraw();
            }
            Inbound::Play { knob } => {
                let Some(slide) = self.timeline.slide(&self.slide) else { return };
                if slide.is_empty() {
                    return;
                }
                self.playback
                    .start(slide, knob, self.recorder.model(), &mut self.scheduler);
            }
            Inbound::Terminate => {
                if let Some(state) = self.timeline.terminate(&self.slide) {
                    self.static_redraw();
                    self.outgoing.push(state.into());
                }
            }
            Inbound::Redraw => self.redraw(),
            Inbound::Clear => {
                let state = self.timeline.clear(&self.slide);
                self.static_redraw();
                self.outgoing.push(state.into());
            }
            Inbound::Init { strokes } => {
                self.timeline.replace(&self.slide, strokes);
                self.static_redraw();
            }
            Inbound::Undo => {
                if let Some(state) = self.timeline.undo(&self.slide) {
                    self.static_redraw();
                    self.outgoing.push(state.into());
                }
            }
            Inbound::Redo => {
                if let Some(state) = self.timeline.redo(&self.slide) {
                    self.static_redraw();
                    self.outgoing.push(state.into());
                }
            }
            Inbound::SelectSlide { slide } => {
                self.slide = slide;
                self.redraw();
            }
            Inbound::SetTool { tool } => self.set_tool(tool),
            Inbound::SetCapabilities { capabilities } => self.set_capabilities(capabilities),
            Inbound::ResetMedia { item } => self.media.reset(&item, &mut self.scheduler),
            Inbound::RequestSubmit => {
                let strokes = self.timeline.strokes(&self.slide).to_vec();
                self.outgoing.push(Outbound::Submit { strokes });
            }
        }
    }

    fn redraw(&mut self) {
        self.recorder.forget_release();
        self.static_redraw();
        self.seek_state();
    }

    // Media callbacks

    /// The host player of `item` reports its position in seconds.
    pub fn media_time_update(&mut self, item: &ElementId, seconds: f64, now: f64) {
        self.media.time_update(item, seconds, now, &mut self.scheduler);
    }

    /// The host player of `item` reached the end of the clip.
    pub fn media_ended(&mut self, item: &ElementId, now: f64) {
        self.media.ended(item, now, &mut self.scheduler);
    }

    pub fn media_display_time(&self, item: &ElementId) -> Option<String> {
        self.media.display_time(item)
    }

    // Clock

    /// Run every timer due at or before `now`, in due order.
    pub fn advance(&mut self, now: f64) {
        while let Some((_, task)) = self.scheduler.pop_due(now) {
            self.run(task, now);
        }
    }

    /// Run the frame requests made before this frame.
    pub fn animation_frame(&mut self, now: f64) {
        for handle in self.scheduler.frame_requests() {
            if let Some(task) = self.scheduler.take(handle) {
                self.run(task, now);
            }
        }
    }

    fn run(&mut self, task: Task, now: f64) {
        log::trace!("run {task:?} at {now}");
        match task {
            Task::CommitThrottle(target) => {
                let (gestures, mut env) = self.split(now);
                if let Some(gesture) = gestures.get_mut(&target) {
                    gesture.on_commit_timer(&mut env);
                }
            }
            Task::Diffuse(id) => self.diffuse(id, now),
            Task::PlaybackFrame => {
                let empty = Slide::default();
                let slide = self.timeline.slide(&self.slide).unwrap_or(&empty);
                self.playback
                    .step(now, slide, &self.renderer, &mut self.static_layer, &mut self.scheduler);
            }
            Task::PlaybackRepeat => self.playback.on_repeat(&mut self.scheduler),
            Task::MediaRestart(item) => self.media.restart(&item),
            Task::IdleTimeout => {
                self.idle_timer = None;
                log::debug!("idle timeout");
                self.outgoing.push(Outbound::IdleDisconnect);
            }
        }
    }

    // Output

    pub fn take_outgoing(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn take_media_commands(&mut self) -> Vec<MediaCommand> {
        self.media.take_commands()
    }

    /// Committed ink, or the playback frame while replaying.
    pub fn static_layer(&self) -> &Scene {
        &self.static_layer
    }

    /// In-progress stroke tails.
    pub fn live_layer(&self) -> &Scene {
        &self.live_layer
    }

    pub fn timeline(&self) -> &TimelineStore {
        &self.timeline
    }

    pub fn current_slide(&self) -> &SlideId {
        &self.slide
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    /// Time of the earliest pending timer.
    pub fn next_due(&self) -> Option<f64> {
        self.scheduler.next_due()
    }

    pub fn has_frame_request(&self) -> bool {
        !self.scheduler.frame_requests().is_empty()
    }
}
