//! Real-time replay of a slide's ink.
//!
//! Every live stroke is flattened into one time-ordered list of segment
//! draws. Each animation frame paints the draws whose time has elapsed
//! since the loop began; once the list is exhausted the engine waits
//! `replay_pause` and loops.

use super::render::{Renderer, Scene};
use super::timeline::Slide;
use super::width::WidthModel;
use crate::scheduler::{Scheduler, Task, TaskHandle};
use kurbo::Point;

/// One segment draw at an absolute slide time.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub time: f64,
    pub style: String,
    pub width: f64,
    pub from: Point,
    pub to: Point,
}

/// Flatten a slide's live strokes into draws sorted by time.
pub fn commands(slide: &Slide, model: &WidthModel) -> Vec<DrawCommand> {
    let mut commands: Vec<DrawCommand> = slide
        .strokes()
        .iter()
        .filter_map(|stroke| stroke.style.color().map(|color| (stroke, color)))
        .flat_map(|(stroke, color)| {
            model.segments(stroke).map(move |segment| DrawCommand {
                time: stroke.t0 + segment.to.t,
                style: color.to_string(),
                width: segment.width,
                from: segment.from.position,
                to: segment.to.position,
            })
        })
        .collect();
    commands.sort_by(|a, b| a.time.total_cmp(&b.time));
    commands
}

/// Frame-driven playback state.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    replay_pause: f64,
    commands: Vec<DrawCommand>,
    /// Index of the next draw; equal to the length between loops.
    cursor: usize,
    /// Slide time at which each loop starts.
    offset: f64,
    /// Host time corresponding to slide time zero in the current loop.
    base: f64,
    frame: Option<TaskHandle>,
    repeat: Option<TaskHandle>,
}

impl PlaybackEngine {
    pub fn new(replay_pause: f64) -> Self {
        Self {
            replay_pause,
            commands: Vec::new(),
            cursor: 0,
            offset: 0.0,
            base: 0.0,
            frame: None,
            repeat: None,
        }
    }

    /// Start looping playback from `knob`, replacing any playback in flight.
    pub fn start(&mut self, slide: &Slide, knob: usize, model: &WidthModel, scheduler: &mut Scheduler) {
        self.stop(scheduler);
        self.commands = commands(slide, model);
        self.cursor = self.commands.len();
        self.offset = slide.knobs().get(knob).map_or(0.0, |k| k.time);
        self.frame = Some(scheduler.request_frame(Task::PlaybackFrame));
        log::debug!("playback of {} draws from t={}", self.commands.len(), self.offset);
    }

    /// Run one animation frame at host time `now`.
    pub fn step(&mut self, now: f64, slide: &Slide, renderer: &Renderer, scene: &mut Scene, scheduler: &mut Scheduler) {
        self.frame = None;
        if self.cursor == self.commands.len() {
            self.cursor = 0;
            self.base = now - self.offset;
            scene.clear();
            renderer.paint_muted(scene, slide);
        }
        while let Some(command) = self.commands.get(self.cursor) {
            if now - self.base < command.time {
                break;
            }
            renderer.paint(scene, &command.style, command.width, command.from, command.to);
            self.cursor += 1;
        }
        if self.cursor == self.commands.len() {
            self.repeat = Some(scheduler.schedule_at(now + self.replay_pause, Task::PlaybackRepeat));
        } else {
            self.frame = Some(scheduler.request_frame(Task::PlaybackFrame));
        }
    }

    /// The loop pause elapsed: ask for the frame that restarts the loop.
    pub fn on_repeat(&mut self, scheduler: &mut Scheduler) {
        self.repeat = None;
        if self.frame.is_none() {
            self.frame = Some(scheduler.request_frame(Task::PlaybackFrame));
        }
    }

    /// Cancel any pending frame or loop timer.
    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if self.is_playing() {
            log::debug!("playback stopped");
        }
        scheduler.cancel_slot(&mut self.frame);
        scheduler.cancel_slot(&mut self.repeat);
    }

    pub fn is_playing(&self) -> bool {
        self.frame.is_some() || self.repeat.is_some()
    }

    /// Draws painted so far in the current loop.
    pub fn progress(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InkConfig;
    use crate::ink::{InkStyle, PaintOp, Stroke};

    fn slide() -> Slide {
        let mut a = Stroke::begin(0.0, InkStyle::Color("red".into()), Point::new(0.0, 0.0));
        a.push(10.0, Point::new(10.0, 0.0));
        a.push(20.0, Point::new(20.0, 0.0));
        let mut b = Stroke::begin(5.0, InkStyle::Color("blue".into()), Point::new(0.0, 50.0));
        b.push(10.0, Point::new(10.0, 50.0));
        let mut slide = Slide::default();
        slide.replace(vec![a, b]);
        slide
    }

    struct Rig {
        engine: PlaybackEngine,
        renderer: Renderer,
        scene: Scene,
        scheduler: Scheduler,
        slide: Slide,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                engine: PlaybackEngine::new(1000.0),
                renderer: Renderer::new(&InkConfig::default()),
                scene: Scene::new(),
                scheduler: Scheduler::new(),
                slide: slide(),
            }
        }

        fn start(&mut self, knob: usize) {
            self.engine.start(&self.slide, knob, &WidthModel::default(), &mut self.scheduler);
        }

        fn frame(&mut self, now: f64) {
            let handle = self.scheduler.frame_requests()[0];
            assert_eq!(self.scheduler.take(handle), Some(Task::PlaybackFrame));
            self.engine.step(now, &self.slide, &self.renderer, &mut self.scene, &mut self.scheduler);
        }

        fn colored(&self) -> usize {
            let future = self.renderer.future_style();
            self.scene.ops().iter().filter(|op| op.style() != future).count()
        }
    }

    #[test]
    fn test_commands_sorted_by_time() {
        let times: Vec<f64> = commands(&slide(), &WidthModel::default()).iter().map(|c| c.time).collect();
        assert_eq!(times, vec![10.0, 15.0, 20.0]);
    }

    #[test]
    fn test_frames_pace_draws() {
        let mut rig = Rig::new();
        rig.start(0);
        rig.frame(1000.0);
        // Loop start paints everything muted.
        assert_eq!(rig.scene.len(), 3);
        assert_eq!(rig.colored(), 0);

        rig.frame(1012.0);
        assert_eq!(rig.colored(), 1);
        rig.frame(1020.0);
        assert_eq!(rig.colored(), 3);
        assert!(rig.scheduler.frame_requests().is_empty());
        assert_eq!(rig.scheduler.next_due(), Some(2020.0));
    }

    #[test]
    fn test_loop_restarts_after_pause() {
        let mut rig = Rig::new();
        rig.start(0);
        rig.frame(0.0);
        rig.frame(100.0);
        let (_, task) = rig.scheduler.pop_due(1100.0).unwrap();
        assert_eq!(task, Task::PlaybackRepeat);
        rig.engine.on_repeat(&mut rig.scheduler);
        rig.frame(1100.0);
        assert_eq!(rig.engine.progress(), 0);
        assert_eq!(rig.colored(), 0);
    }

    #[test]
    fn test_start_from_knob_offsets_base() {
        let mut rig = Rig::new();
        // Second knob is the blue stroke at t=5.
        rig.start(1);
        rig.frame(1000.0);
        rig.frame(1010.0);
        // Slide time 15 has elapsed.
        assert_eq!(rig.engine.progress(), 2);
    }

    #[test]
    fn test_restart_cancels_pending_frame() {
        let mut rig = Rig::new();
        rig.start(0);
        rig.start(0);
        assert_eq!(rig.scheduler.frame_requests().len(), 1);

        rig.engine.stop(&mut rig.scheduler);
        assert!(!rig.engine.is_playing());
        assert!(rig.scheduler.is_empty());
    }

    #[test]
    fn test_playback_skips_erased() {
        let mut rig = Rig::new();
        let mut strokes = rig.slide.strokes().to_vec();
        strokes[1].erase();
        rig.slide.replace(strokes);
        rig.start(0);
        rig.frame(0.0);
        rig.frame(100.0);
        assert!(rig.scene.ops().iter().all(|op| op.style() != "blue"));
        assert!(matches!(rig.scene.ops()[0], PaintOp::Segment { .. }));
    }
}
