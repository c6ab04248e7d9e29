//! Looping media clips.
//!
//! The host owns the actual players; the core tracks each clip's play
//! segment and state and emits [`MediaCommand`]s for the host to apply.
//! Clip times are in seconds, timers in host milliseconds.

use crate::element::ElementId;
use crate::scheduler::{Scheduler, Task, TaskHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Optional start and end of the part of a clip that plays.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipSegment {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl ClipSegment {
    /// Parse `"m:ss-m:ss"`. Either side may be empty or malformed, which
    /// leaves it open.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.splitn(2, '-');
        let start = parts.next().and_then(parse_time);
        let end = parts.next().and_then(parse_time);
        Self { start, end }
    }

    /// Where playback restarts.
    pub fn rewind_point(&self) -> f64 {
        self.start.unwrap_or(0.0)
    }
}

fn parse_time(text: &str) -> Option<f64> {
    let (minutes, seconds) = text.trim().split_once(':')?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    Some(minutes * 60.0 + seconds)
}

/// Instruction for the host's media player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MediaCommand {
    Play { item: ElementId },
    Pause { item: ElementId },
    SeekTo { item: ElementId, seconds: f64 },
}

#[derive(Debug, Clone, Default)]
struct MediaClip {
    segment: ClipSegment,
    playing: bool,
    current: f64,
    restart: Option<TaskHandle>,
}

/// All media clips on the surface.
#[derive(Debug, Clone)]
pub struct MediaDeck {
    restart_delay: f64,
    clips: BTreeMap<ElementId, MediaClip>,
    commands: Vec<MediaCommand>,
}

impl MediaDeck {
    pub fn new(restart_delay: f64) -> Self {
        Self {
            restart_delay,
            clips: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    /// Track a clip, cued at its segment start.
    pub fn register(&mut self, item: ElementId, segment: &str) {
        let segment = ClipSegment::parse(segment);
        let current = segment.rewind_point();
        self.commands.push(MediaCommand::SeekTo { item: item.clone(), seconds: current });
        self.clips.insert(
            item,
            MediaClip {
                segment,
                current,
                ..MediaClip::default()
            },
        );
    }

    pub fn remove(&mut self, item: &ElementId, scheduler: &mut Scheduler) {
        if let Some(mut clip) = self.clips.remove(item) {
            scheduler.cancel_slot(&mut clip.restart);
        }
    }

    pub fn contains(&self, item: &ElementId) -> bool {
        self.clips.contains_key(item)
    }

    pub fn is_playing(&self, item: &ElementId) -> bool {
        self.clips.get(item).is_some_and(|c| c.playing)
    }

    pub fn segment(&self, item: &ElementId) -> Option<ClipSegment> {
        self.clips.get(item).map(|c| c.segment)
    }

    /// Play a paused clip or pause a playing one. Returns the new state.
    pub fn toggle(&mut self, item: &ElementId) -> Option<bool> {
        let clip = self.clips.get_mut(item)?;
        clip.playing = !clip.playing;
        self.commands.push(if clip.playing {
            MediaCommand::Play { item: item.clone() }
        } else {
            MediaCommand::Pause { item: item.clone() }
        });
        Some(clip.playing)
    }

    /// The host player reached `seconds`.
    pub fn time_update(&mut self, item: &ElementId, seconds: f64, now: f64, scheduler: &mut Scheduler) {
        let Some(clip) = self.clips.get_mut(item) else { return };
        clip.current = seconds;
        if let Some(start) = clip.segment.start {
            if seconds < start {
                clip.current = start;
                self.commands.push(MediaCommand::SeekTo { item: item.clone(), seconds: start });
                return;
            }
        }
        if clip.segment.end.is_some_and(|end| seconds >= end) && clip.playing {
            clip.playing = false;
            self.commands.push(MediaCommand::Pause { item: item.clone() });
            Self::schedule_restart(clip, item, now + self.restart_delay, scheduler);
        }
    }

    /// The host player ran off the end of the clip.
    pub fn ended(&mut self, item: &ElementId, now: f64, scheduler: &mut Scheduler) {
        let Some(clip) = self.clips.get_mut(item) else { return };
        clip.playing = false;
        Self::schedule_restart(clip, item, now + self.restart_delay, scheduler);
    }

    fn schedule_restart(clip: &mut MediaClip, item: &ElementId, due: f64, scheduler: &mut Scheduler) {
        scheduler.cancel_slot(&mut clip.restart);
        clip.restart = Some(scheduler.schedule_at(due, Task::MediaRestart(item.clone())));
    }

    /// Restart timer fired: loop the segment unless the user resumed
    /// playback in the meantime.
    pub fn restart(&mut self, item: &ElementId) {
        let Some(clip) = self.clips.get_mut(item) else { return };
        clip.restart = None;
        if clip.playing {
            return;
        }
        log::debug!("looping media {item}");
        clip.current = clip.segment.rewind_point();
        clip.playing = true;
        self.commands.push(MediaCommand::SeekTo { item: item.clone(), seconds: clip.current });
        self.commands.push(MediaCommand::Play { item: item.clone() });
    }

    /// Rewind to the segment start and pause.
    pub fn reset(&mut self, item: &ElementId, scheduler: &mut Scheduler) {
        let Some(clip) = self.clips.get_mut(item) else { return };
        scheduler.cancel_slot(&mut clip.restart);
        clip.current = clip.segment.rewind_point();
        clip.playing = false;
        self.commands.push(MediaCommand::SeekTo { item: item.clone(), seconds: clip.current });
        self.commands.push(MediaCommand::Pause { item: item.clone() });
    }

    /// Current position as `mm:ss`.
    pub fn display_time(&self, item: &ElementId) -> Option<String> {
        let clip = self.clips.get(item)?;
        let total = clip.current.max(0.0).floor() as u64;
        Some(format!("{:02}:{:02}", total / 60, total % 60))
    }

    pub fn take_commands(&mut self) -> Vec<MediaCommand> {
        std::mem::take(&mut self.commands)
    }
}
