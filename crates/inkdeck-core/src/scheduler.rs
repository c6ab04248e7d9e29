//! Cancellable timers and animation-frame requests.
//!
//! The surface is single-threaded and driven by the host: timers fire from
//! [`Scheduler::pop_due`] as the host advances its clock, and frame
//! requests fire when the host reports an animation frame. Cancelling a
//! handle removes the task, so a superseded callback can never run.

use crate::element::ElementId;
use crate::input::PointerId;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

/// Deferred work owned by the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Send a live commit batch for a gesture target.
    CommitThrottle(ElementId),
    /// Refresh the resting tail of an in-progress stroke.
    Diffuse(PointerId),
    /// Draw the next playback frame.
    PlaybackFrame,
    /// Restart playback after the loop pause.
    PlaybackRepeat,
    /// Rewind and resume a media clip after its segment ended.
    MediaRestart(ElementId),
    /// Tell the session owner the user went idle.
    IdleTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Trigger {
    At(f64),
    NextFrame,
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TaskHandle,
    trigger: Trigger,
    task: Task,
}

/// Pending timers and frame requests.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_handle: u64,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, trigger: Trigger, task: Task) -> TaskHandle {
        self.next_handle += 1;
        let handle = TaskHandle(self.next_handle);
        log::trace!("schedule {:?} {:?} as {:?}", task, trigger, handle);
        self.entries.push(Entry { handle, trigger, task });
        handle
    }

    /// Run `task` once the clock reaches `due`.
    pub fn schedule_at(&mut self, due: f64, task: Task) -> TaskHandle {
        self.push(Trigger::At(due), task)
    }

    /// Run `task` on the next animation frame.
    pub fn request_frame(&mut self, task: Task) -> TaskHandle {
        self.push(Trigger::NextFrame, task)
    }

    /// Cancel a task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        before != self.entries.len()
    }

    /// Cancel the task held in `slot`, if any, and clear the slot.
    pub fn cancel_slot(&mut self, slot: &mut Option<TaskHandle>) {
        if let Some(handle) = slot.take() {
            self.cancel(handle);
        }
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(TaskHandle, Task)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e.trigger {
                Trigger::At(due) if due <= now => Some((i, due, e.handle)),
                _ => None,
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)))
            .map(|(i, _, _)| i)?;
        let entry = self.entries.remove(index);
        Some((entry.handle, entry.task))
    }

    /// Handles of all outstanding frame requests, oldest first.
    pub fn frame_requests(&self) -> Vec<TaskHandle> {
        self.entries
            .iter()
            .filter(|e| e.trigger == Trigger::NextFrame)
            .map(|e| e.handle)
            .collect()
    }

    /// Remove a task so it can run now.
    pub fn take(&mut self, handle: TaskHandle) -> Option<Task> {
        let index = self.entries.iter().position(|e| e.handle == handle)?;
        Some(self.entries.remove(index).task)
    }

    /// Time of the earliest pending timer.
    pub fn next_due(&self) -> Option<f64> {
        self.entries
            .iter()
            .filter_map(|e| match e.trigger {
                Trigger::At(due) => Some(due),
                Trigger::NextFrame => None,
            })
            .min_by(f64::total_cmp)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
