//! Per-element gesture state machine.
//!
//! Each element with gestures enabled owns a [`GestureInterpreter`]. Raw
//! pointer events are classified into three states:
//!
//! - `Idle`: any number of pressed pointers, none moved past the threshold.
//! - `Pan`: exactly one moved pointer.
//! - `PinchZoom`: exactly two pointers, both moved.
//!
//! Releasing without moving is a tap. Interpreters share the element
//! index, drag set, scheduler and outbound queue through a
//! [`GestureEnv`] borrowed from the surface for the duration of one event.

use crate::channel::{Outbound, TransformUpdate};
use crate::commit::{self, CommitScheduler};
use crate::config::{Capabilities, GestureConfig};
use crate::element::{ElementId, ElementIndex};
use crate::input::{PointerId, exceeds_threshold};
use crate::pointer::{Generation, PointerTracker, Role, TrackedPointer};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::transform::{self, Anchor};
use kurbo::Point;

/// Interpreted meaning of the pointers on one element.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle {
        pending: Vec<TrackedPointer>,
    },
    Pan {
        pointer: TrackedPointer,
        anchor: Anchor,
    },
    PinchZoom {
        primary: TrackedPointer,
        secondary: TrackedPointer,
        anchor: Anchor,
    },
}

impl Default for GestureState {
    fn default() -> Self {
        Self::Idle { pending: Vec::new() }
    }
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::Pan { .. } => "pan",
            Self::PinchZoom { .. } => "pinch-zoom",
        }
    }

    /// Pointers marked as moved.
    pub fn moved_count(&self) -> usize {
        match self {
            Self::Idle { .. } => 0,
            Self::Pan { .. } => 1,
            Self::PinchZoom { .. } => 2,
        }
    }

    pub fn pointer_count(&self) -> usize {
        match self {
            Self::Idle { pending } => pending.len(),
            Self::Pan { .. } => 1,
            Self::PinchZoom { .. } => 2,
        }
    }
}

/// Surface state shared by all interpreters while handling one event.
pub struct GestureEnv<'a> {
    pub elements: &'a mut ElementIndex,
    pub commits: &'a mut CommitScheduler,
    pub scheduler: &'a mut Scheduler,
    pub generation: &'a mut Generation,
    pub outgoing: &'a mut Vec<Outbound>,
    pub capabilities: Capabilities,
    pub config: &'a GestureConfig,
    /// Host time of the event being handled.
    pub now: f64,
}

impl GestureEnv<'_> {
    fn updates(&self, target: &ElementId) -> Vec<TransformUpdate> {
        let is_background = self.elements.get(target).is_some_and(|e| e.is_background());
        if is_background {
            commit::persistent(self.elements, self.capabilities)
        } else {
            commit::updates_for(self.elements, [target])
        }
    }

    fn send(&mut self, event: Outbound) {
        let empty = matches!(&event, Outbound::Drags { updates } | Outbound::Commit { updates } if updates.is_empty());
        if !empty {
            self.outgoing.push(event);
        }
    }
}

/// Gesture state of one target element.
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    target: ElementId,
    tracker: PointerTracker,
    state: GestureState,
    commit_timer: Option<TaskHandle>,
}

impl GestureInterpreter {
    pub fn new(target: ElementId, generation: &Generation) -> Self {
        Self {
            target,
            tracker: PointerTracker::new(generation),
            state: GestureState::default(),
            commit_timer: None,
        }
    }

    pub fn target(&self) -> &ElementId {
        &self.target
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn moved_count(&self) -> usize {
        self.state.moved_count()
    }

    pub fn pointer_count(&self) -> usize {
        self.state.pointer_count()
    }

    /// Drop every pointer if the generation moved on since we last looked.
    fn sync(&mut self, generation: &Generation) {
        if self.tracker.refresh(generation) && self.state.pointer_count() > 0 {
            log::debug!("{}: pointers invalidated in {}", self.target, self.state.name());
            self.state = GestureState::default();
        }
    }

    fn set_state(&mut self, state: GestureState) {
        log::debug!("{}: enters {}", self.target, state.name());
        self.state = state;
    }

    /// Whether pointers on the target are accepted at all.
    fn accepts(&self, env: &GestureEnv<'_>) -> bool {
        env.elements
            .get(&self.target)
            .is_some_and(|e| e.is_background() == env.capabilities.any_group_move())
    }

    /// Whether moved pointers transform the target.
    fn transforms(&self, env: &GestureEnv<'_>) -> bool {
        env.capabilities.pan
            && self.accepts(env)
            && env.elements.get(&self.target).is_some_and(|e| e.is_background() || e.draggable)
    }

    pub fn on_down(&mut self, env: &mut GestureEnv<'_>, id: PointerId, position: Point) {
        self.sync(env.generation);
        if !self.accepts(env) {
            return;
        }
        match std::mem::take(&mut self.state) {
            GestureState::Idle { mut pending } => {
                if !pending.iter().any(|p| p.id == id) {
                    pending.push(TrackedPointer::pending(id, position));
                }
                self.state = GestureState::Idle { pending };
            }
            GestureState::Pan { mut pointer, anchor } => {
                let joins = env.capabilities.allows_secondary()
                    && env.elements.get(&self.target).is_some_and(|e| e.is_background() || e.draggable)
                    && pointer.id != id;
                if !joins {
                    self.state = GestureState::Pan { pointer, anchor };
                    return;
                }
                pointer.rebase();
                let anchor = transform::capture(env.elements, &self.target, env.capabilities).unwrap_or(anchor);
                self.set_state(GestureState::PinchZoom {
                    primary: pointer,
                    secondary: TrackedPointer::secondary(id, position),
                    anchor,
                });
            }
            pinch @ GestureState::PinchZoom { .. } => self.state = pinch,
        }
    }

    pub fn on_move(&mut self, env: &mut GestureEnv<'_>, id: PointerId, position: Point) {
        self.sync(env.generation);
        let promoted = match &mut self.state {
            GestureState::Idle { pending } => {
                let Some(index) = pending.iter().position(|p| p.id == id) else { return };
                pending[index].position = position;
                if !exceeds_threshold(pending[index].origin, position, env.config.move_threshold) {
                    return;
                }
                let mut pointer = pending.remove(index);
                pointer.promote(Role::Primary);
                Some((pointer, std::mem::take(pending)))
            }
            GestureState::Pan { pointer, .. } => {
                if pointer.id != id {
                    return;
                }
                pointer.position = position;
                None
            }
            GestureState::PinchZoom { primary, secondary, .. } => {
                if primary.id == id {
                    primary.position = position;
                } else if secondary.id == id {
                    secondary.position = position;
                } else {
                    return;
                }
                None
            }
        };
        if let Some((pointer, rest)) = promoted {
            self.promote(env, pointer, rest);
        }
        if self.apply(env) {
            env.commits.arm(&mut self.commit_timer, env.scheduler, env.now, &self.target);
        }
    }

    /// First pointer crossed the threshold: leave `Idle`.
    fn promote(&mut self, env: &mut GestureEnv<'_>, mut pointer: TrackedPointer, rest: Vec<TrackedPointer>) {
        let Some(anchor) = transform::capture(env.elements, &self.target, env.capabilities) else {
            self.state = GestureState::default();
            return;
        };
        let second = if env.capabilities.allows_secondary() { rest.into_iter().next() } else { None };
        let state = match second {
            Some(mut secondary) => {
                pointer.rebase();
                secondary.promote(Role::Secondary);
                secondary.rebase();
                GestureState::PinchZoom { primary: pointer, secondary, anchor }
            }
            None => GestureState::Pan { pointer, anchor },
        };
        self.set_state(state);
    }

    /// Apply the current gesture to the target. Returns true if geometry
    /// was updated.
    fn apply(&mut self, env: &mut GestureEnv<'_>) -> bool {
        if !self.transforms(env) {
            return false;
        }
        let is_background = env.elements.get(&self.target).is_some_and(|e| e.is_background());
        match &self.state {
            GestureState::Idle { .. } => false,
            GestureState::Pan { pointer, anchor } => {
                if is_background && env.commits.has_pending_drags() {
                    // A board grab commits every element still being dragged
                    // and invalidates the pointers dragging them.
                    env.generation.bump();
                    self.tracker.refresh(env.generation);
                    let mut updates = Vec::new();
                    for dragged in env.commits.take_drags() {
                        updates.extend(transform::sink(env.elements, &dragged));
                    }
                    env.send(Outbound::Commit { updates });
                }
                transform::apply_pan(env.elements, &self.target, anchor, pointer.displacement());
                if !is_background && env.commits.begin_drag(&self.target) {
                    transform::raise_to_top(env.elements, &self.target);
                }
                log::trace!("{}: pan by {:?}", self.target, pointer.displacement());
                true
            }
            GestureState::PinchZoom { primary, secondary, anchor } => {
                transform::apply_pinch(env.elements, &self.target, anchor, primary, secondary, env.config)
            }
        }
    }

    /// Handle release or cancellation. Returns true when the release was a
    /// tap whose action the caller should dispatch.
    pub fn on_up(&mut self, env: &mut GestureEnv<'_>, id: PointerId) -> bool {
        self.sync(env.generation);
        match std::mem::take(&mut self.state) {
            GestureState::Idle { mut pending } => {
                let Some(index) = pending.iter().position(|p| p.id == id) else {
                    self.state = GestureState::Idle { pending };
                    return false;
                };
                pending.remove(index);
                self.state = GestureState::Idle { pending };
                if env.commits.has_pending_drags() {
                    let updates = commit::updates_for(env.elements, env.commits.drags());
                    env.send(Outbound::Commit { updates });
                }
                log::debug!("{}: tap", self.target);
                true
            }
            GestureState::Pan { pointer, anchor } => {
                if pointer.id != id {
                    self.state = GestureState::Pan { pointer, anchor };
                    return false;
                }
                self.set_state(GestureState::default());
                let is_background = env.elements.get(&self.target).is_some_and(|e| e.is_background());
                if is_background {
                    let updates = commit::persistent(env.elements, env.capabilities);
                    env.send(Outbound::Commit { updates });
                } else if env.commits.end_drag(&self.target) {
                    let updates = transform::sink(env.elements, &self.target);
                    env.send(Outbound::Commit { updates });
                }
                env.commits.disarm(&mut self.commit_timer, env.scheduler);
                false
            }
            GestureState::PinchZoom { primary, secondary, anchor } => {
                let mut remaining = if primary.id == id {
                    secondary
                } else if secondary.id == id {
                    primary
                } else {
                    self.state = GestureState::PinchZoom { primary, secondary, anchor };
                    return false;
                };
                remaining.rebase();
                remaining.role = Role::Primary;
                let anchor = transform::capture(env.elements, &self.target, env.capabilities).unwrap_or(anchor);
                self.set_state(GestureState::Pan { pointer: remaining, anchor });
                let updates = env.updates(&self.target);
                env.send(Outbound::Commit { updates });
                env.commits.disarm(&mut self.commit_timer, env.scheduler);
                false
            }
        }
    }

    /// Throttle interval elapsed: report live geometry and restart
    /// displacement measurement from it.
    pub fn on_commit_timer(&mut self, env: &mut GestureEnv<'_>) {
        self.commit_timer = None;
        self.sync(env.generation);
        let is_background = env.elements.get(&self.target).is_some_and(|e| e.is_background());
        if !is_background && !env.commits.is_dragging(&self.target) && matches!(self.state, GestureState::Pan { .. }) {
            return;
        }
        let Some(fresh) = transform::capture(env.elements, &self.target, env.capabilities) else { return };
        match &mut self.state {
            GestureState::Idle { .. } => return,
            GestureState::Pan { pointer, anchor } => {
                pointer.rebase();
                *anchor = fresh;
            }
            GestureState::PinchZoom { primary, secondary, anchor } => {
                primary.rebase();
                secondary.rebase();
                *anchor = fresh;
            }
        }
        let updates = env.updates(&self.target);
        env.send(Outbound::Drags { updates });
    }

    /// Forget all pointers and any pending throttle timer.
    pub fn reset(&mut self, scheduler: &mut Scheduler) {
        scheduler.cancel_slot(&mut self.commit_timer);
        self.state = GestureState::default();
    }
}
