//! Outbound transform notifications.
//!
//! Local geometry changes apply immediately. The session owner hears about
//! them at most once per throttle interval while a gesture runs (a `drags`
//! batch) and once more when it ends (a `commit` batch).

use crate::channel::TransformUpdate;
use crate::config::Capabilities;
use crate::element::{ElementId, ElementIndex};
use crate::scheduler::{Scheduler, Task, TaskHandle};
use std::collections::BTreeSet;

/// Tracks individually dragged elements whose final position has not
/// been committed, and arms throttle timers.
#[derive(Debug, Clone)]
pub struct CommitScheduler {
    interval: f64,
    draggings: BTreeSet<ElementId>,
}

impl CommitScheduler {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            draggings: BTreeSet::new(),
        }
    }

    /// Add to the drag set. Returns true if it was not already there.
    pub fn begin_drag(&mut self, id: &ElementId) -> bool {
        self.draggings.insert(id.clone())
    }

    /// Remove from the drag set. Returns true if it was there.
    pub fn end_drag(&mut self, id: &ElementId) -> bool {
        self.draggings.remove(id)
    }

    pub fn is_dragging(&self, id: &ElementId) -> bool {
        self.draggings.contains(id)
    }

    pub fn has_pending_drags(&self) -> bool {
        !self.draggings.is_empty()
    }

    pub fn drags(&self) -> impl Iterator<Item = &ElementId> {
        self.draggings.iter()
    }

    /// Empty the drag set, returning its members.
    pub fn take_drags(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.draggings).into_iter().collect()
    }

    pub fn forget(&mut self, id: &ElementId) {
        self.draggings.remove(id);
    }

    /// Schedule a throttled commit for `target` unless one is pending.
    pub fn arm(&self, slot: &mut Option<TaskHandle>, scheduler: &mut Scheduler, now: f64, target: &ElementId) {
        if slot.is_none() {
            *slot = Some(scheduler.schedule_at(now + self.interval, Task::CommitThrottle(target.clone())));
        }
    }

    pub fn disarm(&self, slot: &mut Option<TaskHandle>, scheduler: &mut Scheduler) {
        scheduler.cancel_slot(slot);
    }
}

/// Current geometry of the given elements.
pub fn updates_for<'a>(elements: &ElementIndex, ids: impl IntoIterator<Item = &'a ElementId>) -> Vec<TransformUpdate> {
    ids.into_iter()
        .filter_map(|id| elements.get(id))
        .map(TransformUpdate::from)
        .collect()
}

/// Current geometry of every member of the categories that follow
/// background gestures.
pub fn persistent(elements: &ElementIndex, capabilities: Capabilities) -> Vec<TransformUpdate> {
    elements
        .group_members(move |c| capabilities.moves(c))
        .map(TransformUpdate::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, ElementKind, Geometry};
    use kurbo::Size;

    #[test]
    fn test_drag_set() {
        let mut commits = CommitScheduler::new(100.0);
        let a = ElementId::from("a");
        assert!(commits.begin_drag(&a));
        assert!(!commits.begin_drag(&a));
        assert!(commits.has_pending_drags());
        assert_eq!(commits.take_drags(), vec![a.clone()]);
        assert!(!commits.is_dragging(&a));
        assert!(!commits.end_drag(&a));
    }

    #[test]
    fn test_arm_keeps_single_pending_timer() {
        let commits = CommitScheduler::new(100.0);
        let mut scheduler = Scheduler::new();
        let mut slot = None;
        let target = ElementId::from("a");

        commits.arm(&mut slot, &mut scheduler, 0.0, &target);
        let first = slot;
        commits.arm(&mut slot, &mut scheduler, 50.0, &target);
        assert_eq!(slot, first);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next_due(), Some(100.0));

        commits.disarm(&mut slot, &mut scheduler);
        assert!(slot.is_none());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_persistent_respects_toggles() {
        let mut elements = ElementIndex::new();
        let extent = Size::new(10.0, 10.0);
        elements.insert(Element::new("t", ElementKind::Text, Geometry::new(0.0, 0.0, 40.0, 1), extent));
        elements.insert(Element::new("i", ElementKind::Image, Geometry::new(0.0, 0.0, 40.0, 2), extent));
        elements.insert(Element::background("board"));

        let caps = Capabilities { group_text: true, ..Capabilities::default() };
        let updates = persistent(&elements, caps);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].item, ElementId::from("t"));
        assert!(persistent(&elements, Capabilities::default()).is_empty());

        let ids = [ElementId::from("i"), ElementId::from("missing")];
        assert_eq!(updates_for(&elements, &ids).len(), 1);
    }
}
