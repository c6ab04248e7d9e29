//! Applying gesture deltas to element geometry, and z-order resolution.

use crate::channel::TransformUpdate;
use crate::config::{Capabilities, GestureConfig};
use crate::element::{Element, ElementId, ElementIndex, ElementKind, Geometry};
use crate::pointer::TrackedPointer;
use kurbo::{Point, Vec2};
use std::collections::BTreeMap;

/// Geometry captured when a gesture segment began.
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// The gesture target itself.
    Single(Geometry),
    /// Every member of the categories that follow a background gesture.
    Group(BTreeMap<ElementId, Geometry>),
}

/// Snapshot the geometry a gesture on `target` will move.
pub fn capture(elements: &ElementIndex, target: &ElementId, capabilities: Capabilities) -> Option<Anchor> {
    let element = elements.get(target)?;
    if !element.is_background() {
        return Some(Anchor::Single(element.geometry));
    }
    let members = elements
        .group_members(move |c| capabilities.moves(c))
        .map(|e| (e.id.clone(), e.geometry))
        .collect();
    Some(Anchor::Group(members))
}

/// Translate by the pointer's displacement from its origin.
pub fn apply_pan(elements: &mut ElementIndex, target: &ElementId, anchor: &Anchor, displacement: Vec2) {
    match anchor {
        Anchor::Single(captured) => {
            if let Some(element) = elements.get_mut(target) {
                element.geometry.position = (captured.position + displacement).round();
            }
        }
        Anchor::Group(members) => {
            for (id, captured) in members {
                if let Some(element) = elements.get_mut(id) {
                    element.geometry.position = (captured.position + displacement).round();
                }
            }
        }
    }
}

/// Scale and translate so the content under `primary` stays under it.
///
/// Returns false without touching anything when the pointers started at
/// the same spot and the ratio is undefined.
pub fn apply_pinch(
    elements: &mut ElementIndex,
    target: &ElementId,
    anchor: &Anchor,
    primary: &TrackedPointer,
    secondary: &TrackedPointer,
    config: &GestureConfig,
) -> bool {
    let baseline = (primary.origin - secondary.origin).hypot();
    let current = (primary.position - secondary.position).hypot();
    let raw = current / baseline;
    if baseline == 0.0 || !raw.is_finite() {
        log::debug!("pinch on {target} skipped: zero baseline");
        return false;
    }
    match anchor {
        Anchor::Single(captured) => {
            let Some(element) = elements.get_mut(target) else { return false };
            let ratio = pinch_ratio(element.kind, raw, captured.size, config);
            place(element, primary, captured, ratio, config);
        }
        Anchor::Group(members) => {
            let ratio = config.group_zoom.clamp(raw);
            for (id, captured) in members {
                if let Some(element) = elements.get_mut(id) {
                    place(element, primary, captured, ratio, config);
                }
            }
        }
    }
    true
}

/// Non-resizable elements only follow the primary pointer.
fn place(element: &mut Element, primary: &TrackedPointer, captured: &Geometry, ratio: f64, config: &GestureConfig) {
    let ratio = if element.resizable { ratio } else { 1.0 };
    let (position, size) = scaled(primary, captured, ratio, config);
    element.geometry.position = position;
    if element.resizable {
        element.resize(size);
    }
}

fn scaled(primary: &TrackedPointer, captured: &Geometry, ratio: f64, config: &GestureConfig) -> (Point, f64) {
    let offset = ((primary.origin - captured.position) * ratio).round();
    let size = (captured.size * ratio).round().max(config.minimum_size);
    (primary.position - offset, size)
}

/// Ratio actually applied to an element of `kind` whose captured size is
/// `size`. Text and bounded media keep their resulting size in range.
pub fn pinch_ratio(kind: ElementKind, raw: f64, size: f64, config: &GestureConfig) -> f64 {
    let bounds = match kind {
        ElementKind::Background => return config.group_zoom.clamp(raw),
        ElementKind::Text => Some(config.text_size),
        ElementKind::Media => config.media_size,
        ElementKind::Image | ElementKind::Avatar => None,
    };
    match bounds {
        Some(bounds) if size > 0.0 => raw.clamp(bounds.min / size, bounds.max / size),
        _ => raw,
    }
}

/// Put `target` above every other restackable element.
pub fn raise_to_top(elements: &mut ElementIndex, target: &ElementId) -> Option<i32> {
    let top = elements
        .restackable_except(target)
        .map(|e| e.geometry.z)
        .fold(0, i32::max);
    let element = elements.get_mut(target)?;
    element.geometry.z = top + 1;
    log::debug!("raised {target} to z={}", top + 1);
    Some(top + 1)
}

/// Nest a dropped element beneath the larger elements it was dropped
/// onto and keep z values dense. Returns the updates to report, the
/// dropped element first.
pub fn sink(elements: &mut ElementIndex, target: &ElementId) -> Vec<TransformUpdate> {
    let Some(element) = elements.get(target) else { return Vec::new() };
    if element.geometry.is_pinned() {
        return vec![TransformUpdate::from(element)];
    }
    let center = element.bounds().center();
    let extent = element.extent;
    let z = elements
        .restackable_except(target)
        .filter(|e| e.bounds().contains(center))
        .filter(|e| e.extent.width >= extent.width && e.extent.height >= extent.height)
        .map(|e| e.geometry.z)
        .fold(element.geometry.z, i32::min);

    let bumped: Vec<ElementId> = elements
        .restackable_except(target)
        .filter(|e| e.geometry.z >= z)
        .map(|e| e.id.clone())
        .collect();

    let mut updates = Vec::with_capacity(bumped.len() + 1);
    if let Some(element) = elements.get_mut(target) {
        element.geometry.z = z;
        updates.push(TransformUpdate::from(&*element));
    }
    for id in &bumped {
        if let Some(element) = elements.get_mut(id) {
            element.geometry.z += 1;
            updates.push(TransformUpdate::from(&*element));
        }
    }
    log::debug!("sank {target} to z={z}, bumped {}", bumped.len());
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bounds;
    use crate::element::PINNED_Z;
    use crate::input::PointerId;
    use kurbo::Size;
    use std::collections::BTreeSet;

    fn element(id: &str, kind: ElementKind, x: f64, y: f64, size: f64, z: i32) -> Element {
        Element::new(id, kind, Geometry::new(x, y, size, z), Size::new(size, size))
    }

    fn pointers(origin: (Point, Point), position: (Point, Point)) -> (TrackedPointer, TrackedPointer) {
        let mut p = TrackedPointer::pending(PointerId(1), origin.0);
        let mut q = TrackedPointer::secondary(PointerId(2), origin.1);
        p.position = position.0;
        q.position = position.1;
        (p, q)
    }

    fn z(elements: &ElementIndex, id: &str) -> i32 {
        elements.get(&ElementId::from(id)).unwrap().geometry.z
    }

    fn distinct_z(elements: &ElementIndex) -> bool {
        let zs: Vec<i32> = elements
            .iter()
            .filter(|e| !e.geometry.is_pinned())
            .map(|e| e.geometry.z)
            .collect();
        zs.iter().collect::<BTreeSet<_>>().len() == zs.len()
    }

    #[test]
    fn test_pan_single_and_group() {
        let mut elements = ElementIndex::new();
        elements.insert(element("a", ElementKind::Image, 10.0, 10.0, 50.0, 1));
        elements.insert(element("t", ElementKind::Text, 0.0, 0.0, 40.0, 2));
        elements.insert(Element::background("board"));

        let a = ElementId::from("a");
        let anchor = capture(&elements, &a, Capabilities::default()).unwrap();
        apply_pan(&mut elements, &a, &anchor, Vec2::new(5.4, -3.0));
        assert_eq!(elements.get(&a).unwrap().geometry.position, Point::new(15.0, 7.0));

        let board = ElementId::from("board");
        let caps = Capabilities { group_text: true, ..Capabilities::default() };
        let anchor = capture(&elements, &board, caps).unwrap();
        apply_pan(&mut elements, &board, &anchor, Vec2::new(100.0, 0.0));
        assert_eq!(elements.get(&ElementId::from("t")).unwrap().geometry.position, Point::new(100.0, 0.0));
        // Visual category is off.
        assert_eq!(elements.get(&a).unwrap().geometry.position, Point::new(15.0, 7.0));
    }

    #[test]
    fn test_pinch_scales_about_primary() {
        let mut elements = ElementIndex::new();
        elements.insert(element("img", ElementKind::Image, 100.0, 100.0, 100.0, 1));
        let id = ElementId::from("img");
        let anchor = capture(&elements, &id, Capabilities::default()).unwrap();
        let (p, q) = pointers(
            (Point::new(150.0, 150.0), Point::new(170.0, 150.0)),
            (Point::new(150.0, 150.0), Point::new(190.0, 150.0)),
        );

        assert!(apply_pinch(&mut elements, &id, &anchor, &p, &q, &GestureConfig::default()));
        let g = elements.get(&id).unwrap().geometry;
        assert_eq!(g.position, Point::new(50.0, 50.0));
        assert!((g.size - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pinch_moves_but_keeps_size_of_fixed_size_element() {
        let mut elements = ElementIndex::new();
        let mut img = element("img", ElementKind::Image, 100.0, 100.0, 100.0, 1);
        img.resizable = false;
        elements.insert(img);
        let id = ElementId::from("img");
        let anchor = capture(&elements, &id, Capabilities::default()).unwrap();
        let (p, q) = pointers(
            (Point::new(150.0, 150.0), Point::new(170.0, 150.0)),
            (Point::new(160.0, 155.0), Point::new(200.0, 155.0)),
        );

        assert!(apply_pinch(&mut elements, &id, &anchor, &p, &q, &GestureConfig::default()));
        let img = elements.get(&id).unwrap();
        assert_eq!(img.geometry.position, Point::new(110.0, 105.0));
        assert!((img.geometry.size - 100.0).abs() < f64::EPSILON);
        assert!((img.extent.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pinch_zero_baseline_is_skipped() {
        let mut elements = ElementIndex::new();
        elements.insert(element("img", ElementKind::Image, 0.0, 0.0, 100.0, 1));
        let id = ElementId::from("img");
        let anchor = capture(&elements, &id, Capabilities::default()).unwrap();
        let (p, q) = pointers(
            (Point::new(5.0, 5.0), Point::new(5.0, 5.0)),
            (Point::new(5.0, 5.0), Point::new(50.0, 5.0)),
        );
        assert!(!apply_pinch(&mut elements, &id, &anchor, &p, &q, &GestureConfig::default()));
        let g = elements.get(&id).unwrap().geometry;
        assert!(g.size.is_finite());
        assert!((g.size - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_size_clamped() {
        let config = GestureConfig::default();
        // 40 * 0.1 = 4 would fall below the 30 floor.
        let r = pinch_ratio(ElementKind::Text, 0.1, 40.0, &config);
        assert!((40.0 * r - 30.0).abs() < 1e-9);
        let r = pinch_ratio(ElementKind::Text, 100.0, 40.0, &config);
        assert!((40.0 * r - 2000.0).abs() < 1e-9);
        // Images are unclamped.
        assert!((pinch_ratio(ElementKind::Image, 100.0, 40.0, &config) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_group_and_media_ratios() {
        let mut config = GestureConfig::default();
        assert!((pinch_ratio(ElementKind::Background, 5.0, 0.0, &config) - 2.0).abs() < f64::EPSILON);
        assert!((pinch_ratio(ElementKind::Background, 0.1, 0.0, &config) - 0.5).abs() < f64::EPSILON);
        assert!((pinch_ratio(ElementKind::Media, 9.0, 100.0, &config) - 9.0).abs() < f64::EPSILON);
        config.media_size = Some(Bounds::new(50.0, 400.0));
        assert!((pinch_ratio(ElementKind::Media, 9.0, 100.0, &config) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pinch_never_collapses_size() {
        let mut elements = ElementIndex::new();
        elements.insert(element("img", ElementKind::Image, 0.0, 0.0, 10.0, 1));
        let id = ElementId::from("img");
        let anchor = capture(&elements, &id, Capabilities::default()).unwrap();
        let (p, q) = pointers(
            (Point::new(0.0, 0.0), Point::new(1000.0, 0.0)),
            (Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
        );
        apply_pinch(&mut elements, &id, &anchor, &p, &q, &GestureConfig::default());
        assert!(elements.get(&id).unwrap().geometry.size >= 1.0);
    }

    #[test]
    fn test_raise_to_top_ignores_pinned() {
        let mut elements = ElementIndex::new();
        elements.insert(element("a", ElementKind::Image, 0.0, 0.0, 10.0, 1));
        elements.insert(element("b", ElementKind::Image, 0.0, 0.0, 10.0, 4));
        elements.insert(element("p", ElementKind::Image, 0.0, 0.0, 10.0, PINNED_Z));
        assert_eq!(raise_to_top(&mut elements, &ElementId::from("a")), Some(5));
    }

    #[test]
    fn test_sink_nests_under_larger_element() {
        let mut elements = ElementIndex::new();
        elements.insert(element("big", ElementKind::Image, 0.0, 0.0, 300.0, 1));
        elements.insert(element("other", ElementKind::Image, 500.0, 500.0, 50.0, 2));
        elements.insert(element("small", ElementKind::Image, 100.0, 100.0, 50.0, 3));
        elements.insert(element("pin", ElementKind::Image, 0.0, 0.0, 1000.0, PINNED_Z));

        let updates = sink(&mut elements, &ElementId::from("small"));
        assert_eq!(updates[0].item, ElementId::from("small"));
        assert_eq!(z(&elements, "small"), 1);
        assert_eq!(z(&elements, "big"), 2);
        assert_eq!(z(&elements, "other"), 3);
        assert_eq!(z(&elements, "pin"), PINNED_Z);
        assert_eq!(updates.len(), 3);
        assert!(distinct_z(&elements));
    }

    #[test]
    fn test_sink_on_empty_space_keeps_z() {
        let mut elements = ElementIndex::new();
        elements.insert(element("a", ElementKind::Image, 0.0, 0.0, 50.0, 1));
        elements.insert(element("b", ElementKind::Image, 400.0, 400.0, 50.0, 2));

        let updates = sink(&mut elements, &ElementId::from("b"));
        assert_eq!(updates.len(), 1);
        assert_eq!(z(&elements, "b"), 2);
        assert!(distinct_z(&elements));
    }

    #[test]
    fn test_sink_pinned_reports_only_itself() {
        let mut elements = ElementIndex::new();
        elements.insert(element("big", ElementKind::Image, 0.0, 0.0, 300.0, 1));
        elements.insert(element("pin", ElementKind::Image, 10.0, 10.0, 50.0, PINNED_Z));
        let updates = sink(&mut elements, &ElementId::from("pin"));
        assert_eq!(updates.len(), 1);
        assert_eq!(z(&elements, "big"), 1);
    }

    #[test]
    fn test_sink_ignores_smaller_elements() {
        let mut elements = ElementIndex::new();
        elements.insert(element("tiny", ElementKind::Image, 90.0, 90.0, 20.0, 1));
        elements.insert(element("dropped", ElementKind::Image, 50.0, 50.0, 100.0, 2));
        sink(&mut elements, &ElementId::from("dropped"));
        assert_eq!(z(&elements, "dropped"), 2);
        assert_eq!(z(&elements, "tiny"), 1);
    }
}
