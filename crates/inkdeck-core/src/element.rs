//! Slide elements and the category index.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Z value of a pinned element, exempt from reordering.
pub const PINNED_Z: i32 = 9999;

/// Host-assigned element identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind of element on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// The slide background; gestures on it move whole categories.
    Background,
    /// Free-floating text; `size` is the font size.
    Text,
    /// Image; `size` is the width.
    Image,
    /// Participant avatar; `size` is the width.
    Avatar,
    /// Video clip; `size` is the width.
    Media,
}

/// Groups of elements that follow background gestures together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Text,
    Visual,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Text, Category::Visual];
}

impl ElementKind {
    /// The group-move category, if any.
    pub fn category(self) -> Option<Category> {
        match self {
            ElementKind::Background => None,
            ElementKind::Text => Some(Category::Text),
            ElementKind::Image | ElementKind::Avatar | ElementKind::Media => Some(Category::Visual),
        }
    }
}

/// Position, size and stacking of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub position: Point,
    pub size: f64,
    pub z: i32,
}

impl Geometry {
    pub fn new(x: f64, y: f64, size: f64, z: i32) -> Self {
        Self {
            position: Point::new(x, y),
            size,
            z,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.z == PINNED_Z
    }
}

/// An element mirrored from the host layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub geometry: Geometry,
    /// Laid-out box size, used for overlap tests.
    pub extent: Size,
    pub draggable: bool,
    pub resizable: bool,
    pub group_movable: bool,
}

impl Element {
    /// Create a movable element with its capability flags set.
    pub fn new(id: impl Into<String>, kind: ElementKind, geometry: Geometry, extent: Size) -> Self {
        let movable = kind != ElementKind::Background;
        Self {
            id: ElementId::new(id),
            kind,
            geometry,
            extent,
            draggable: movable,
            resizable: movable,
            group_movable: movable,
        }
    }

    /// Create the slide background.
    pub fn background(id: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Background, Geometry::new(0.0, 0.0, 0.0, 0), Size::ZERO)
    }

    pub fn is_background(&self) -> bool {
        self.kind == ElementKind::Background
    }

    /// Bounding box in surface coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.geometry.position, self.extent)
    }

    /// Set a new size, scaling the laid-out extent to match.
    pub fn resize(&mut self, size: f64) {
        if self.geometry.size > 0.0 {
            let ratio = size / self.geometry.size;
            self.extent = Size::new(self.extent.width * ratio, self.extent.height * ratio);
        }
        self.geometry.size = size;
    }
}

/// All elements of a surface, with an incrementally maintained
/// category membership index.
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    elements: BTreeMap<ElementId, Element>,
    categories: BTreeMap<Category, BTreeSet<ElementId>>,
}

impl ElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an element.
    pub fn insert(&mut self, element: Element) {
        let id = element.id.clone();
        if let Some(previous) = self.elements.get(&id).map(|e| e.kind) {
            self.unindex(&id, previous);
        }
        if let Some(category) = element.kind.category() {
            self.categories.entry(category).or_default().insert(id.clone());
        }
        self.elements.insert(id, element);
    }

    /// Remove an element.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let element = self.elements.remove(id)?;
        self.unindex(id, element.kind);
        Some(element)
    }

    fn unindex(&mut self, id: &ElementId, kind: ElementKind) {
        if let Some(category) = kind.category() {
            if let Some(members) = self.categories.get_mut(&category) {
                members.remove(id);
            }
        }
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Members of a category, in id order.
    pub fn members(&self, category: Category) -> impl Iterator<Item = &ElementId> {
        self.categories.get(&category).into_iter().flatten()
    }

    /// Group-movable members of every category `moves` selects, looked up
    /// through the category index.
    pub fn group_members<'a>(
        &'a self,
        moves: impl Fn(Category) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        Category::ALL
            .into_iter()
            .filter(move |&category| moves(category))
            .flat_map(move |category| self.members(category))
            .filter_map(move |id| self.elements.get(id))
            .filter(|e| e.group_movable)
    }

    /// Draggable, non-pinned elements other than `except`.
    pub fn restackable_except<'a>(&'a self, except: &'a ElementId) -> impl Iterator<Item = &'a Element> {
        self.elements
            .values()
            .filter(move |e| e.draggable && !e.geometry.is_pinned() && &e.id != except)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str) -> Element {
        Element::new(id, ElementKind::Image, Geometry::new(0.0, 0.0, 100.0, 1), Size::new(100.0, 80.0))
    }

    #[test]
    fn test_category_index_tracks_lifecycle() {
        let mut index = ElementIndex::new();
        index.insert(image("a"));
        index.insert(Element::new("t", ElementKind::Text, Geometry::new(0.0, 0.0, 40.0, 2), Size::new(200.0, 40.0)));
        index.insert(Element::background("board"));

        assert_eq!(index.members(Category::Visual).count(), 1);
        assert_eq!(index.members(Category::Text).count(), 1);
        assert_eq!(index.group_members(|_| true).count(), 2);
        let visual: Vec<_> = index.group_members(|c| c == Category::Visual).map(|e| e.id.as_str()).collect();
        assert_eq!(visual, vec!["a"]);

        index.remove(&ElementId::from("a"));
        assert_eq!(index.members(Category::Visual).count(), 0);
    }

    #[test]
    fn test_reinsert_with_new_kind_moves_category() {
        let mut index = ElementIndex::new();
        index.insert(image("a"));
        let mut changed = image("a");
        changed.kind = ElementKind::Text;
        index.insert(changed);

        assert_eq!(index.members(Category::Visual).count(), 0);
        assert_eq!(index.members(Category::Text).count(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_group_members_skip_pinned_in_place() {
        let mut index = ElementIndex::new();
        index.insert(image("a"));
        let mut fixed = image("b");
        fixed.group_movable = false;
        index.insert(fixed);
        index.insert(Element::background("board"));

        let ids: Vec<_> = index.group_members(|_| true).map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(index.group_members(|_| false).count(), 0);
    }

    #[test]
    fn test_resize_scales_extent() {
        let mut element = image("a");
        element.resize(200.0);
        assert!((element.extent.width - 200.0).abs() < f64::EPSILON);
        assert!((element.extent.height - 160.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_restackable_skips_pinned() {
        let mut index = ElementIndex::new();
        index.insert(image("a"));
        let mut pinned = image("p");
        pinned.geometry.z = PINNED_Z;
        index.insert(pinned);
        index.insert(image("b"));

        let a = ElementId::from("a");
        let ids: Vec<_> = index.restackable_except(&a).map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}
