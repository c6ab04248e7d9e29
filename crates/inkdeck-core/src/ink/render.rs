//! Ink painting into display lists.
//!
//! A [`Scene`] is a retained list of paint operations in device
//! coordinates; the host rasterizes it. The surface keeps two scenes: a
//! static layer with committed ink and a live layer with in-progress tails.

use super::stroke::Stroke;
use super::timeline::Slide;
use super::width::{Segment, WidthModel};
use crate::config::InkConfig;
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

/// A single paint operation with round caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintOp {
    Segment {
        style: String,
        width: f64,
        from: Point,
        to: Point,
    },
    Dot {
        style: String,
        diameter: f64,
        at: Point,
    },
}

impl PaintOp {
    pub fn style(&self) -> &str {
        match self {
            Self::Segment { style, .. } | Self::Dot { style, .. } => style,
        }
    }
}

/// Display list for one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    ops: Vec<PaintOp>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Append an operation and return its index.
    pub fn push(&mut self, op: PaintOp) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    /// Overwrite the operation at `index`. Returns false if out of range.
    pub fn replace(&mut self, index: usize, op: PaintOp) -> bool {
        match self.ops.get_mut(index) {
            Some(slot) => {
                *slot = op;
                true
            }
            None => false,
        }
    }

    pub fn ops(&self) -> &[PaintOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Paints strokes with the speed-sensitive width model.
#[derive(Debug, Clone)]
pub struct Renderer {
    /// Surface to device transform.
    pub view: Affine,
    model: WidthModel,
    future_style: String,
    eraser_cursor_style: String,
    eraser_width: f64,
}

impl Renderer {
    pub fn new(config: &InkConfig) -> Self {
        Self {
            view: Affine::IDENTITY,
            model: WidthModel::from_config(config),
            future_style: config.future_style.clone(),
            eraser_cursor_style: config.eraser_cursor_style.clone(),
            eraser_width: config.eraser_width(),
        }
    }

    pub fn future_style(&self) -> &str {
        &self.future_style
    }

    /// Paint a segment; a zero-length segment becomes a dot.
    pub fn paint(&self, scene: &mut Scene, style: &str, width: f64, from: Point, to: Point) {
        let (from, to) = (self.view * from, self.view * to);
        let op = if from == to {
            PaintOp::Dot { style: style.to_string(), diameter: width, at: to }
        } else {
            PaintOp::Segment { style: style.to_string(), width, from, to }
        };
        scene.push(op);
    }

    /// Repaint a slide's committed ink.
    ///
    /// Once a stroke reaches the scrub time, the rest of it is painted in
    /// the future style. Eraser cursors are drawn on top.
    pub fn static_redraw(
        &self,
        scene: &mut Scene,
        slide: Option<&Slide>,
        cursors: impl IntoIterator<Item = Point>,
    ) {
        scene.clear();
        if let Some(slide) = slide {
            let scrub = slide.scrub_time();
            for stroke in slide.strokes().iter().filter(|s| !s.is_erased()) {
                let Some(color) = stroke.style.color() else { continue };
                let mut style = color;
                for segment in self.model.segments(stroke) {
                    if scrub.is_some_and(|time| time <= stroke.t0 + segment.to.t) {
                        style = self.future_style.as_str();
                    }
                    self.paint_segment(scene, style, &segment);
                }
            }
        }
        for cursor in cursors {
            scene.push(PaintOp::Dot {
                style: self.eraser_cursor_style.clone(),
                diameter: self.eraser_width,
                at: self.view * cursor,
            });
        }
        log::trace!("static redraw: {} ops", scene.len());
    }

    /// Paint every live stroke of a slide in the future style.
    pub fn paint_muted(&self, scene: &mut Scene, slide: &Slide) {
        for stroke in slide.strokes().iter().filter(|s| !s.is_erased()) {
            self.paint_stroke(scene, &self.future_style, stroke);
        }
    }

    fn paint_stroke(&self, scene: &mut Scene, style: &str, stroke: &Stroke) {
        for segment in self.model.segments(stroke) {
            self.paint_segment(scene, style, &segment);
        }
    }

    fn paint_segment(&self, scene: &mut Scene, style: &str, segment: &Segment) {
        self.paint(scene, style, segment.width, segment.from.position, segment.to.position);
    }

    /// Paint the newest piece of an in-progress stroke.
    pub fn paint_live_segment(&self, scene: &mut Scene, style: &str, segment: &Segment) {
        self.paint_segment(scene, style, segment);
    }

    /// Keep a resting pen tip visible. The dot at `previous` is replaced
    /// when given; returns the index of the dot.
    pub fn diffuse(&self, scene: &mut Scene, previous: Option<usize>, style: &str, at: Point, width: f64) -> usize {
        let dot = PaintOp::Dot {
            style: style.to_string(),
            diameter: width,
            at: self.view * at,
        };
        match previous {
            Some(index) if scene.replace(index, dot.clone()) => index,
            _ => scene.push(dot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::InkStyle;
    use kurbo::Vec2;

    fn renderer() -> Renderer {
        Renderer::new(&InkConfig::default())
    }

    fn stroke(t0: f64, color: &str) -> Stroke {
        let mut s = Stroke::begin(t0, InkStyle::Color(color.into()), Point::new(0.0, 0.0));
        s.push(10.0, Point::new(10.0, 0.0));
        s.push(20.0, Point::new(20.0, 0.0));
        s
    }

    fn styles(scene: &Scene) -> Vec<&str> {
        scene.ops().iter().map(PaintOp::style).collect()
    }

    #[test]
    fn test_static_redraw_mutes_future_ink() {
        let mut slide = Slide::default();
        slide.replace(vec![stroke(0.0, "red"), stroke(100.0, "blue")]);
        slide.seek(1);

        let r = renderer();
        let mut scene = Scene::new();
        r.static_redraw(&mut scene, Some(&slide), None::<Point>);
        let future = r.future_style();
        assert_eq!(styles(&scene), vec!["red", "red", future, future]);
    }

    #[test]
    fn test_static_redraw_skips_erased() {
        let mut erased = stroke(0.0, "red");
        erased.erase();
        let mut slide = Slide::default();
        slide.replace(vec![erased, stroke(100.0, "blue")]);

        let mut scene = Scene::new();
        renderer().static_redraw(&mut scene, Some(&slide), [Point::new(5.0, 5.0)]);
        assert_eq!(styles(&scene), vec!["blue", "blue", "#ffffff"]);
    }

    #[test]
    fn test_redraw_replaces_previous_ops() {
        let mut scene = Scene::new();
        scene.push(PaintOp::Dot { style: "x".into(), diameter: 1.0, at: Point::ZERO });
        renderer().static_redraw(&mut scene, None, None::<Point>);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_view_transform_applies_to_points() {
        let mut r = renderer();
        r.view = Affine::translate(Vec2::new(5.0, 0.0)) * Affine::scale(2.0);
        let mut scene = Scene::new();
        r.paint(&mut scene, "red", 3.0, Point::new(1.0, 1.0), Point::new(2.0, 1.0));
        assert_eq!(
            scene.ops(),
            &[PaintOp::Segment {
                style: "red".into(),
                width: 3.0,
                from: Point::new(7.0, 2.0),
                to: Point::new(9.0, 2.0),
            }]
        );
    }

    #[test]
    fn test_diffuse_replaces_resting_dot() {
        let r = renderer();
        let mut scene = Scene::new();
        scene.push(PaintOp::Segment { style: "red".into(), width: 2.0, from: Point::ZERO, to: Point::new(1.0, 0.0) });
        let index = r.diffuse(&mut scene, None, "red", Point::new(1.0, 0.0), 3.0);
        assert_eq!(index, 1);
        assert_eq!(r.diffuse(&mut scene, Some(index), "red", Point::new(1.0, 0.0), 5.0), 1);
        assert_eq!(scene.len(), 2);
        assert!(matches!(scene.ops()[1], PaintOp::Dot { diameter, .. } if (diameter - 5.0).abs() < f64::EPSILON));
        // A stale index after the layer was cleared falls back to a push.
        scene.clear();
        assert_eq!(r.diffuse(&mut scene, Some(index), "red", Point::ZERO, 1.0), 0);
    }

    #[test]
    fn test_zero_length_segment_is_dot() {
        let mut scene = Scene::new();
        renderer().paint(&mut scene, "red", 4.0, Point::new(1.0, 1.0), Point::new(1.0, 1.0));
        assert!(matches!(scene.ops()[0], PaintOp::Dot { diameter, .. } if (diameter - 4.0).abs() < f64::EPSILON));
    }
}
