use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

use crate::layout::LayoutGraph;
use crate::render::NodeStyle;
use crate::topology::NodeKey;

pub const ZOOM_IN_FACTOR: f32 = 0.9;
pub const ZOOM_OUT_FACTOR: f32 = 1.1;
pub const CLICK_SLOP: f32 = 4.0;

const MIN_SPAN: f32 = 40.0;
const MAX_SPAN: f32 = 200_000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub origin: Pos2,
    pub size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::centered(Pos2::ZERO, vec2(1200.0, 800.0))
    }
}

impl Viewport {
    pub fn centered(center: Pos2, size: Vec2) -> Self {
        let size = clamp_span(size);
        Self {
            origin: center - size * 0.5,
            size,
        }
    }

    pub fn center(&self) -> Pos2 {
        self.origin + self.size * 0.5
    }

    /// Screen points per model unit.
    pub fn scale(&self, screen: Rect) -> f32 {
        let scale = (screen.width() / self.size.x).min(screen.height() / self.size.y);
        if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        }
    }

    pub fn model_to_screen(&self, screen: Rect, model: Vec2) -> Pos2 {
        let center = self.center();
        screen.center() + (pos2(model.x, model.y) - center) * self.scale(screen)
    }

    pub fn screen_to_model(&self, screen: Rect, point: Pos2) -> Vec2 {
        self.center().to_vec2() + (point - screen.center()) / self.scale(screen)
    }

    pub fn pan_by(&mut self, screen: Rect, screen_delta: Vec2) {
        self.origin -= screen_delta / self.scale(screen);
    }

    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        *self = Self::centered(self.center(), self.size * factor);
    }

    pub fn wheel(&mut self, delta_y: f32) {
        if delta_y > 0.0 {
            self.zoom(ZOOM_IN_FACTOR);
        } else if delta_y < 0.0 {
            self.zoom(ZOOM_OUT_FACTOR);
        }
    }

    pub fn fit(&mut self, bounds: Rect, margin: f32) {
        let padded = bounds.size() * (1.0 + margin * 2.0);
        *self = Self::centered(bounds.center(), padded);
    }
}

fn clamp_span(size: Vec2) -> Vec2 {
    let largest = size.x.max(size.y);
    if !largest.is_finite() || largest <= 0.0 {
        return vec2(MIN_SPAN, MIN_SPAN);
    }

    let factor = if largest < MIN_SPAN {
        MIN_SPAN / largest
    } else if largest > MAX_SPAN {
        MAX_SPAN / largest
    } else {
        1.0
    };
    vec2((size.x * factor).max(1.0), (size.y * factor).max(1.0))
}

#[derive(Clone, Debug, PartialEq)]
enum Gesture {
    Idle,
    Panning { last: Pos2, travel: f32 },
    Dragging { key: NodeKey, last: Pos2, travel: f32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    None,
    Clicked(Option<NodeKey>),
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    viewport: Viewport,
    gesture: Gesture,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl InteractionController {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            gesture: Gesture::Idle,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    pub fn dragged_key(&self) -> Option<&str> {
        match &self.gesture {
            Gesture::Dragging { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn hit_test(&self, graph: &LayoutGraph, screen: Rect, pointer: Pos2) -> Option<usize> {
        let model = self.viewport.screen_to_model(screen, pointer);
        graph
            .nodes()
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let offset = model - node.pos;
                NodeStyle::for_kind(node.kind)
                    .shape
                    .contains(offset, node.radius)
                    .then(|| (index, offset.length_sq()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub fn pointer_down(&mut self, graph: &mut LayoutGraph, screen: Rect, pointer: Pos2) {
        self.release(graph);

        let Some(index) = self.hit_test(graph, screen, pointer) else {
            self.gesture = Gesture::Panning {
                last: pointer,
                travel: 0.0,
            };
            return;
        };

        let node = &mut graph.nodes_mut()[index];
        node.pinned = true;
        node.velocity = Vec2::ZERO;
        self.gesture = Gesture::Dragging {
            key: node.key.clone(),
            last: pointer,
            travel: 0.0,
        };
    }

    pub fn pointer_move(&mut self, graph: &mut LayoutGraph, screen: Rect, pointer: Pos2) {
        let model = self.viewport.screen_to_model(screen, pointer);
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Panning { last, travel } => {
                let delta = pointer - *last;
                *travel += delta.length();
                *last = pointer;
                self.viewport.pan_by(screen, delta);
            }
            Gesture::Dragging { key, last, travel } => {
                if pointer == *last {
                    return;
                }
                *travel += (pointer - *last).length();
                *last = pointer;
                let Some(node) = graph.node_mut(key) else {
                    self.gesture = Gesture::Idle;
                    return;
                };
                node.pos = model;
                node.velocity = Vec2::ZERO;
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        graph: &mut LayoutGraph,
        screen: Rect,
        pointer: Pos2,
    ) -> PointerOutcome {
        self.pointer_move(graph, screen, pointer);

        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => PointerOutcome::None,
            Gesture::Panning { travel, .. } => {
                if travel <= CLICK_SLOP {
                    PointerOutcome::Clicked(None)
                } else {
                    PointerOutcome::None
                }
            }
            Gesture::Dragging { key, travel, .. } => {
                let clicked = travel <= CLICK_SLOP;
                if let Some(node) = graph.node_mut(&key) {
                    node.pinned = false;
                    node.velocity = Vec2::ZERO;
                    node.dropped |= travel > 0.0;
                }
                if clicked {
                    PointerOutcome::Clicked(Some(key))
                } else {
                    PointerOutcome::None
                }
            }
        }
    }

    pub fn release(&mut self, graph: &mut LayoutGraph) {
        if let Gesture::Dragging { key, .. } = std::mem::replace(&mut self.gesture, Gesture::Idle)
            && let Some(node) = graph.node_mut(&key)
        {
            node.pinned = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout::LayoutParams;
    use crate::topology::{Node, NodeKind, RiskSnapshot, Subgraph};

    fn screen() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(1200.0, 800.0))
    }

    fn single(kind: NodeKind, at: Vec2) -> LayoutGraph {
        let mut graph = LayoutGraph::default();
        graph.reconcile(
            &Subgraph {
                nodes: vec![Node::new("n", kind, "n", "ns")],
                edges: Vec::new(),
            },
            &RiskSnapshot::default(),
            &LayoutParams::default(),
        );
        graph.nodes_mut()[0].pos = at;
        graph
    }

    #[test]
    fn default_viewport_maps_model_origin_to_screen_center() {
        let viewport = Viewport::default();
        assert_eq!(viewport.scale(screen()), 1.0);
        assert_eq!(viewport.model_to_screen(screen(), Vec2::ZERO), pos2(600.0, 400.0));
        assert_eq!(viewport.screen_to_model(screen(), pos2(700.0, 350.0)), vec2(100.0, -50.0));
    }

    #[test]
    fn transforms_round_trip_through_a_non_square_screen() {
        let mut viewport = Viewport::centered(pos2(30.0, -20.0), vec2(500.0, 500.0));
        viewport.zoom(ZOOM_IN_FACTOR);
        let screen = Rect::from_min_size(pos2(100.0, 50.0), vec2(900.0, 600.0));
        let model = vec2(12.5, 80.0);
        let back = viewport.screen_to_model(screen, viewport.model_to_screen(screen, model));
        assert!((back - model).length() < 1e-3);
    }

    #[test]
    fn wheel_scales_about_the_center() {
        let mut viewport = Viewport::centered(pos2(10.0, 10.0), vec2(1000.0, 500.0));
        viewport.wheel(1.0);
        assert!((viewport.size - vec2(900.0, 450.0)).length() < 1e-3);
        assert!((viewport.center() - pos2(10.0, 10.0)).length() < 1e-3);

        viewport.wheel(-3.0);
        assert!((viewport.size - vec2(990.0, 495.0)).length() < 1e-2);
        assert!((viewport.center() - pos2(10.0, 10.0)).length() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewport = Viewport::default();
        for _ in 0..500 {
            viewport.wheel(1.0);
        }
        assert!(viewport.size.x >= MIN_SPAN - 1e-3);
        assert!(viewport.size.x.is_finite());
    }

    #[test]
    fn background_drag_pans_opposite_to_pointer() {
        let mut graph = single(NodeKind::Service, vec2(500.0, 500.0));
        let mut controller = InteractionController::default();

        controller.pointer_down(&mut graph, screen(), pos2(100.0, 100.0));
        assert!(controller.is_panning());
        controller.pointer_move(&mut graph, screen(), pos2(160.0, 80.0));
        let outcome = controller.pointer_up(&mut graph, screen(), pos2(160.0, 80.0));

        assert_eq!(outcome, PointerOutcome::None);
        assert_eq!(controller.viewport().center(), pos2(-60.0, 20.0));
        assert_eq!(graph.nodes()[0].pos, vec2(500.0, 500.0));
    }

    #[test]
    fn background_click_reports_empty_selection() {
        let mut graph = single(NodeKind::Service, vec2(500.0, 500.0));
        let mut controller = InteractionController::default();
        controller.pointer_down(&mut graph, screen(), pos2(10.0, 10.0));
        let outcome = controller.pointer_up(&mut graph, screen(), pos2(11.0, 10.0));
        assert_eq!(outcome, PointerOutcome::Clicked(None));
    }

    #[test]
    fn clicking_a_node_selects_without_moving_it() {
        let mut graph = single(NodeKind::Pod, vec2(0.0, 0.0));
        let mut controller = InteractionController::default();

        controller.pointer_down(&mut graph, screen(), pos2(605.0, 395.0));
        assert_eq!(controller.dragged_key(), Some("n"));
        assert!(graph.nodes()[0].pinned);
        let outcome = controller.pointer_up(&mut graph, screen(), pos2(605.0, 395.0));

        assert_eq!(outcome, PointerOutcome::Clicked(Some("n".to_owned())));
        let node = &graph.nodes()[0];
        assert_eq!(node.pos, Vec2::ZERO);
        assert!(!node.pinned && !node.dropped);
    }

    #[test]
    fn short_drag_lands_on_the_release_point() {
        let mut graph = single(NodeKind::Service, Vec2::ZERO);
        let mut controller = InteractionController::default();

        controller.pointer_down(&mut graph, screen(), pos2(600.0, 400.0));
        controller.pointer_move(&mut graph, screen(), pos2(601.0, 399.0));
        assert_eq!(graph.nodes()[0].pos, vec2(1.0, -1.0));
        let outcome = controller.pointer_up(&mut graph, screen(), pos2(603.0, 398.0));

        assert_eq!(outcome, PointerOutcome::Clicked(Some("n".to_owned())));
        let node = &graph.nodes()[0];
        assert_eq!(node.pos, vec2(3.0, -2.0));
        assert!(!node.pinned && node.dropped);
    }

    #[test]
    fn hit_testing_respects_shape() {
        let controller = InteractionController::default();
        // Diamond radius 13: (9, 9) from the centre is inside the bounding circle but
        // outside the diamond.
        let diamond = single(NodeKind::Ingress, Vec2::ZERO);
        assert_eq!(controller.hit_test(&diamond, screen(), pos2(609.0, 409.0)), None);
        assert_eq!(controller.hit_test(&diamond, screen(), pos2(606.0, 406.0)), Some(0));

        // Square radius 11: the corner is outside the circle but inside the square.
        let square = single(NodeKind::Pod, Vec2::ZERO);
        assert_eq!(controller.hit_test(&square, screen(), pos2(610.0, 410.0)), Some(0));
    }

    #[test]
    fn nearest_overlapping_node_wins() {
        let mut graph = LayoutGraph::default();
        graph.reconcile(
            &Subgraph {
                nodes: vec![
                    Node::new("a", NodeKind::Service, "a", "ns"),
                    Node::new("b", NodeKind::Service, "b", "ns"),
                ],
                edges: Vec::new(),
            },
            &RiskSnapshot::default(),
            &LayoutParams::default(),
        );
        graph.nodes_mut()[0].pos = vec2(0.0, 0.0);
        graph.nodes_mut()[1].pos = vec2(10.0, 0.0);

        let controller = InteractionController::default();
        assert_eq!(controller.hit_test(&graph, screen(), pos2(608.0, 400.0)), Some(1));
        assert_eq!(controller.hit_test(&graph, screen(), pos2(602.0, 400.0)), Some(0));
    }
}
