use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use eframe::egui::{Color32, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::render::NodeStyle;
use crate::risk::{is_anomalous_source, risk_color};
use crate::topology::{EdgeKind, Node, NodeKey, NodeKind, RiskSnapshot, Subgraph};
use crate::util::stable_pair;

const LATE_ARRIVAL_GAP: f32 = 12.0;
const LATE_ARRIVAL_RINGS: usize = 32;
const LATE_ARRIVAL_SLOTS: usize = 12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub iterations: usize,
    pub rest_length: f32,
    pub damping: f32,
    pub repulsion: f32,
    pub attraction: f32,
    pub initial_alpha: f32,
    pub max_force: f32,
    pub max_speed: f32,
    pub grid_columns: usize,
    pub grid_spacing: f32,
    pub jitter: f32,
    pub reuse_positions: bool,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            iterations: 120,
            rest_length: 120.0,
            damping: 0.6,
            repulsion: 8_000.0,
            attraction: 0.04,
            initial_alpha: 1.0,
            max_force: 60.0,
            max_speed: 40.0,
            grid_columns: 6,
            grid_spacing: 90.0,
            jitter: 30.0,
            reuse_positions: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub name: String,
    pub namespace: String,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub color: Color32,
    pub radius: f32,
    pub pinned: bool,
    pub dropped: bool,
}

impl LayoutNode {
    fn seeded(node: &Node, index: usize, color: Color32, params: &LayoutParams) -> Self {
        Self {
            key: node.key.clone(),
            kind: node.kind,
            name: node.name.clone(),
            namespace: node.namespace.clone(),
            pos: seed_position(index, &node.key, params),
            velocity: Vec2::ZERO,
            color,
            radius: NodeStyle::for_kind(node.kind).radius,
            pinned: false,
            dropped: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.pinned || self.dropped
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEdge {
    pub from: usize,
    pub to: usize,
    pub kind: EdgeKind,
    pub anomalous: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub kept: usize,
    pub added: usize,
    pub removed: usize,
    pub dropped_edges: usize,
}

impl ReconcileSummary {
    pub fn changed_shape(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayoutGraph {
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    index_by_key: HashMap<NodeKey, usize>,
}

impl LayoutGraph {
    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [LayoutNode] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index_by_key.get(key).copied()
    }

    pub fn node(&self, key: &str) -> Option<&LayoutNode> {
        self.index_of(key).map(|index| &self.nodes[index])
    }

    pub fn node_mut(&mut self, key: &str) -> Option<&mut LayoutNode> {
        self.index_of(key).map(|index| &mut self.nodes[index])
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.nodes.iter().map(|node| node.velocity.length_sq()).sum()
    }

    pub fn bounds(&self) -> Option<Rect> {
        let mut nodes = self.nodes.iter();
        let first = nodes.next()?;
        let mut rect = Rect::from_center_size(
            pos2(first.pos.x, first.pos.y),
            Vec2::splat(first.radius * 2.0),
        );
        for node in nodes {
            rect = rect.union(Rect::from_center_size(
                pos2(node.pos.x, node.pos.y),
                Vec2::splat(node.radius * 2.0),
            ));
        }
        Some(rect)
    }

    /// Keyed merge against a new projection.
    ///
    /// Surviving keys keep position, velocity and drag state; new keys are seeded; keys
    /// missing from the projection are dropped. Colors and anomaly flags are refreshed
    /// from `risk` without touching positions. Keys that join an already placed layout
    /// start next to a placed neighbour instead of on the seed grid.
    pub fn reconcile(
        &mut self,
        subgraph: &Subgraph,
        risk: &RiskSnapshot,
        params: &LayoutParams,
    ) -> ReconcileSummary {
        let mut prior = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.key.clone(), node))
            .collect::<HashMap<_, _>>();
        self.index_by_key.clear();

        let mut summary = ReconcileSummary::default();
        let mut fresh = Vec::new();
        let mut nodes = Vec::with_capacity(subgraph.nodes.len());
        for node in &subgraph.nodes {
            if self.index_by_key.contains_key(&node.key) {
                continue;
            }

            let color = risk_color(risk.r_final(&node.key));
            let layout_node = match prior.remove(&node.key) {
                Some(mut existing) => {
                    existing.kind = node.kind;
                    existing.name.clone_from(&node.name);
                    existing.namespace.clone_from(&node.namespace);
                    existing.radius = NodeStyle::for_kind(node.kind).radius;
                    existing.color = color;
                    summary.kept += 1;
                    existing
                }
                None => {
                    summary.added += 1;
                    fresh.push(nodes.len());
                    LayoutNode::seeded(node, nodes.len(), color, params)
                }
            };
            self.index_by_key.insert(node.key.clone(), nodes.len());
            nodes.push(layout_node);
        }
        summary.removed = prior.len();
        self.nodes = nodes;

        self.edges.clear();
        for edge in &subgraph.edges {
            let (Some(from), Some(to)) = (self.index_of(&edge.from), self.index_of(&edge.to)) else {
                summary.dropped_edges += 1;
                continue;
            };
            self.edges.push(LayoutEdge {
                from,
                to,
                kind: edge.kind,
                anomalous: is_anomalous_source(risk.r_final(&edge.from)),
            });
        }

        if summary.kept > 0 {
            self.place_late_arrivals(&fresh, params);
        }

        debug!(
            kept = summary.kept,
            added = summary.added,
            removed = summary.removed,
            dropped_edges = summary.dropped_edges,
            "reconciled layout nodes"
        );
        summary
    }

    // First free spot on widening rings around a placed neighbour, or around the grid seed.
    fn place_late_arrivals(&mut self, fresh: &[usize], params: &LayoutParams) {
        let mut placed = vec![true; self.nodes.len()];
        for &index in fresh {
            placed[index] = false;
        }

        for &index in fresh {
            let anchor = self.edges.iter().find_map(|edge| {
                let other = match (edge.from == index, edge.to == index) {
                    (true, false) => edge.to,
                    (false, true) => edge.from,
                    _ => return None,
                };
                placed[other].then_some(self.nodes[other].pos)
            });
            let (center, reach) = match anchor {
                Some(pos) => (pos, params.rest_length),
                None => (self.nodes[index].pos, 0.0),
            };
            let pos = self.free_spot(&placed, index, center, reach, params);
            self.nodes[index].pos = pos;
            placed[index] = true;
        }
    }

    fn free_spot(
        &self,
        placed: &[bool],
        index: usize,
        center: Vec2,
        reach: f32,
        params: &LayoutParams,
    ) -> Vec2 {
        let node = &self.nodes[index];
        let (jx, _) = stable_pair(&node.key);
        let heading = jx * std::f32::consts::PI;
        let ring_step = params.grid_spacing.max(node.radius * 2.0 + LATE_ARRIVAL_GAP);

        let is_free = |candidate: Vec2| {
            self.nodes
                .iter()
                .zip(placed)
                .enumerate()
                .filter(|(i, (_, is_placed))| *i != index && **is_placed)
                .all(|(_, (other, _))| {
                    let clearance = other.radius + node.radius + LATE_ARRIVAL_GAP;
                    (other.pos - candidate).length() > clearance
                })
        };

        for ring in 0..LATE_ARRIVAL_RINGS {
            let distance = reach + ring as f32 * ring_step;
            if distance <= 0.0 {
                if is_free(center) {
                    return center;
                }
                continue;
            }
            for slot in 0..LATE_ARRIVAL_SLOTS {
                let angle =
                    heading + slot as f32 * std::f32::consts::TAU / LATE_ARRIVAL_SLOTS as f32;
                let candidate = center + vec2(angle.cos(), angle.sin()) * distance;
                if is_free(candidate) {
                    return candidate;
                }
            }
        }
        let outermost = reach + LATE_ARRIVAL_RINGS as f32 * ring_step;
        center + vec2(heading.cos(), heading.sin()) * outermost
    }

    pub fn reset_motion(&mut self, params: &LayoutParams) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if !params.reuse_positions && !node.pinned {
                node.pos = seed_position(index, &node.key, params);
            }
            node.velocity = Vec2::ZERO;
            node.dropped = false;
        }
    }
}

pub fn seed_position(index: usize, key: &str, params: &LayoutParams) -> Vec2 {
    let columns = params.grid_columns.max(1);
    let column = (index % columns) as f32 - (columns as f32 - 1.0) * 0.5;
    let row = (index / columns) as f32;
    let (jx, jy) = stable_pair(key);
    vec2(column, row) * params.grid_spacing + vec2(jx, jy) * params.jitter
}

pub fn alpha_at(params: &LayoutParams, iteration: usize) -> f32 {
    if params.iterations == 0 {
        return 0.0;
    }
    let progress = (iteration as f32 / params.iterations as f32).clamp(0.0, 1.0);
    params.initial_alpha * (1.0 - progress)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    pub alpha: f32,
    pub energy: f32,
}

/// One simulation step. Independent of any scheduler.
pub fn step(
    nodes: &mut [LayoutNode],
    edges: &[LayoutEdge],
    params: &LayoutParams,
    iteration: usize,
) -> StepReport {
    let alpha = alpha_at(params, iteration);
    let node_count = nodes.len();
    let mut forces = vec![Vec2::ZERO; node_count];

    for i in 0..node_count {
        for j in (i + 1)..node_count {
            let delta = nodes[i].pos - nodes[j].pos;
            let distance = delta.length();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                let angle =
                    ((i as f32) * 0.618_034 + (j as f32) * 0.414_214) * std::f32::consts::TAU;
                vec2(angle.cos(), angle.sin())
            };

            let clamped = distance.max(1.0);
            let repulsion = params.repulsion * alpha / (clamped * clamped);
            forces[i] += direction * repulsion;
            forces[j] -= direction * repulsion;
        }
    }

    for edge in edges {
        if edge.from >= node_count || edge.to >= node_count || edge.from == edge.to {
            continue;
        }

        let delta = nodes[edge.to].pos - nodes[edge.from].pos;
        let distance = delta.length();
        if distance <= 0.0001 {
            continue;
        }
        let direction = delta / distance;
        let pull = params.attraction * alpha * (distance - params.rest_length);

        forces[edge.from] += direction * pull;
        forces[edge.to] -= direction * pull;
    }

    let max_force_sq = params.max_force * params.max_force;
    let max_speed_sq = params.max_speed * params.max_speed;
    let mut energy = 0.0;
    for (node, force) in nodes.iter_mut().zip(forces) {
        if node.is_held() {
            node.velocity = Vec2::ZERO;
            continue;
        }

        let mut force = force;
        let force_sq = force.length_sq();
        if force_sq > max_force_sq {
            force *= params.max_force / force_sq.sqrt();
        }

        let mut velocity = (node.velocity + force) * params.damping;
        let speed_sq = velocity.length_sq();
        if speed_sq > max_speed_sq {
            velocity *= params.max_speed / speed_sq.sqrt();
        }

        node.velocity = velocity;
        node.pos += velocity;
        energy += velocity.length_sq();
    }

    StepReport {
        iteration,
        alpha,
        energy,
    }
}

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tick {
    Stepped(StepReport),
    Finished,
    Cancelled,
}

#[derive(Debug)]
pub struct Simulation {
    params: LayoutParams,
    iteration: usize,
    token: CancelToken,
    last_energy: Option<f32>,
}

impl Simulation {
    pub fn start(params: LayoutParams) -> Self {
        debug!(budget = params.iterations, "starting layout simulation");
        Self {
            params,
            iteration: 0,
            token: CancelToken::new(),
            last_energy: None,
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn budget(&self) -> usize {
        self.params.iterations
    }

    pub fn last_energy(&self) -> Option<f32> {
        self.last_energy
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.iteration < self.params.iterations
    }

    pub fn tick(&mut self, graph: &mut LayoutGraph) -> Tick {
        if self.token.is_cancelled() {
            return Tick::Cancelled;
        }
        if self.iteration >= self.params.iterations {
            return Tick::Finished;
        }

        let report = step(&mut graph.nodes, &graph.edges, &self.params, self.iteration);
        self.iteration += 1;
        self.last_energy = Some(report.energy);
        trace!(
            iteration = report.iteration,
            alpha = report.alpha,
            energy = report.energy,
            "layout step"
        );
        if self.iteration == self.params.iterations {
            debug!(energy = report.energy, "layout simulation settled");
        }
        Tick::Stepped(report)
    }

    pub fn run_to_completion(&mut self, graph: &mut LayoutGraph) -> Vec<StepReport> {
        let mut reports = Vec::with_capacity(self.params.iterations.saturating_sub(self.iteration));
        while let Tick::Stepped(report) = self.tick(graph) {
            reports.push(report);
        }
        reports
    }
}
