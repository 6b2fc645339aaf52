use eframe::egui::{Pos2, Rect};
use tracing::{debug, info};

use crate::interaction::{InteractionController, PointerOutcome, Viewport};
use crate::layout::{LayoutGraph, LayoutParams, ReconcileSummary, Simulation, Tick};
use crate::projection::{NamespaceFilter, ViewMode, project};
use crate::render::{Frame, FrameOptions, build_frame};
use crate::topology::{GraphModel, NodeKey, RiskSnapshot, Subgraph};

const FIT_MARGIN: f32 = 0.08;

pub type SelectCallback = Box<dyn FnMut(Option<&str>)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyState {
    WaitingForData,
    NoAnomalies,
    NothingInView,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            Self::WaitingForData => "Waiting for the first topology snapshot...",
            Self::NoAnomalies => "No anomalies detected. Every entity is healthy.",
            Self::NothingInView => "Nothing to show for this view.",
        }
    }
}

pub struct Session {
    graph: Option<GraphModel>,
    risk: RiskSnapshot,
    mode: ViewMode,
    filter: NamespaceFilter,
    params: LayoutParams,
    projection: Subgraph,
    layout: LayoutGraph,
    simulation: Option<Simulation>,
    interaction: InteractionController,
    selected: Option<NodeKey>,
    on_select: Option<SelectCallback>,
    fit_requested: bool,
}

impl Session {
    pub fn new(params: LayoutParams, mode: ViewMode, filter: NamespaceFilter) -> Self {
        Self {
            graph: None,
            risk: RiskSnapshot::default(),
            mode,
            filter,
            params,
            projection: Subgraph::default(),
            layout: LayoutGraph::default(),
            simulation: None,
            interaction: InteractionController::new(Viewport::default()),
            selected: None,
            on_select: None,
            fit_requested: false,
        }
    }

    pub fn graph(&self) -> Option<&GraphModel> {
        self.graph.as_ref()
    }

    pub fn risk(&self) -> &RiskSnapshot {
        &self.risk
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn namespace_filter(&self) -> &NamespaceFilter {
        &self.filter
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn projection(&self) -> &Subgraph {
        &self.projection
    }

    pub fn layout(&self) -> &LayoutGraph {
        &self.layout
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn is_settling(&self) -> bool {
        self.simulation.as_ref().is_some_and(Simulation::is_running)
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.graph.is_none() {
            Some(EmptyState::WaitingForData)
        } else if !self.projection.is_empty() {
            None
        } else if self.mode == ViewMode::Anomaly {
            Some(EmptyState::NoAnomalies)
        } else {
            Some(EmptyState::NothingInView)
        }
    }

    /// Replaces the graph and risk snapshots.
    ///
    /// The first snapshot starts a simulation; later ones only reconcile, so a
    /// risk-only refresh never moves a node.
    pub fn apply_snapshot(&mut self, graph: GraphModel, risk: RiskSnapshot) -> ReconcileSummary {
        let first = self.graph.is_none();
        self.graph = Some(graph);
        self.risk = risk;

        if first {
            info!(mode = %self.mode, "first topology snapshot received");
            return self.restart_projection();
        }

        let summary = self.reproject();
        debug!(
            nodes = self.layout.len(),
            edges = self.layout.edges().len(),
            added = summary.added,
            removed = summary.removed,
            "topology snapshot refreshed"
        );
        summary
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        info!(from = %self.mode, to = %mode, "switching view mode");
        self.mode = mode;
        self.restart_projection();
    }

    pub fn set_namespace_filter(&mut self, filter: NamespaceFilter) {
        if self.filter == filter {
            return;
        }
        info!(namespaces = ?filter, "namespace filter changed");
        self.filter = filter;
        if self.mode.uses_namespace_filter() {
            self.restart_projection();
        }
    }

    pub fn toggle_namespace(&mut self, namespace: &str) {
        let mut filter = self.filter.clone();
        if !filter.remove(namespace) {
            filter.insert(namespace.to_owned());
        }
        self.set_namespace_filter(filter);
    }

    pub fn rerun_layout(&mut self) {
        self.cancel_simulation();
        self.interaction.release(&mut self.layout);
        self.layout.reset_motion(&self.params);
        self.simulation = Some(Simulation::start(self.params.clone()));
    }

    pub fn tick(&mut self) -> Option<Tick> {
        let simulation = self.simulation.as_mut()?;
        let tick = simulation.tick(&mut self.layout);
        if !matches!(tick, Tick::Stepped(_)) {
            self.simulation = None;
        }
        Some(tick)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Controlled selection from the host. Does not invoke the selection callback.
    pub fn set_selected(&mut self, key: Option<NodeKey>) {
        self.selected = key;
    }

    pub fn on_select(&mut self, callback: impl FnMut(Option<&str>) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn hit_test(&self, screen: Rect, pointer: Pos2) -> Option<usize> {
        self.interaction.hit_test(&self.layout, screen, pointer)
    }

    pub fn is_interacting(&self) -> bool {
        self.interaction.is_active()
    }

    pub fn pointer_down(&mut self, screen: Rect, pointer: Pos2) {
        self.interaction
            .pointer_down(&mut self.layout, screen, pointer);
    }

    pub fn pointer_move(&mut self, screen: Rect, pointer: Pos2) {
        self.interaction
            .pointer_move(&mut self.layout, screen, pointer);
    }

    pub fn pointer_up(&mut self, screen: Rect, pointer: Pos2) {
        let outcome = self
            .interaction
            .pointer_up(&mut self.layout, screen, pointer);
        if let PointerOutcome::Clicked(key) = outcome {
            self.select_from_pointer(key);
        }
    }

    pub fn cancel_gesture(&mut self) {
        self.interaction.release(&mut self.layout);
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.interaction.viewport_mut().wheel(delta_y);
    }

    pub fn request_fit(&mut self) {
        self.fit_requested = true;
    }

    pub fn fit_if_requested(&mut self) {
        if !self.fit_requested {
            return;
        }
        self.fit_requested = false;
        if let Some(bounds) = self.layout.bounds() {
            self.interaction.viewport_mut().fit(bounds, FIT_MARGIN);
        }
    }

    pub fn frame(&self, screen: Rect, hovered: Option<usize>, show_labels: bool) -> Frame {
        build_frame(
            &self.layout,
            self.interaction.viewport(),
            screen,
            FrameOptions {
                selected: self.selected(),
                hovered,
                show_labels,
            },
        )
    }

    fn select_from_pointer(&mut self, key: Option<NodeKey>) {
        if self.selected == key {
            return;
        }
        self.selected = key;
        if let Some(callback) = self.on_select.as_mut() {
            callback(self.selected.as_deref());
        }
    }

    fn reproject(&mut self) -> ReconcileSummary {
        let Some(graph) = self.graph.as_ref() else {
            return ReconcileSummary::default();
        };
        self.projection = project(graph, &self.risk, self.mode, &self.filter);
        self.layout
            .reconcile(&self.projection, &self.risk, &self.params)
    }

    fn restart_projection(&mut self) -> ReconcileSummary {
        self.cancel_simulation();
        self.interaction.release(&mut self.layout);
        if !self.params.reuse_positions {
            self.layout = LayoutGraph::default();
        }

        let summary = self.reproject();
        self.layout.reset_motion(&self.params);
        self.simulation = Some(Simulation::start(self.params.clone()));
        self.fit_requested = true;
        info!(
            mode = %self.mode,
            nodes = self.layout.len(),
            edges = self.layout.edges().len(),
            "projection restarted"
        );
        summary
    }

    fn cancel_simulation(&mut self) {
        if let Some(simulation) = self.simulation.take() {
            simulation.cancel();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_simulation();
    }
}
