use std::time::Instant;

use eframe::egui::{self, Align, Context, Layout};
use tracing::info;

use topology_lens::session::Session;
use topology_lens::source::Snapshot;

use super::super::{AppSettings, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(settings: &AppSettings, snapshot: Snapshot) -> Self {
        let mut session = Session::new(
            settings.params.clone(),
            settings.mode,
            settings.filter.clone(),
        );
        session.on_select(|key| info!(node = ?key, "graph selection changed"));
        session.apply_snapshot(snapshot.graph, snapshot.risk);

        Self {
            session,
            source_label: settings.source.describe(),
            search: String::new(),
            show_labels: true,
            hovered: None,
            refreshes: 1,
            last_refresh: Instant::now(),
            refresh_error: None,
        }
    }

    pub(in crate::app) fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let summary = self.session.apply_snapshot(snapshot.graph, snapshot.risk);
        if summary.changed_shape() {
            self.hovered = None;
        }
        self.refreshes += 1;
        self.last_refresh = Instant::now();
        self.refresh_error = None;
    }

    pub(in crate::app) fn is_animating(&self) -> bool {
        self.session.is_settling() || self.session.is_interacting()
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.session.tick();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("topology-lens");
                    ui.separator();
                    self.draw_toolbar(ui);
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("source: {}", self.source_label));
                    });
                });
            });

        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_status(ui));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));
    }

    pub(in crate::app) fn select(&mut self, key: Option<String>) {
        if self.session.selected() == key.as_deref() {
            return;
        }
        self.session.set_selected(key);
    }
}
