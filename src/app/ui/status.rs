use eframe::egui::{Align, Color32, Layout, RichText, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn simulation_text(&self) -> String {
        match self.session.simulation() {
            Some(simulation) if simulation.is_running() => {
                format!("layout step {}/{}", simulation.iteration(), simulation.budget())
            }
            _ => "layout settled".to_owned(),
        }
    }

    pub(in crate::app) fn refresh_text(&self) -> String {
        let elapsed = self.last_refresh.elapsed().as_secs();
        format!("refresh #{} ({elapsed}s ago)", self.refreshes)
    }

    pub(in crate::app) fn draw_status(&self, ui: &mut Ui) {
        let projection = self.session.projection();
        let anomalous = projection
            .nodes
            .iter()
            .filter(|node| self.session.risk().is_anomalous(&node.key))
            .count();

        ui.horizontal(|ui| {
            ui.label(format!(
                "{}: {} nodes / {} edges",
                self.session.mode().label(),
                projection.nodes.len(),
                projection.edges.len()
            ));
            ui.separator();
            ui.label(format!("{anomalous} anomalous"));
            ui.separator();
            ui.label(self.simulation_text());
            ui.separator();
            ui.label(self.refresh_text());

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if let Some(error) = &self.refresh_error {
                    ui.label(
                        RichText::new(format!("last poll failed: {error}"))
                            .color(Color32::from_rgb(229, 62, 62)),
                    );
                }
            });
        });
    }
}
