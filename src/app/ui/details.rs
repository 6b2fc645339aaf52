use eframe::egui::{self, RichText, Ui};

use topology_lens::risk::{RiskTier, is_anomalous_source};
use topology_lens::topology::{EdgeKind, RiskLevel};

use super::super::ViewModel;

struct Neighbour {
    key: String,
    name: String,
    kind: EdgeKind,
    outgoing: bool,
}

impl ViewModel {
    fn neighbours(&self, selected: &str) -> Vec<Neighbour> {
        let projection = self.session.projection();
        let name_of = |key: &str| {
            projection
                .nodes
                .iter()
                .find(|node| node.key == key)
                .map_or_else(|| key.to_owned(), |node| node.name.clone())
        };

        projection
            .edges
            .iter()
            .filter(|edge| edge.touches(selected) && edge.from != edge.to)
            .map(|edge| {
                let outgoing = edge.from == selected;
                let key = if outgoing { &edge.to } else { &edge.from };
                Neighbour {
                    key: key.clone(),
                    name: name_of(key),
                    kind: edge.kind,
                    outgoing,
                }
            })
            .collect()
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected) = self.session.selected().map(str::to_owned) else {
            ui.label("Select an entity in the graph or the list.");
            return;
        };

        let Some(node) = self.session.graph().and_then(|graph| graph.node(&selected)) else {
            ui.label("The selected entity is no longer in the topology.");
            if ui.button("Clear selection").clicked() {
                self.select(None);
            }
            return;
        };

        let risk = self.session.risk();
        let r_final = risk.r_final(&selected);
        let tier = RiskTier::from_score(r_final);

        ui.label(RichText::new(node.name.as_str()).strong());
        ui.small(selected.as_str());
        ui.add_space(6.0);
        ui.label(format!("Type: {}", node.kind.label()));
        if !node.namespace.is_empty() {
            ui.label(format!("Namespace: {}", node.namespace));
        }
        ui.horizontal(|ui| {
            ui.label("rFinal:");
            ui.label(RichText::new(format!("{r_final:.1}")).color(tier.color()).strong());
            ui.label(format!("({})", tier.label()));
        });
        let level = risk.level(&selected);
        if level != RiskLevel::None {
            ui.label(format!("Reported level: {}", level.label()));
        }
        if is_anomalous_source(r_final) {
            ui.label(RichText::new("Outgoing edges flagged as anomalous").color(tier.color()));
        }
        if !self.session.projection().contains(&selected) {
            ui.small("Not part of the current view.");
        }

        ui.separator();
        ui.label(RichText::new("Neighbours in view").strong());
        let neighbours = self.neighbours(&selected);
        if neighbours.is_empty() {
            ui.label("No connected entities in this view.");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("neighbour_scroll")
            .max_height(320.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, neighbours.len(), |ui, row_range| {
                for index in row_range {
                    let Some(neighbour) = neighbours.get(index) else {
                        continue;
                    };
                    let arrow = if neighbour.outgoing { "->" } else { "<-" };
                    let label = format!("{arrow} {}  [{}]", neighbour.name, neighbour.kind.label());
                    if ui
                        .link(label)
                        .on_hover_text(neighbour.key.as_str())
                        .clicked()
                    {
                        clicked = Some(neighbour.key.clone());
                    }
                }
            });

        if let Some(key) = clicked {
            self.select(Some(key));
        }
    }
}
