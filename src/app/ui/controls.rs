use eframe::egui::{self, Align, Layout, RichText, Sense, Shape, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use topology_lens::projection::{ViewMode, namespaces};
use topology_lens::render::{NodeShape, NodeStyle};
use topology_lens::risk::{RiskTier, risk_color};
use topology_lens::topology::NodeKind;
use topology_lens::util::short_label;

use super::super::ViewModel;

const NODE_ROW_HEIGHT: f32 = 22.0;

struct NodeRow {
    key: String,
    name: String,
    kind: NodeKind,
    r_final: f64,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn legend_swatch(ui: &mut Ui, shape: NodeShape, color: egui::Color32) {
    let (rect, _) = ui.allocate_exact_size(vec2(16.0, 16.0), Sense::hover());
    let stroke = Stroke::new(1.0, egui::Color32::from_gray(20));
    match shape {
        NodeShape::Circle => {
            ui.painter().circle_filled(rect.center(), 6.0, color);
        }
        shape => {
            ui.painter()
                .add(Shape::convex_polygon(shape.vertices(rect.center(), 6.0), color, stroke));
        }
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_toolbar(&mut self, ui: &mut Ui) {
        let mut mode = self.session.mode();
        for candidate in ViewMode::ALL {
            ui.selectable_value(&mut mode, candidate, candidate.label());
        }
        if mode != self.session.mode() {
            self.hovered = None;
            self.session.set_view_mode(mode);
        }

        ui.separator();
        if ui
            .button("Re-run layout")
            .on_hover_text("Restart the force simulation on the current view.")
            .clicked()
        {
            self.session.rerun_layout();
        }
        if ui.button("Fit view").clicked() {
            self.session.request_fit();
        }
        ui.checkbox(&mut self.show_labels, "Labels");
    }

    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        self.draw_namespace_filter(ui);
        ui.separator();
        self.draw_legend(ui);
        ui.separator();
        self.draw_node_list(ui);
    }

    fn draw_namespace_filter(&mut self, ui: &mut Ui) {
        ui.heading("Namespaces");
        let enabled = self.session.mode().uses_namespace_filter();
        if !enabled {
            ui.small("Applies to the full topology view.");
        }

        let available = self.session.graph().map(namespaces).unwrap_or_default();
        let mut toggled = None;
        let mut show_all = false;
        ui.add_enabled_ui(enabled, |ui| {
            ui.horizontal_wrapped(|ui| {
                for namespace in &available {
                    let mut checked = self.session.namespace_filter().contains(namespace);
                    if ui.checkbox(&mut checked, namespace.as_str()).changed() {
                        toggled = Some(namespace.clone());
                    }
                }
            });
            let filtered = !self.session.namespace_filter().is_empty();
            if ui
                .add_enabled(filtered, egui::Button::new("Show all"))
                .clicked()
            {
                show_all = true;
            }
        });

        if let Some(namespace) = toggled {
            self.session.toggle_namespace(&namespace);
        } else if show_all {
            self.session.set_namespace_filter(Default::default());
        }
    }

    fn draw_legend(&self, ui: &mut Ui) {
        ui.collapsing("Legend", |ui| {
            ui.label(RichText::new("Risk (rFinal)").strong());
            for tier in RiskTier::ALL {
                ui.horizontal(|ui| {
                    legend_swatch(ui, NodeShape::Circle, tier.color());
                    ui.label(tier.label());
                });
            }

            ui.add_space(4.0);
            ui.label(RichText::new("Entity type").strong());
            for kind in NodeKind::ALL {
                ui.horizontal(|ui| {
                    legend_swatch(ui, NodeStyle::for_kind(kind).shape, egui::Color32::LIGHT_GRAY);
                    ui.label(kind.label());
                });
            }
        });
    }

    fn node_rows(&self) -> Vec<NodeRow> {
        let query = self.search.trim();
        let matcher = SkimMatcherV2::default();
        let risk = self.session.risk();

        let mut rows = self
            .session
            .projection()
            .nodes
            .iter()
            .filter_map(|node| {
                let score = if query.is_empty() {
                    0
                } else {
                    fuzzy_match_score(&matcher, &node.name, query)
                        .max(fuzzy_match_score(&matcher, &node.key, query))?
                };
                Some((
                    score,
                    NodeRow {
                        key: node.key.clone(),
                        name: node.name.clone(),
                        kind: node.kind,
                        r_final: risk.r_final(&node.key),
                    },
                ))
            })
            .collect::<Vec<_>>();

        rows.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .cmp(a_score)
                .then_with(|| b.r_final.total_cmp(&a.r_final))
                .then_with(|| a.key.cmp(&b.key))
        });
        rows.into_iter().map(|(_, row)| row).collect()
    }

    fn draw_node_list(&mut self, ui: &mut Ui) {
        ui.heading("Entities");
        ui.label("Search")
            .on_hover_text("Fuzzy-match names and keys in the current view.");
        ui.text_edit_singleline(&mut self.search);
        ui.add_space(4.0);

        let rows = self.node_rows();
        if rows.is_empty() {
            ui.label("No entities match.");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("entity_list_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, NODE_ROW_HEIGHT, rows.len(), |ui, row_range| {
                for index in row_range {
                    let Some(row) = rows.get(index) else {
                        continue;
                    };
                    let is_selected = self.session.selected() == Some(row.key.as_str());

                    let row_clicked = ui
                        .horizontal(|ui| {
                            legend_swatch(
                                ui,
                                NodeStyle::for_kind(row.kind).shape,
                                risk_color(row.r_final),
                            );
                            let clicked = ui
                                .selectable_label(is_selected, short_label(&row.name, 28))
                                .on_hover_text(row.key.as_str())
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if row.r_final > 0.0 {
                                    ui.label(format!("{:.1}", row.r_final));
                                }
                            });
                            clicked
                        })
                        .inner;

                    if row_clicked {
                        clicked = Some(row.key.clone());
                    }
                }
            });

        if let Some(key) = clicked {
            let already = self.session.selected() == Some(key.as_str());
            self.select(if already { None } else { Some(key) });
        }
    }
}
