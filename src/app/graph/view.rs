use eframe::egui::{Align2, Color32, FontId, Sense, Ui};

use topology_lens::render::{draw_background, paint};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.session.fit_if_requested();
        self.handle_graph_zoom(ui, &response);
        self.handle_graph_pointer(ui, rect, &response);
        self.update_hover(ui, rect);

        draw_background(&painter, rect, self.session.interaction().viewport());

        if let Some(empty) = self.session.empty_state() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                empty.message(),
                FontId::proportional(18.0),
                Color32::from_gray(190),
            );
            return;
        }

        let frame = self.session.frame(rect, self.hovered, self.show_labels);
        paint(&painter, &frame);

        if let Some(index) = self.hovered
            && let Some(node) = self.session.layout().nodes().get(index)
        {
            let r_final = self.session.risk().r_final(&node.key);
            response.on_hover_text_at_pointer(format!(
                "{}\n{} in {}\nrFinal {r_final:.1}",
                node.key,
                node.kind.label(),
                if node.namespace.is_empty() { "-" } else { node.namespace.as_str() },
            ));
        }
    }
}
