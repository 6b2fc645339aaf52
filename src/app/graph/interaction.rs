use eframe::egui::{self, CursorIcon, Rect, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }
        self.session.wheel(scroll);
    }

    pub(in crate::app) fn handle_graph_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let (pressed, released, pointer) = ui.input(|input| {
            (
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.pointer.interact_pos(),
            )
        });

        if pressed
            && response.hovered()
            && let Some(pointer) = pointer
        {
            self.session.pointer_down(rect, pointer);
        }
        if !self.session.is_interacting() {
            return;
        }

        let Some(pointer) = pointer else {
            self.session.cancel_gesture();
            return;
        };
        if released {
            self.session.pointer_up(rect, pointer);
        } else {
            self.session.pointer_move(rect, pointer);
        }
    }

    pub(in crate::app) fn update_hover(&mut self, ui: &Ui, rect: Rect) {
        let interaction = self.session.interaction();
        if interaction.is_active() {
            self.hovered = interaction
                .dragged_key()
                .and_then(|key| self.session.layout().index_of(key));
        } else {
            self.hovered = ui
                .input(|input| input.pointer.hover_pos())
                .filter(|pointer| rect.contains(*pointer))
                .and_then(|pointer| self.session.hit_test(rect, pointer));
        }

        let cursor = if self.session.interaction().is_active() {
            Some(CursorIcon::Grabbing)
        } else if self.hovered.is_some() {
            Some(CursorIcon::PointingHand)
        } else {
            None
        };
        if let Some(cursor) = cursor {
            ui.ctx().set_cursor_icon(cursor);
        }
    }
}
