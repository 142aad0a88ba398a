use egui::{TextureHandle, TextureOptions, Ui};

use crate::workflow::{PlotWorkflow, WorkflowState};

/// Central view showing the rendered bitmap at its native size.
#[derive(Default)]
pub struct PlotViewPanel {
    texture: Option<TextureHandle>,
    /// Workflow image revision the texture was uploaded from.
    revision: u64,
}

impl PlotViewPanel {
    /// Re-upload the texture when the workflow replaced its image.
    pub fn sync_texture(&mut self, ctx: &egui::Context, workflow: &PlotWorkflow) {
        if workflow.image_revision() == self.revision {
            return;
        }
        self.revision = workflow.image_revision();
        self.texture = workflow.image().map(|img| {
            ctx.load_texture("plot", img.to_color_image(), TextureOptions::LINEAR)
        });
    }

    pub fn render_panel(&mut self, ui: &mut Ui, workflow: &PlotWorkflow, hovering_files: bool) {
        match &self.texture {
            Some(tex) => {
                egui::ScrollArea::both().show(ui, |ui| {
                    ui.image(egui::load::SizedTexture::from_handle(tex));
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    if workflow.state() == WorkflowState::Rendering {
                        ui.spinner();
                    } else {
                        ui.label("Open a gnuplot script or drop one here");
                    }
                });
            }
        }
        if hovering_files {
            let painter = ui.ctx().layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("drop_overlay"),
            ));
            let rect = ui.max_rect();
            painter.rect_filled(rect, 0.0, egui::Color32::from_black_alpha(160));
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Drop a script to render it, or an image to show it",
                egui::TextStyle::Heading.resolve(ui.style()),
                egui::Color32::WHITE,
            );
        }
    }
}
