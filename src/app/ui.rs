use super::{ActivityUploader, Page};
use crate::upload::UploadOutcome;
use crate::utils::file_size::format_size;
use eframe::egui::{self, Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const ACTIVITY_FILTER: [&str; 3] = ["fit", "gpx", "tcx"];

fn status_icon(outcome: Option<&UploadOutcome>) -> (&'static str, Color32) {
    match outcome {
        None => ("⏳", Color32::from_rgb(150, 150, 150)),
        Some(UploadOutcome::Success) => ("✅", Color32::from_rgb(0, 180, 0)),
        Some(UploadOutcome::Failure(_)) => ("❌", Color32::from_rgb(220, 50, 50)),
        Some(UploadOutcome::Timeout) => ("⌛", Color32::from_rgb(230, 160, 30)),
    }
}

impl ActivityUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        self.render_menu(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                match self.router.current() {
                    Page::Upload => self.render_upload(ui),
                    page if page.is_web_only() => self.render_web_page(ui, page),
                    _ => self.render_main(ui),
                }
                ui.add_space(20.0);
            });
        });
    }

    fn render_main(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("TF-Viewer");
            ui.add_space(5.0);
            ui.label(
                RichText::new("Upload your training files to the activity server")
                    .color(ui.visuals().text_color().gamma_multiply(0.7)),
            );
            ui.add_space(20.0);

            ui.label(format!("Server: {}", self.config.server_url));
            match &self.username {
                Some(user) => ui.label(format!("Signed in as {}", user)),
                None => ui.label("Not signed in"),
            };
            ui.add_space(10.0);

            if ui.button("📤 Upload activities").clicked() {
                self.router.go(Page::Upload);
            }
            if ui.button("🌐 Open in browser").clicked() {
                self.open_in_browser(Page::Main);
            }
        });
    }

    fn render_web_page(&mut self, ui: &mut egui::Ui, page: Page) {
        ui.vertical_centered(|ui| {
            ui.heading(page.title());
            ui.add_space(10.0);
            ui.label("This page is served by the activity server.");
            ui.add_space(10.0);
            if ui.button("🌐 Open in browser").clicked() {
                self.open_in_browser(page);
            }
        });
    }

    fn render_upload(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Upload");
        });
        ui.add_space(10.0);

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.add_enabled_ui(!self.state.is_uploading, |ui| {
                    if ui.button("📁 Select files").clicked() {
                        if let Some(paths) = FileDialog::new()
                            .add_filter("Activity files", &ACTIVITY_FILTER)
                            .pick_files()
                        {
                            self.start_upload(paths);
                        }
                    }
                    if ui.button("📄 Select file").clicked() {
                        if let Some(path) = FileDialog::new()
                            .add_filter("Activity files", &ACTIVITY_FILTER)
                            .pick_file()
                        {
                            self.start_upload(vec![path]);
                        }
                    }
                    if ui.button("🗂 Select folder").clicked() {
                        if let Some(path) = FileDialog::new().pick_folder() {
                            self.start_upload(vec![path]);
                        }
                    }
                });

                if self.state.is_uploading && ui.button("⏹ Cancel").clicked() {
                    self.cancel_upload();
                }
            });
        });

        if !self.state.files.is_empty() {
            ui.add_space(10.0);
            ui.group(|ui| {
                ui.label(format!(
                    "{} files, {}",
                    self.state.files.len(),
                    format_size(self.state.files.total_size())
                ));

                let progress = egui::ProgressBar::new(self.state.progress_fraction())
                    .text(self.state.progress_text())
                    .animate(self.state.is_uploading)
                    .fill(ACCENT);
                ui.add(progress);

                if let Some(report) = &self.state.report {
                    ui.label(format!(
                        "✅ {}  ❌ {}  ⌛ {}  in {:.1}s",
                        report.succeeded,
                        report.failed,
                        report.timed_out,
                        report.elapsed.as_secs_f32()
                    ));
                }
            });

            ui.add_space(10.0);
            self.render_details(ui);
        }

        if let Some(error) = &self.state.error {
            ui.add_space(10.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(Color32::from_rgb(220, 50, 50), error);
            });
        }
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.state.show_details = !self.state.show_details;
        }

        if !self.state.show_details {
            return;
        }

        egui::ScrollArea::vertical()
            .id_source("upload_details")
            .max_height(300.0)
            .show(ui, |ui| {
                egui::Grid::new("upload_files")
                    .striped(true)
                    .num_columns(3)
                    .show(ui, |ui| {
                        for file in self.state.files.files() {
                            let outcome = self.state.status(&file.name);
                            let (icon, color) = status_icon(outcome);
                            ui.label(icon);
                            ui.colored_label(color, &file.name);
                            match outcome {
                                Some(UploadOutcome::Failure(reason)) => {
                                    ui.label(reason.to_string())
                                }
                                Some(UploadOutcome::Timeout) => ui.label("timed out"),
                                _ => ui.label(format_size(file.size)),
                            };
                            ui.end_row();
                        }
                    });
            });
    }
}
