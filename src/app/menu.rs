use super::{ActivityUploader, Page};
use eframe::egui::{self, Align, Layout, RichText};

impl ActivityUploader {
    pub(super) fn render_menu(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let current = self.router.current();

                if ui
                    .selectable_label(
                        current == Page::Main,
                        RichText::new(Page::Main.title()).heading(),
                    )
                    .clicked()
                {
                    self.router.go(Page::Main);
                }
                ui.separator();

                for (icon, page) in [
                    ("🌲", Page::ActivityTable),
                    ("🚲", Page::Equipment),
                    ("📤", Page::Upload),
                ] {
                    let label = format!("{} {}", icon, page.title());
                    if ui.selectable_label(current == page, label).clicked() {
                        self.router.go(page);
                    }
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui
                        .button(self.theme.toggle_icon())
                        .on_hover_text("Toggle theme")
                        .clicked()
                    {
                        self.toggle_theme(ctx);
                    }

                    match self.username.clone() {
                        Some(username) => {
                            if ui.button("⎋").on_hover_text("Sign out").clicked() {
                                self.logout();
                            }
                            if ui.button("⚙").on_hover_text("Settings").clicked() {
                                self.open_in_browser(Page::Main);
                            }
                            ui.label(RichText::new(username).strong());
                        }
                        None => {
                            for page in [Page::Register, Page::Login] {
                                if ui.selectable_label(current == page, page.title()).clicked() {
                                    self.router.go(page);
                                }
                            }
                        }
                    }
                });
            });
            ui.add_space(4.0);
        });
    }
}
