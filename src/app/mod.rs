mod menu;
mod router;
mod state;
mod theme;
mod ui;

use crate::config::AppConfig;
use crate::submit;
use crate::upload::{BatchEvent, CancelToken, FileSelection};
use crate::utils::prefs::PreferenceStore;
use eframe::{egui, App};
use router::{logout_url, Page, Router};
use state::UploadState;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use theme::{Theme, THEME_KEY};
use tracing::{error, info, warn};

pub struct ActivityUploader {
    config: AppConfig,
    prefs: PreferenceStore,
    theme: Theme,
    router: Router,
    username: Option<String>,
    username_receiver: Option<Receiver<Option<String>>>,
    state: UploadState,
}

impl ActivityUploader {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        prefs: PreferenceStore,
        start_path: &str,
    ) -> Self {
        let theme = Theme::load(&prefs);
        cc.egui_ctx.set_visuals(theme.visuals());
        info!("starting with {} theme", theme.as_str());

        let mut router = Router::default();
        router.navigate(start_path);

        let mut app = Self {
            config,
            prefs,
            theme,
            router,
            username: None,
            username_receiver: None,
            state: UploadState::default(),
        };
        app.refresh_username();
        app
    }

    /// Looks up the signed-in user in the background.
    pub fn refresh_username(&mut self) {
        let (sender, receiver) = mpsc::channel();
        self.username_receiver = Some(receiver);
        let server_url = self.config.server_url.clone();

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("failed to start runtime for /username: {}", e);
                    return;
                }
            };
            let username = submit::http_client()
                .and_then(|client| rt.block_on(crate::api::fetch_username(&client, &server_url)));
            match username {
                Ok(username) => sender.send(username).unwrap_or_default(),
                Err(e) => warn!("could not fetch username: {:#}", e),
            }
        });
    }

    pub fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.theme = self.theme.toggled();
        ctx.set_visuals(self.theme.visuals());
        if let Err(e) = self.prefs.set(THEME_KEY, self.theme.as_str()) {
            warn!("failed to save theme preference: {:#}", e);
        }
    }

    pub fn open_in_browser(&self, page: Page) {
        let url = page.web_url(&self.config.server_url);
        if let Err(e) = open::that(&url) {
            warn!("failed to open {}: {}", url, e);
        }
    }

    /// Signs out in the browser, then asks the server again who is signed in.
    pub fn logout(&mut self) {
        let url = logout_url(&self.config.server_url);
        info!("signing out via {}", url);
        if let Err(e) = open::that(&url) {
            warn!("failed to open {}: {}", url, e);
            return;
        }
        self.username = None;
        self.refresh_username();
    }

    /// Starts a batch for `paths`. The batched picker and the single-file
    /// picker both end up here.
    pub fn start_upload(&mut self, paths: Vec<PathBuf>) {
        let selection = match upload_selection(&paths) {
            Ok(selection) => selection,
            Err(message) => {
                warn!("refusing selection: {}", message);
                self.state.reject(message);
                return;
            }
        };

        let (sender, receiver) = mpsc::channel();
        let cancel = CancelToken::new();
        self.state.begin(&selection, receiver, cancel.clone());
        info!("starting upload of {} files", selection.len());

        let config = self.config.clone();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("failed to start upload runtime: {}", e);
                    sender
                        .send(BatchEvent::Aborted(format!("Failed to start upload: {}", e)))
                        .unwrap_or_default();
                    return;
                }
            };
            rt.block_on(async {
                let events = Some(sender.clone());
                if let Err(e) = submit::submit(&config, &selection, events, &cancel).await {
                    error!("upload aborted: {:#}", e);
                    sender
                        .send(BatchEvent::Aborted(format!("{:#}", e)))
                        .unwrap_or_default();
                }
            });
        });
    }

    pub fn cancel_upload(&mut self) {
        info!("cancelling upload");
        self.state.request_cancel();
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        if let Some(receiver) = &self.username_receiver {
            if let Ok(username) = receiver.try_recv() {
                self.username = username;
                self.username_receiver = None;
            }
        }

        if self.state.poll() || self.state.is_uploading {
            ctx.request_repaint();
        }
    }
}

/// Files behind the picked paths, or the message to show instead of uploading.
fn upload_selection(paths: &[PathBuf]) -> Result<FileSelection, String> {
    let selection = FileSelection::from_paths(paths).map_err(|e| e.to_string())?;
    if selection.is_empty() {
        return Err("No activity files found".to_string());
    }
    Ok(selection)
}

impl App for ActivityUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
