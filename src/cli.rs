use crate::app::ActivityUploader;
use crate::config::{self, AppConfig, BodyMode, APP_NAME};
use crate::submit;
use crate::upload::{CancelToken, FileSelection, UploadOutcome};
use crate::utils::prefs::PreferenceStore;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Desktop and command-line uploader for training activity files.
#[derive(Debug, Parser)]
#[command(name = "activity-uploader", version)]
#[command(about = "Upload activity files to a TF-Viewer server", long_about = None)]
pub struct Cli {
    /// Config file to use instead of the XDG default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides config).
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Account to upload to (overrides config).
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Open the desktop application (default).
    Gui {
        /// Route to open first, e.g. `/upload`.
        #[arg(long, default_value = "/")]
        page: String,
    },

    /// Upload files and directories without the GUI.
    Upload {
        /// Activity files, or directories to scan for .fit/.gpx/.tcx files.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum number of requests in flight.
        #[arg(long)]
        group_size: Option<usize>,

        /// Per-request timeout in seconds (at least 1).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Send each file as a multipart form field instead of the raw body.
        #[arg(long)]
        multipart: bool,
    },

    /// Show which user the server considers signed in.
    Whoami,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_or_init_at(path)?,
            None => config::load_or_init()?,
        };
        if let Some(server) = &self.server {
            cfg.server_url = server.clone();
        }
        if let Some(user) = &self.user {
            cfg.user_id = Some(user.clone());
        }
        Ok(cfg)
    }
}

pub fn run_from_args() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    let mut cfg = cli.load_config()?;
    tracing::debug!("loaded config: {:?}", cfg);

    match cli.command {
        None => run_gui(cfg, "/"),
        Some(CliCommand::Gui { page }) => run_gui(cfg, &page),
        Some(CliCommand::Upload {
            paths,
            group_size,
            timeout,
            multipart,
        }) => {
            if let Some(group_size) = group_size {
                cfg.group_size = group_size;
            }
            if let Some(timeout) = timeout {
                cfg.request_timeout_secs = timeout;
            }
            if multipart {
                cfg.body = BodyMode::Multipart;
            }
            run_upload(&cfg, &paths)
        }
        Some(CliCommand::Whoami) => run_whoami(&cfg),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("starting async runtime")
}

fn run_gui(cfg: AppConfig, page: &str) -> Result<()> {
    let prefs = PreferenceStore::open_default()?;
    let page = page.to_string();
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([420.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Box::new(ActivityUploader::new(cc, cfg, prefs, &page))),
    )
    .map_err(|e| anyhow::anyhow!("desktop application failed: {}", e))
}

fn run_upload(cfg: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let selection = FileSelection::from_paths(paths)?;
    if selection.is_empty() {
        bail!("no activity files found");
    }

    let cancel = CancelToken::new();
    let (controller, report) = runtime()?.block_on(async {
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
        submit::submit(cfg, &selection, None, &cancel).await
    })?;

    for file in selection.files() {
        let line = match controller.status(&file.name) {
            None => "pending".to_string(),
            Some(UploadOutcome::Success) => "ok".to_string(),
            Some(UploadOutcome::Failure(reason)) => format!("failed ({})", reason),
            Some(UploadOutcome::Timeout) => "timed out".to_string(),
        };
        println!("{:<40} {}", file.name, line);
    }
    println!(
        "{} / {} processed: {} uploaded, {} failed, {} timed out in {:.1}s",
        controller.upload_count(),
        report.total,
        report.succeeded,
        report.failed,
        report.timed_out,
        report.elapsed.as_secs_f64()
    );

    if let Some(error) = controller.error() {
        bail!("{}", error);
    }
    if !report.all_succeeded() {
        bail!("{} of {} files were not accepted", report.total - report.succeeded, report.total);
    }
    Ok(())
}

fn run_whoami(cfg: &AppConfig) -> Result<()> {
    let client = submit::http_client()?;
    let username = runtime()?.block_on(crate::api::fetch_username(&client, &cfg.server_url))?;
    match username {
        Some(name) => println!("{}", name),
        None => println!("not signed in"),
    }
    Ok(())
}
