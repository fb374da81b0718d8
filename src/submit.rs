//! Glue between configuration and the batch controller. Both the upload page
//! and the `upload` command go through [`submit`].

use crate::api;
use crate::config::AppConfig;
use crate::upload::{
    BatchController, BatchEvent, BatchReport, CancelToken, FileSelection, HttpTransport,
};
use anyhow::{Context, Result};
use std::sync::mpsc::Sender;

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("activity-uploader/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}

/// Resolves the target account, then uploads `selection` in groups.
/// Errors only when the batch cannot start; per-file failures are in the
/// returned controller's status mapping.
pub async fn submit(
    config: &AppConfig,
    selection: &FileSelection,
    events: Option<Sender<BatchEvent>>,
    cancel: &CancelToken,
) -> Result<(BatchController, BatchReport)> {
    let client = http_client()?;
    let user_id = api::resolve_user_id(&client, &config.server_url, config.user_id.as_deref())
        .await
        .context("resolving upload account")?;

    let transport = HttpTransport::new(
        client,
        &config.server_url,
        &user_id,
        config.body,
        config.multipart_field.clone(),
    );
    tracing::info!("uploading {} files to {}", selection.len(), transport.url());

    let mut controller = BatchController::new(config.batch_settings());
    if let Some(sender) = events {
        controller = controller.with_events(sender);
    }
    let report = controller.run(&transport, selection, cancel).await;
    Ok((controller, report))
}
