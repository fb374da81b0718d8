use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UsernameResponse {
    username: Option<String>,
}

/// Asks the server who the session belongs to. `None` means signed out.
pub async fn fetch_username(client: &reqwest::Client, server_url: &str) -> Result<Option<String>> {
    let url = format!("{}/username", server_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;

    let body: UsernameResponse = response
        .json()
        .await
        .context("decoding /username response")?;
    Ok(body.username.filter(|name| !name.is_empty()))
}

/// The account uploads go to: the configured one, else whoever is signed in.
pub async fn resolve_user_id(
    client: &reqwest::Client,
    server_url: &str,
    configured: Option<&str>,
) -> Result<String> {
    if let Some(user) = configured.filter(|u| !u.is_empty()) {
        return Ok(user.to_string());
    }
    fetch_username(client, server_url)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no user configured and the server reports no signed-in user"))
}
