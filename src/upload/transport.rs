use super::error::TransportError;
use super::selection::SelectedFile;
use super::types::UploadResponse;
use crate::config::BodyMode;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::multipart::{Form, Part};

/// Sends one activity file to the server.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn post_activity(&self, file: &SelectedFile) -> Result<UploadResponse, TransportError>;
}

/// `POST {server}/user/{user_id}/activity`, one file per request.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    body: BodyMode,
    multipart_field: String,
}

impl HttpTransport {
    pub fn new(
        client: reqwest::Client,
        server_url: &str,
        user_id: &str,
        body: BodyMode,
        multipart_field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: activity_url(server_url, user_id),
            body,
            multipart_field: multipart_field.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub fn activity_url(server_url: &str, user_id: &str) -> String {
    format!("{}/user/{}/activity", server_url.trim_end_matches('/'), user_id)
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn post_activity(&self, file: &SelectedFile) -> Result<UploadResponse, TransportError> {
        let content = tokio::fs::read(&file.path)
            .await
            .map_err(|source| TransportError::Read {
                path: file.path.clone(),
                source,
            })?;

        let request = self.client.post(&self.url);
        let request = match self.body {
            BodyMode::Raw => request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(content),
            BodyMode::Multipart => {
                let part = Part::bytes(content).file_name(file.name.clone());
                request.multipart(Form::new().part(self.multipart_field.clone(), part))
            }
        };

        let response = request.send().await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(UploadResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}
