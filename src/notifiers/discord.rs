use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use tracing::{info, warn};

use super::traits::{NotificationResult, Notifier};
use crate::utils::error::{AppError, Result};

/// Uploads a file to a Discord webhook as a message attachment.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        DiscordNotifier {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    async fn build_form(&self, file_path: &Path) -> Result<Form> {
        let bytes = tokio::fs::read(file_path).await.map_err(|e| {
            AppError::Notify(format!("Failed to read {}: {}", file_path.display(), e))
        })?;

        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| AppError::Notify(e.to_string()))?;

        Ok(Form::new().part("file", part))
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, file_path: &Path) -> Result<NotificationResult> {
        info!("Posting {} to Discord webhook", file_path.display());

        let form = self.build_form(file_path).await?;
        let response = self
            .client
            .post(&self.webhook_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Notify(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            info!("Posted successfully to Discord");
            return Ok(NotificationResult::delivered(status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Discord responded with {}: {}", status.as_u16(), body);
        Ok(NotificationResult::rejected(status.as_u16(), body))
    }
}
