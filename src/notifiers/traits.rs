use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::error::Result;

/// What the webhook said about an upload that reached it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResult {
    pub success: bool,
    pub status: u16,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(status: u16) -> Self {
        Self {
            success: true,
            status,
            error: None,
        }
    }

    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            error: Some(body.into()),
        }
    }
}

/// Best-effort delivery of an exported file.
///
/// `Ok` means the endpoint answered, whatever the status. `Err` is a transport
/// failure. Neither is allowed to fail the run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, file_path: &Path) -> Result<NotificationResult>;
}
