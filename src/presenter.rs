use std::sync::Arc;

use bytes::Bytes;
use reqwest::Url;
use tracing::{error, info};

use crate::{
    backend::WebsiteBackend,
    error::WizardError,
    models::{GeneratedWebsite, Notification},
};

/// Archive bytes plus the name they should be saved under.
#[derive(Debug, Clone)]
pub struct DownloadedArchive {
    pub file_name: String,
    pub bytes: Bytes,
}

pub struct ResultPresenter {
    backend: Arc<dyn WebsiteBackend>,
}

impl ResultPresenter {
    pub fn new(backend: Arc<dyn WebsiteBackend>) -> Self {
        Self { backend }
    }

    /// Where the preview lives. Opening it is up to the caller; nothing changes here.
    pub fn open_preview(&self, website: &GeneratedWebsite) -> Result<Url, WizardError> {
        let url = self.backend.resolve(&website.preview_url)?;
        info!("👀 Opening preview for website {}: {}", website.id, url);
        Ok(url)
    }

    /// Fetches the source archive. A failure comes back as a notification, never as a state change.
    pub async fn download(&self, website: &GeneratedWebsite, business_name: &str) -> Result<DownloadedArchive, Notification> {
        match self.backend.download_archive(&website.download_url).await {
            Ok(bytes) => {
                let file_name = archive_file_name(business_name);
                info!("📦 Downloaded {} ({} bytes)", file_name, bytes.len());
                Ok(DownloadedArchive { file_name, bytes })
            }
            Err(e) => {
                error!("❌ Download of website {} failed: {}", website.id, e);
                Err(Notification::destructive(
                    "Download Failed",
                    "There was an error downloading your website source code.",
                ))
            }
        }
    }
}

pub fn archive_file_name(business_name: &str) -> String {
    let cleaned: String = business_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if cleaned.is_empty() { "website" } else { cleaned.as_str() };
    format!("{stem}-source.zip")
}
