// Shared fixtures for the integration tests

pub mod scrape_run_tests;

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tebex_scraper::{
    AppConfig, ScrapePipeline,
    config::DEFAULT_USER_AGENT,
    extractor::ProductExtractor,
    scraper::PageFetcher,
    utils::error::{AppError, Result},
};

pub const SHOP_URL: &str = "https://shop.x/";

/// A storefront page as a typical Tebex theme renders it.
pub const STOREFRONT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Big Bang Scripts</title></head>
<body>
  <main>
    <div class="package-card">
      <h3 class="package-name">Starter</h3>
      <span class="price">$5.00</span>
      <a href="/package/1">Buy</a>
    </div>
    <div class="package-card">
      <h3 class="package-name">Garage, "Deluxe"</h3>
      <span class="price">$12.50</span>
      <a href="https://checkout.tebex.io/package/2">Buy</a>
    </div>
    <div class="package-card">
      <h3 class="package-name">Mystery Box</h3>
    </div>
  </main>
</body>
</html>"#;

/// Test configuration rooted in a temp directory
pub fn get_test_config(output_dir: &Path, webhook: Option<String>) -> AppConfig {
    AppConfig {
        target_url: SHOP_URL.to_string(),
        output_dir: output_dir.to_path_buf(),
        discord_webhook: webhook,
        fetch_timeout_secs: 10,
        user_agent: DEFAULT_USER_AGENT.to_string(),
        chrome_path: None,
    }
}

/// Serves a fixed document and counts how often it was asked.
pub struct StaticPage {
    html: String,
    pub calls: AtomicUsize,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageFetcher for StaticPage {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }
}

/// Fails the way an unreachable host does.
pub struct UnreachableHost;

#[async_trait]
impl PageFetcher for UnreachableHost {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
        Err(AppError::Fetch {
            url: url.to_string(),
            message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        })
    }
}

pub fn create_test_pipeline(
    config: AppConfig,
    fetcher: impl PageFetcher + 'static,
) -> ScrapePipeline {
    ScrapePipeline::new(
        config,
        Box::new(fetcher),
        ProductExtractor::new().expect("default selectors parse"),
    )
}

/// Rows of a CSV file, header excluded.
pub fn read_csv(path: &Path) -> Vec<(String, String, String)> {
    let mut reader = csv::Reader::from_path(path).expect("csv readable");
    reader
        .deserialize()
        .collect::<std::result::Result<_, _>>()
        .expect("well-formed rows")
}
