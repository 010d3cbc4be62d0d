use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::csv_writer;
use crate::extractor::ProductExtractor;
use crate::notifiers::{DiscordNotifier, Notifier};
use crate::scraper::{BrowserOptions, ChromeFetcher, PageFetcher};
use crate::utils::error::{AppError, Result};

/// Terminal state of one scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Products were written to `csv_path`.
    Exported {
        products: usize,
        csv_path: PathBuf,
        notification: NotificationOutcome,
    },
    /// Nothing matched; the fetched page was dumped to `dump_path` for inspection.
    NoProducts { dump_path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// No webhook configured.
    Skipped,
    Delivered { status: u16 },
    Rejected { status: u16 },
    Failed { error: String },
}

/// Fetch, extract, export, notify. Each step runs once, in order.
pub struct ScrapePipeline {
    config: AppConfig,
    fetcher: Box<dyn PageFetcher>,
    extractor: ProductExtractor,
    notifier: Option<Box<dyn Notifier>>,
}

impl ScrapePipeline {
    pub fn new(
        config: AppConfig,
        fetcher: Box<dyn PageFetcher>,
        extractor: ProductExtractor,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            notifier: None,
        }
    }

    /// Headless Chrome, default selectors, and Discord when a webhook is set.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let fetcher = ChromeFetcher::new(BrowserOptions::from_config(&config));
        let webhook = config.discord_webhook.clone();

        let pipeline = Self::new(config, Box::new(fetcher), ProductExtractor::new()?);
        Ok(match webhook {
            Some(url) => pipeline.with_notifier(Box::new(DiscordNotifier::new(url))),
            None => pipeline,
        })
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let url = &self.config.target_url;
        info!("Starting Tebex scraper for {}", url);

        let html = self
            .fetcher
            .fetch(url, self.config.fetch_timeout())
            .await?;
        let products = self.extractor.extract(&html, url);

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| AppError::write(&self.config.output_dir, e))?;

        if products.is_empty() {
            let dump_path = self.config.page_dump_path();
            fs::write(&dump_path, html.as_bytes()).map_err(|e| AppError::write(&dump_path, e))?;
            warn!(
                "No products found. HTML saved to {} for inspection.",
                dump_path.display()
            );
            return Ok(RunOutcome::NoProducts { dump_path });
        }

        let csv_path = self.config.csv_path();
        csv_writer::write_products(&products, &csv_path)?;
        info!("Saved CSV with {} products", products.len());

        let notification = match &self.notifier {
            Some(notifier) => deliver(notifier.as_ref(), &csv_path).await,
            None => NotificationOutcome::Skipped,
        };

        Ok(RunOutcome::Exported {
            products: products.len(),
            csv_path,
            notification,
        })
    }
}

async fn deliver(notifier: &dyn Notifier, csv_path: &Path) -> NotificationOutcome {
    match notifier.notify(csv_path).await {
        Ok(result) if result.success => NotificationOutcome::Delivered {
            status: result.status,
        },
        Ok(result) => NotificationOutcome::Rejected {
            status: result.status,
        },
        Err(e) => {
            error!("Failed to post to Discord: {}", e);
            NotificationOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}
