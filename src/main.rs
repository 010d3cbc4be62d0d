use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use tebex_scraper::config::{AppConfig, ConfigOverrides};
use tebex_scraper::{RunOutcome, ScrapePipeline};

/// Scrape a Tebex storefront into CSV. Flags override the environment.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Storefront page to scrape [env: TEBEX_URL]
    #[arg(long)]
    url: Option<String>,

    /// Directory for products.csv and page.html [env: OUTPUT_DIR]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Discord webhook that receives the CSV [env: DISCORD_WEBHOOK]
    #[arg(long)]
    webhook: Option<String>,

    /// Seconds to wait for the page to go idle [env: FETCH_TIMEOUT_SECS]
    #[arg(long)]
    timeout: Option<u64>,

    /// Chrome or Chromium executable [env: CHROME_PATH]
    #[arg(long)]
    chrome_path: Option<String>,
}

impl From<Cli> for ConfigOverrides {
    fn from(cli: Cli) -> Self {
        ConfigOverrides {
            target_url: cli.url,
            output_dir: cli.output_dir,
            discord_webhook: cli.webhook,
            fetch_timeout_secs: cli.timeout,
            chrome_path: cli.chrome_path,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tebex_scraper=info".parse()?),
        )
        .init();

    let config = AppConfig::from_env(&cli.into())?;
    let pipeline = ScrapePipeline::from_config(config)?;

    match pipeline.run().await? {
        RunOutcome::Exported {
            products, csv_path, ..
        } => info!("Done: {} products in {}", products, csv_path.display()),
        RunOutcome::NoProducts { dump_path } => {
            info!("Done: no products, page saved to {}", dump_path.display())
        }
    }

    Ok(())
}
