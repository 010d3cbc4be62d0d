use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TARGET_URL: &str = "https://big-bang-scripts.tebex.io/";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const CSV_FILE_NAME: &str = "products.csv";
pub const PAGE_DUMP_FILE_NAME: &str = "page.html";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "tebex_url")]
    pub target_url: String,
    pub output_dir: PathBuf,
    pub discord_webhook: Option<String>,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub chrome_path: Option<String>,
}

/// Values supplied on the command line. They take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub discord_webhook: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub chrome_path: Option<String>,
}

impl AppConfig {
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load(Environment::default(), overrides)
    }

    fn load(env: Environment, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let timeout_override = overrides
            .fetch_timeout_secs
            .map(i64::try_from)
            .transpose()
            .map_err(|_| ConfigError::Message("Fetch timeout is out of range".into()))?;
        let output_dir_override = overrides
            .output_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned());

        let s = Config::builder()
            .set_default("tebex_url", DEFAULT_TARGET_URL)?
            .set_default("output_dir", DEFAULT_OUTPUT_DIR)?
            .set_default("fetch_timeout_secs", DEFAULT_FETCH_TIMEOUT_SECS as i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            // Unprefixed: TEBEX_URL, OUTPUT_DIR, DISCORD_WEBHOOK, ...
            .add_source(env)
            .set_override_option("tebex_url", overrides.target_url.clone())?
            .set_override_option("output_dir", output_dir_override)?
            .set_override_option("discord_webhook", overrides.discord_webhook.clone())?
            .set_override_option("fetch_timeout_secs", timeout_override)?
            .set_override_option("chrome_path", overrides.chrome_path.clone())?
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // An exported but empty variable means "not configured"
        config.discord_webhook = config
            .discord_webhook
            .take()
            .filter(|hook| !hook.trim().is_empty());
        config.chrome_path = config.chrome_path.take().filter(|p| !p.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.target_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => {
                return Err(ConfigError::Message(
                    "Target URL must use http or https".into(),
                ));
            }
            Err(_) => return Err(ConfigError::Message("Invalid target URL format".into())),
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message("Output directory must not be empty".into()));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Fetch timeout must be greater than 0".into(),
            ));
        }

        if self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(ConfigError::Message(format!(
                "Fetch timeout must be at most {} seconds",
                MAX_FETCH_TIMEOUT_SECS
            )));
        }

        if let Some(webhook) = &self.discord_webhook {
            if Url::parse(webhook).is_err() {
                return Err(ConfigError::Message("Invalid webhook URL format".into()));
            }
        }

        Ok(())
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(CSV_FILE_NAME)
    }

    pub fn page_dump_path(&self) -> PathBuf {
        self.output_dir.join(PAGE_DUMP_FILE_NAME)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
