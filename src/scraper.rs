use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::HashSet;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::utils::error::{AppError, Result};

/// Listings are rendered client-side, so "loaded" means no requests in flight for this long.
pub const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Source of rendered HTML for a URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
}

impl BrowserOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            chrome_path: config.chrome_path.as_ref().map(PathBuf::from),
        }
    }
}

/// Fetches pages with a throwaway headless Chrome per call.
pub struct ChromeFetcher {
    options: BrowserOptions,
}

impl ChromeFetcher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        info!("Launching headless Chrome and fetching {}", url);

        let options = self.options.clone();
        let target = url.to_string();
        // headless_chrome is blocking; the run still waits for this before moving on
        let html = tokio::task::spawn_blocking(move || fetch_blocking(&options, &target, timeout))
            .await
            .map_err(|e| AppError::Fetch {
                url: url.to_string(),
                message: format!("Browser task failed: {}", e),
            })??;

        info!("Fetched page HTML ({} bytes)", html.len());
        Ok(html)
    }
}

/// Closes the tab however the fetch ends. The browser process goes when `Browser` drops.
struct TabSession(Arc<Tab>);

impl Deref for TabSession {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        &self.0
    }
}

impl Drop for TabSession {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(true) {
            debug!("Failed to close tab: {}", e);
        }
    }
}

fn fetch_blocking(options: &BrowserOptions, url: &str, timeout: Duration) -> Result<String> {
    let deadline = Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| AppError::Fetch {
            url: url.to_string(),
            message: format!("Fetch timeout of {}s is out of range", timeout.as_secs()),
        })?;
    let fail = |e: anyhow::Error| classify_failure(url, timeout, deadline, e);

    let browser = launch_browser(options, timeout).map_err(fail)?;
    // Incognito context: no cookies or cache shared with anything else
    let context = browser.new_context().map_err(fail)?;
    let tab = TabSession(context.new_tab().map_err(fail)?);

    tab.set_default_timeout(timeout);
    tab.set_user_agent(&options.user_agent, None, None)
        .map_err(fail)?;

    // Must be listening before navigation or the document's own requests are missed
    let network = Arc::new(NetworkActivity::default());
    let listener = Arc::clone(&network);
    tab.call_method(Network::Enable {
        max_total_buffer_size: None,
        max_resource_buffer_size: None,
        report_direct_socket_traffic: None,
        enable_durable_messages: None,
        max_post_data_size: None,
    })
    .map_err(fail)?;
    tab.add_event_listener(Arc::new(move |event: &Event| listener.on_event(event)))
        .map_err(fail)?;

    tab.navigate_to(url).map_err(fail)?;
    tab.wait_until_navigated().map_err(fail)?;

    let page = TabActivity {
        tab: &tab,
        network: &network,
    };
    wait_for_network_idle(&page, deadline, NETWORK_QUIET_WINDOW, POLL_INTERVAL).map_err(fail)?;

    tab.get_content().map_err(fail)
}

fn launch_browser(options: &BrowserOptions, timeout: Duration) -> anyhow::Result<Browser> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false) // Often needed in containerized environments
        .idle_browser_timeout(timeout.max(Duration::from_secs(30)))
        .args(vec![
            std::ffi::OsStr::new("--no-sandbox"),
            std::ffi::OsStr::new("--disable-dev-shm-usage"),
            std::ffi::OsStr::new("--disable-gpu"),
            std::ffi::OsStr::new("--disable-extensions"),
        ])
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create launch options: {}", e))?;

    if let Some(chrome_path) = &options.chrome_path {
        launch_options.path = Some(chrome_path.clone());
    }

    Browser::new(launch_options).map_err(|e| anyhow::anyhow!("Failed to launch browser: {}", e))
}

/// Polls `page` until it has been idle for `quiet`, failing with headless_chrome's
/// `Timeout` once `deadline` passes.
fn wait_for_network_idle(
    page: &dyn ActivitySource,
    deadline: Instant,
    quiet: Duration,
    poll: Duration,
) -> anyhow::Result<()> {
    let mut tracker = IdleTracker::new(quiet);

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(headless_chrome::util::Timeout.into());
        }

        let activity = page.read()?;
        if tracker.observe(activity, now) {
            debug!("Network idle after {} requests", activity.started);
            return Ok(());
        }

        std::thread::sleep(poll);
    }
}

/// Timeouts from the browser, or anything failing past the deadline, count as `FetchTimeout`.
fn classify_failure(
    url: &str,
    timeout: Duration,
    deadline: Instant,
    err: anyhow::Error,
) -> AppError {
    if err.is::<headless_chrome::util::Timeout>() || Instant::now() >= deadline {
        AppError::FetchTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        AppError::Fetch {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// One reading of the page's load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageActivity {
    complete: bool,
    in_flight: usize,
    /// Requests started so far. A change between polls means one came and went unseen.
    started: u64,
}

trait ActivitySource {
    fn read(&self) -> anyhow::Result<PageActivity>;
}

struct TabActivity<'a> {
    tab: &'a Tab,
    network: &'a NetworkActivity,
}

impl ActivitySource for TabActivity<'_> {
    fn read(&self) -> anyhow::Result<PageActivity> {
        let state = self.tab.evaluate("document.readyState", false)?;
        Ok(PageActivity {
            complete: state.value.as_ref().and_then(|value| value.as_str()) == Some("complete"),
            in_flight: self.network.in_flight(),
            started: self.network.started(),
        })
    }
}

/// Requests the tab has sent that have not yet finished or failed, keyed by CDP request id.
#[derive(Debug, Default)]
struct NetworkActivity {
    pending: Mutex<HashSet<String>>,
    started: AtomicU64,
}

impl NetworkActivity {
    fn on_event(&self, event: &Event) {
        match event {
            Event::NetworkRequestWillBeSent(e) => self.request_started(&e.params.request_id),
            Event::NetworkLoadingFinished(e) => self.request_done(&e.params.request_id),
            Event::NetworkLoadingFailed(e) => self.request_done(&e.params.request_id),
            _ => {}
        }
    }

    // Redirects reuse the request id, so the set keeps one entry per request
    fn request_started(&self, request_id: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.pending().insert(request_id.to_string());
    }

    fn request_done(&self, request_id: &str) {
        self.pending().remove(request_id);
    }

    fn in_flight(&self) -> usize {
        self.pending().len()
    }

    fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    fn pending(&self) -> MutexGuard<'_, HashSet<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decides when the page has gone quiet: document complete and nothing in flight for `quiet`.
struct IdleTracker {
    quiet: Duration,
    last_started: Option<u64>,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_started: None,
            quiet_since: None,
        }
    }

    fn observe(&mut self, activity: PageActivity, now: Instant) -> bool {
        if !activity.complete || activity.in_flight > 0 {
            self.last_started = None;
            self.quiet_since = None;
            return false;
        }

        if self.last_started != Some(activity.started) {
            self.last_started = Some(activity.started);
            self.quiet_since = Some(now);
        }

        self.quiet_since
            .map(|since| now.duration_since(since) >= self.quiet)
            .unwrap_or(false)
    }
}
