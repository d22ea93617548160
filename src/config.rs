//! Command line and environment configuration
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it. Nothing is required: with no endpoint, no payload file
//! and no Telegram credentials the watcher runs against sample data and only
//! logs.

use crate::fetcher::{RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_JITTER_CAP};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Inventory stock watcher - alerts once each time a product comes back in stock
#[derive(Parser, Debug, Clone)]
#[command(name = "stock_watch")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Product list URL; when unset, the payload file or sample data is used
    #[arg(long, env = "API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// Per-attempt fetch timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT", default_value_t = 15.0)]
    pub fetch_timeout: f64,

    /// Additional fetch attempts after the first failure
    #[arg(long, env = "FETCH_RETRIES", default_value_t = 2)]
    pub fetch_retries: u32,

    /// Seconds between polls
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 60)]
    pub poll_interval: u64,

    /// Maximum extra sleep per poll, as a fraction of the interval
    #[arg(long, env = "POLL_JITTER", default_value_t = 0.1)]
    pub poll_jitter: f64,

    /// Local JSON payload used when the endpoint is unset or failing
    #[arg(long, env = "PAYLOAD_FILE")]
    pub payload_file: Option<PathBuf>,

    /// Durable stock state file
    #[arg(long, env = "STATE_FILE", default_value_os_t = default_state_path())]
    pub state_file: PathBuf,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat ids to alert (comma separated)
    #[arg(long, env = "TELEGRAM_CHAT_ID", value_delimiter = ',')]
    pub telegram_chat_id: Vec<String>,

    /// Optional pincode -> product id mapping
    #[arg(long, env = "PINCODE_MAP_FILE", default_value = "pincode_products.json")]
    pub pincode_map: PathBuf,

    /// Run a single poll cycle and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Print the products currently in stock and exit
    #[arg(long, default_value_t = false, conflicts_with = "once")]
    pub check: bool,

    /// Pincode used to filter `--check` output
    #[arg(long, requires = "check", value_parser = parse_pincode)]
    pub pincode: Option<String>,

    /// Print `--check` output as JSON
    #[arg(long, requires = "check", default_value_t = false)]
    pub json: bool,
}

/// Returns the default state path: ~/.local/share/stock_watch/stock_state.json
fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stock_watch")
        .join("stock_state.json")
}

fn parse_pincode(value: &str) -> Result<String, String> {
    if crate::pincode::is_valid_pincode(value) {
        Ok(value.to_string())
    } else {
        Err("pincode must be 4 to 6 digits".to_string())
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.fetch_timeout).unwrap_or(Duration::from_secs(15))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.fetch_retries,
            base_delay: DEFAULT_BACKOFF_BASE,
            jitter_cap: DEFAULT_JITTER_CAP,
            timeout: self.fetch_timeout(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Jitter fraction clamped to `[0, 1]`
    pub fn poll_jitter(&self) -> f64 {
        if self.poll_jitter.is_finite() {
            self.poll_jitter.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
