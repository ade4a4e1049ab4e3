use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Outbound call policy (see `gateway` table in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Calls allowed in any rolling 60-second window.
    /// TOML: `gateway.requests_per_minute`. Default: `60`.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Calls allowed per 24h window, counted from the first call of the window.
    /// TOML: `gateway.requests_per_day`. Default: `10000`.
    #[serde(default = "default_requests_per_day")]
    pub requests_per_day: u64,

    /// Retries after the first attempt for retryable failures.
    /// TOML: `gateway.max_retries`. Default: `3`.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// TOML: `gateway.initial_delay_ms`. Default: `1000`.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// TOML: `gateway.max_delay_ms`. Default: `32000`.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Pause between successive dequeues; `0` disables it.
    /// TOML: `gateway.courtesy_delay_ms`. Default: `100`.
    #[serde(default = "default_courtesy_delay_ms")]
    pub courtesy_delay_ms: u64,

    /// TOML: `gateway.connect_timeout_secs`. Default: `10`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// TOML: `gateway.request_timeout_secs`. Default: `30`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional upstream HTTP proxy.
    /// TOML: `gateway.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `gateway.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,
}

impl GatewayConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms))
    }

    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_millis(self.courtesy_delay_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            requests_per_day: default_requests_per_day(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            courtesy_delay_ms: default_courtesy_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            proxy: None,
            enable_multiplexing: false,
        }
    }
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_requests_per_day() -> u64 {
    10_000
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    32_000
}

fn default_courtesy_delay_ms() -> u64 {
    100
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}
