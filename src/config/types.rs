use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Forum-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Which forum to talk to
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Scheme, authority and optional path prefix, e.g. `https://forum.example.com`
    pub host: String,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Backoff unit for retries and minimum pause between page requests (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Optional proxy every request is routed through
    #[serde(rename = "proxy-url", default)]
    pub proxy_url: Option<String>,

    /// Attempts per page before giving up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Transport timeout for a single request (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

/// Content extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Character substituted for every smiley image in a post body
    #[serde(rename = "smiley-substitute", default = "default_smiley_substitute")]
    pub smiley_substitute: String,
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_smiley_substitute() -> String {
    ",".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            proxy_url: None,
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            smiley_substitute: default_smiley_substitute(),
        }
    }
}

impl Config {
    /// In-memory configuration with defaults for everything but the host
    pub fn default_for_host(host: impl Into<String>) -> Self {
        Self {
            forum: ForumConfig { host: host.into() },
            fetch: FetchConfig::default(),
            extract: ExtractConfig::default(),
        }
    }
}

impl FetchConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExtractConfig {
    /// The substitute as a char; validation guarantees exactly one
    pub fn smiley_char(&self) -> char {
        self.smiley_substitute.chars().next().unwrap_or(',')
    }
}
