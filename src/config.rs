use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::rate_limit::{DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW};

pub const DEFAULT_BASE_URL: &str = "https://api.example.com/v1";

/// Settings one `StatsClient` runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub default_headers: Vec<(String, String)>,
    // per attempt
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub cache_duration: Duration,
    pub rate_limit: u32,
    pub rate_window: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            default_headers: Vec::new(),
            timeout: Duration::from_secs(10),
            retries: 3,
            retry_delay: Duration::from_secs(1),
            cache_duration: Duration::from_secs(30),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
        }
    }
}

// Partial update for StatsClient::configure, None means keep
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub base_url: Option<String>,
    pub api_key: Option<Option<String>>,
    pub default_headers: Option<Vec<(String, String)>>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub cache_duration: Option<Duration>,
    pub rate_limit: Option<u32>,
}

impl ClientConfig {
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(base_url) = update.base_url {
            self.base_url = base_url;
        }
        if let Some(api_key) = update.api_key {
            self.api_key = api_key;
        }
        if let Some(headers) = update.default_headers {
            self.default_headers = headers;
        }
        if let Some(timeout) = update.timeout {
            self.timeout = timeout;
        }
        if let Some(retries) = update.retries {
            self.retries = retries;
        }
        if let Some(delay) = update.retry_delay {
            self.retry_delay = delay;
        }
        if let Some(ttl) = update.cache_duration {
            self.cache_duration = ttl;
        }
        if let Some(limit) = update.rate_limit {
            self.rate_limit = limit;
        }
    }
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "stats-client")]
#[command(about = "Query the streaming stats API through the caching, rate limited client")]
pub struct Args {
    // API base url
    #[arg(long, env = "STATS_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    // Bearer token
    #[arg(long, env = "STATS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Per attempt timeout in milliseconds
    #[arg(long, env = "STATS_API_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    // Max attempts per request
    #[arg(long, env = "STATS_API_RETRIES", default_value_t = 3)]
    pub retries: u32,

    // Base retry delay in milliseconds
    #[arg(long, default_value_t = 1_000)]
    pub retry_delay_ms: u64,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 30)]
    pub cache_ttl: u64,

    // Rate limit max requests per 5 minute window
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT)]
    pub rate_limit: u32,

    // Print pipeline events as json lines on stderr
    #[arg(long)]
    pub events: bool,

    // Print prometheus metrics after the call
    #[arg(long)]
    pub metrics: bool,

    // How many times to issue the call (later ones should hit the cache)
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// GET any endpoint path, e.g. `get /rooms page=1 page_size=10`
    Get {
        endpoint: String,
        /// key=value query parameters
        params: Vec<String>,
    },
    Rooms {
        /// room id, lists rooms when omitted
        id: Option<String>,
    },
    User {
        id: String,
    },
    ActiveUsers,
    Games {
        #[arg(long)]
        provider: Option<String>,
    },
    Missions {
        #[arg(long)]
        room: Option<String>,
    },
    Leaderboard {
        mission_id: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Bets {
        /// big, lucky, recent or wins
        #[arg(default_value = "recent")]
        feed: String,
    },
    Banners,
    Livestreams,
    Health,
    Features,
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            retries: self.retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            cache_duration: Duration::from_secs(self.cache_ttl),
            rate_limit: self.rate_limit,
            ..ClientConfig::default()
        }
    }
}
