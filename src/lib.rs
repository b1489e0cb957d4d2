//! Client for the streaming stats REST API.
//!
//! Every endpoint call goes through [`StatsClient::request`]: a TTL cache for
//! GET bodies, a client-side sliding window rate limiter (5000 requests per
//! 5 minutes by default), retry with backoff for 429/5xx/transient network
//! failures, and an event bus reporting `request`, `rateLimit` and `error`.
//!
//! ```rust,no_run
//! use stream_stats_client::{ClientConfig, ListQuery, StatsClient, Topic};
//!
//! # async fn run() -> stream_stats_client::Result<()> {
//! let client = StatsClient::new(ClientConfig {
//!     base_url: "https://api.example.com/v1".into(),
//!     ..ClientConfig::default()
//! });
//!
//! let errors = client.on(Topic::Error, |event| eprintln!("{:?}", event));
//! let rooms = client.rooms().list(&ListQuery::new().page(1, 20)).await?;
//! println!("{}", rooms);
//! errors.unsubscribe();
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod refresh;
pub mod retry;
pub mod transport;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;

pub use client::StatsClient;
pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, ConfigUpdate};
pub use error::{ClientError, Result, TransportError, TransportErrorKind};
pub use events::{ClientEvent, EventBus, Subscription, Topic};
pub use models::{ActiveUserStats, ListQuery, Page, RequestOptions, SortDir};
pub use rate_limit::RateLimitStatus;
pub use refresh::{AutoRefresh, RefreshHandle};
pub use retry::{RetryOutcome, RetryPolicy};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
