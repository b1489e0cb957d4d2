//! The request pipeline.
//!
//! `StatsClient::request` runs every call through the same steps: build the
//! URL, try the cache (GET only), take a rate limit slot, then run the HTTP
//! call under the retry policy with a per-attempt timeout. Outcomes are
//! reported on the event bus.

use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{ResponseCache, cache_signature};
use crate::clock::{self, Clock};
use crate::config::{ClientConfig, ConfigUpdate};
use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventBus, Subscription, Topic};
use crate::metrics::{CACHE_HITS, CACHE_MISSES, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::RequestOptions;
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RETRY_AFTER: &str = "retry-after";

struct Inner {
    transport: Arc<dyn Transport>,
    config: RwLock<ClientConfig>,
    cache: ResponseCache,
    limiter: RateLimiter,
    events: Arc<EventBus>,
}

/// API client. Cheap to clone, clones share cache, limiter and listeners.
#[derive(Clone)]
pub struct StatsClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for StatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsClient")
            .field("config", &self.config())
            .field("cached", &self.inner.cache.len())
            .field("events", &self.inner.events)
            .finish()
    }
}

impl StatsClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(config, Arc::new(ReqwestTransport::new()), clock::system())
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_parts(config, transport, clock::system())
    }

    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::new(config.rate_limit, config.rate_window, clock.clone());
        Self {
            inner: Arc::new(Inner {
                transport,
                cache: ResponseCache::new(clock),
                limiter,
                events: EventBus::new(),
                config: RwLock::new(config),
            }),
        }
    }

    pub fn config(&self) -> ClientConfig {
        self.inner
            .config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn configure(&self, update: ConfigUpdate) {
        if let Some(limit) = update.rate_limit {
            self.inner.limiter.set_limit(limit);
        }
        let mut config = self
            .inner
            .config
            .write()
            .unwrap_or_else(|e| e.into_inner());
        config.apply(update);
        debug!(base_url = %config.base_url, "client reconfigured");
    }

    pub fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.inner.limiter.status()
    }

    pub fn on<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(topic, callback)
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.inner.cache.len()
    }

    /// Same as [`StatsClient::request`], deserializing the body into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self.request(endpoint, options).await?;
        serde_json::from_value(value)
            .map_err(|e| self.fail(endpoint, ClientError::Decode(e.to_string()), 0))
    }

    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let config = self.config();
        let url = match build_url(&config.base_url, endpoint, &options.params) {
            Ok(url) => url,
            Err(error) => return Err(self.fail(endpoint, error, 0)),
        };
        let cacheable = options.method == Method::GET && options.cache;
        let key = cache_signature(&options.method, url.as_str());
        let started = Instant::now();

        if cacheable {
            if let Some(value) = self.inner.cache.get(&key) {
                CACHE_HITS.inc();
                REQUEST_TOTAL.with_label_values(&["cached"]).inc();
                debug!(endpoint, url = %url, "cache hit");
                self.inner.events.emit(&ClientEvent::Request {
                    endpoint: endpoint.to_string(),
                    method: options.method.to_string(),
                    url: url.to_string(),
                    cached: true,
                    status: None,
                    attempts: 0,
                    elapsed: started.elapsed(),
                    timestamp: Utc::now(),
                });
                return Ok(value);
            }
            CACHE_MISSES.inc();
        }

        if let Err(retry_after) = self.inner.limiter.try_admit() {
            REQUEST_TOTAL.with_label_values(&["rate_limited"]).inc();
            warn!(endpoint, retry_after_ms = retry_after.as_millis() as u64, "client rate limit reached");
            self.inner.events.emit(&ClientEvent::RateLimit {
                endpoint: endpoint.to_string(),
                retry_after,
                status: self.inner.limiter.status(),
                timestamp: Utc::now(),
            });
            return Err(ClientError::RateLimitExceeded { retry_after });
        }

        let policy = RetryPolicy::new(options.retries.unwrap_or(config.retries), config.retry_delay);
        let timeout = options.timeout.unwrap_or(config.timeout);
        let headers = compose_headers(&config, &options.headers);

        let outcome = policy
            .execute(|attempt| {
                let request = HttpRequest {
                    method: options.method.clone(),
                    url: url.clone(),
                    headers: headers.clone(),
                };
                debug!(endpoint, attempt, url = %request.url, "sending request");
                self.send_once(request, timeout)
            })
            .await;

        let attempts = outcome.attempts();
        REQUEST_LATENCY.observe(started.elapsed().as_secs_f64());

        match outcome.into_result() {
            Ok((status, value)) => {
                if cacheable {
                    let ttl = options.cache_duration.unwrap_or(config.cache_duration);
                    self.inner.cache.put(key, value.clone(), ttl);
                }
                REQUEST_TOTAL.with_label_values(&["network"]).inc();
                self.inner.events.emit(&ClientEvent::Request {
                    endpoint: endpoint.to_string(),
                    method: options.method.to_string(),
                    url: url.to_string(),
                    cached: false,
                    status: Some(status),
                    attempts,
                    elapsed: started.elapsed(),
                    timestamp: Utc::now(),
                });
                Ok(value)
            }
            Err(error) => Err(self.fail(endpoint, error, attempts)),
        }
    }

    // Every failure other than a local rate limit rejection ends up here
    fn fail(&self, endpoint: &str, error: ClientError, attempts: u32) -> ClientError {
        REQUEST_TOTAL.with_label_values(&["failed"]).inc();
        warn!(endpoint, attempts, code = %error.code(), error = %error, "request failed");
        self.inner.events.emit(&ClientEvent::Error {
            endpoint: endpoint.to_string(),
            code: error.code(),
            message: error.to_string(),
            attempts,
            timestamp: Utc::now(),
        });
        error
    }

    // One attempt: send under the deadline, fold status and body into a result
    async fn send_once(&self, request: HttpRequest, timeout: Duration) -> Result<(u16, Value)> {
        let res = match tokio::time::timeout(timeout, self.inner.transport.send(request)).await {
            Ok(res) => res?,
            Err(_) => return Err(ClientError::Timeout { after: timeout }),
        };

        if let Some(remaining) = res
            .header(RATE_LIMIT_REMAINING)
            .and_then(|v| v.trim().parse::<u32>().ok())
        {
            self.inner.limiter.reconcile(remaining);
        }

        if !res.is_success() {
            return Err(http_error(&res));
        }

        let value = if res.body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&res.body).map_err(|e| ClientError::Decode(e.to_string()))?
        };
        Ok((res.status, value))
    }
}

// base + path, then the params that have a value, in order
pub(crate) fn build_url(
    base: &str,
    endpoint: &str,
    params: &[(String, Option<String>)],
) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    let mut url =
        Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", joined, e)))?;

    let mut present = params
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
        .peekable();
    if present.peek().is_some() {
        url.query_pairs_mut().extend_pairs(present);
    }
    Ok(url)
}

fn compose_headers(config: &ClientConfig, extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
    for (name, value) in &config.default_headers {
        set_header(&mut headers, name, value);
    }
    if let Some(key) = &config.api_key {
        set_header(&mut headers, "Authorization", &format!("Bearer {}", key));
    }
    for (name, value) in extra {
        set_header(&mut headers, name, value);
    }
    headers
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some(slot) => slot.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

fn http_error(res: &HttpResponse) -> ClientError {
    let message = serde_json::from_slice::<Value>(&res.body)
        .ok()
        .and_then(|body| {
            ["message", "error"]
                .iter()
                .find_map(|field| body.get(*field).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {}", res.status));

    ClientError::Http {
        status: res.status,
        message,
        retry_after: res.header(RETRY_AFTER).and_then(parse_retry_after),
    }
}

// Retry-After in seconds; http-date values are ignored
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
