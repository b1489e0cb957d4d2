use async_trait::async_trait;
use reqwest::Method;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::io;
use url::Url;

use crate::error::{TransportError, TransportErrorKind};

// What the pipeline hands to a transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    // names are lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP seam of the client.
///
/// Implementations send one request and return the whole response. Non-2xx
/// statuses are a normal `Ok` response; `Err` is only for failures below HTTP.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// Production transport on top of reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let res = builder.send().await.map_err(classify)?;

        let status = res.status().as_u16();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = res.bytes().await.map_err(classify)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// Map a reqwest failure onto the kinds the retry policy knows about
fn classify(err: reqwest::Error) -> TransportError {
    let message = err.to_string();

    if err.is_timeout() {
        return TransportError::new(TransportErrorKind::TimedOut, message);
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            let kind = match io_err.kind() {
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => Some(TransportErrorKind::ConnectionReset),
                io::ErrorKind::TimedOut => Some(TransportErrorKind::TimedOut),
                io::ErrorKind::ConnectionRefused => Some(TransportErrorKind::ConnectionRefused),
                _ => None,
            };
            if let Some(kind) = kind {
                return TransportError::new(kind, message);
            }
        }

        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return TransportError::new(TransportErrorKind::DnsFailure, message);
        }
        source = cause.source();
    }

    TransportError::new(TransportErrorKind::Other, message)
}
