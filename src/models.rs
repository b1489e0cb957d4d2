use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// Per-call knobs for StatsClient::request, unset values fall back to the client config
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    // None values are left out of the query string
    pub params: Vec<(String, Option<String>)>,
    pub headers: Vec<(String, String)>,
    pub cache: bool,
    pub cache_duration: Option<Duration>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            params: Vec::new(),
            headers: Vec::new(),
            cache: true,
            cache_duration: None,
            timeout: None,
            retries: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), Some(value.to_string())));
        self
    }

    pub fn param_opt<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        self.params
            .push((name.to_string(), value.map(|v| v.to_string())));
        self
    }

    pub fn query(mut self, query: &ListQuery) -> Self {
        self.params.extend(query.to_params());
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    pub fn cache_for(mut self, ttl: Duration) -> Self {
        self.cache = true;
        self.cache_duration = Some(ttl);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDir::Asc => f.write_str("asc"),
            SortDir::Desc => f.write_str("desc"),
        }
    }
}

/// Paging, sorting and filtering shared by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_field: Option<String>,
    pub sort_dir: Option<SortDir>,
    pub search_field: Option<String>,
    pub search_value: Option<String>,
    pub equals_field: Option<String>,
    pub equals_value: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn sort(mut self, field: &str, dir: SortDir) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_dir = Some(dir);
        self
    }

    pub fn search(mut self, field: &str, value: &str) -> Self {
        self.search_field = Some(field.to_string());
        self.search_value = Some(value.to_string());
        self
    }

    pub fn equals(mut self, field: &str, value: &str) -> Self {
        self.equals_field = Some(field.to_string());
        self.equals_value = Some(value.to_string());
        self
    }

    pub fn to_params(&self) -> Vec<(String, Option<String>)> {
        vec![
            ("page".into(), self.page.map(|v| v.to_string())),
            ("page_size".into(), self.page_size.map(|v| v.to_string())),
            ("sort_field".into(), self.sort_field.clone()),
            ("sort_dir".into(), self.sort_dir.map(|d| d.to_string())),
            ("search_field".into(), self.search_field.clone()),
            ("search_value".into(), self.search_value.clone()),
            ("equals_field".into(), self.equals_field.clone()),
            ("equals_value".into(), self.equals_value.clone()),
        ]
    }
}

// Paged envelope some list endpoints answer with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUserStats {
    pub active_user_count: u64,
}
