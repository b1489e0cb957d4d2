use serde_json::Value;

use super::segment;
use crate::client::StatsClient;
use crate::error::Result;
use crate::models::{ListQuery, RequestOptions};

pub struct IGames<'a> {
    pub(crate) client: &'a StatsClient,
}

impl IGames<'_> {
    pub async fn list(&self, query: &ListQuery) -> Result<Value> {
        self.client
            .request("/igames", RequestOptions::get().query(query))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.client
            .request(&format!("/igames/{}", segment(id)), RequestOptions::get())
            .await
    }

    // provider filter replaces any equals filter already on the query
    pub async fn get_by_provider(&self, provider: &str, query: &ListQuery) -> Result<Value> {
        let query = query.clone().equals("provider", provider);
        self.list(&query).await
    }
}
