use serde_json::Value;
use std::time::Duration;

use crate::client::StatsClient;
use crate::error::Result;
use crate::models::{ListQuery, RequestOptions};

// bet feeds move fast, keep them fresher than the default
const FEED_CACHE: Duration = Duration::from_secs(10);

pub struct Bets<'a> {
    pub(crate) client: &'a StatsClient,
}

impl Bets<'_> {
    pub async fn get_big(&self, query: &ListQuery) -> Result<Value> {
        self.feed("/bets/big", query).await
    }

    pub async fn get_lucky(&self, query: &ListQuery) -> Result<Value> {
        self.feed("/bets/lucky", query).await
    }

    pub async fn get_recent(&self, query: &ListQuery) -> Result<Value> {
        self.feed("/bets/recent", query).await
    }

    pub async fn get_wins(&self, query: &ListQuery) -> Result<Value> {
        self.feed("/bets/wins", query).await
    }

    async fn feed(&self, path: &str, query: &ListQuery) -> Result<Value> {
        self.client
            .request(path, RequestOptions::get().query(query).cache_for(FEED_CACHE))
            .await
    }
}
