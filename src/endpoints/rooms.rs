use serde_json::Value;

use super::segment;
use crate::client::StatsClient;
use crate::error::Result;
use crate::models::{ListQuery, RequestOptions};

pub struct Rooms<'a> {
    pub(crate) client: &'a StatsClient,
}

impl Rooms<'_> {
    pub async fn list(&self, query: &ListQuery) -> Result<Value> {
        self.client
            .request("/rooms", RequestOptions::get().query(query))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.client
            .request(&format!("/rooms/{}", segment(id)), RequestOptions::get())
            .await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Value> {
        self.client
            .request(&format!("/rooms/slug/{}", segment(slug)), RequestOptions::get())
            .await
    }

    pub async fn get_recent_games(&self, id: &str, limit: Option<u32>) -> Result<Value> {
        self.client
            .request(
                &format!("/rooms/{}/games/recent", segment(id)),
                RequestOptions::get().param_opt("limit", limit),
            )
            .await
    }
}
