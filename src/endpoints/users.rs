use serde_json::Value;

use super::segment;
use crate::client::StatsClient;
use crate::error::Result;
use crate::models::{ActiveUserStats, RequestOptions};

pub struct Users<'a> {
    pub(crate) client: &'a StatsClient,
}

impl Users<'_> {
    pub async fn get(&self, id: &str) -> Result<Value> {
        self.client
            .request(&format!("/users/{}", segment(id)), RequestOptions::get())
            .await
    }

    // {activeUserCount}
    pub async fn get_stats(&self) -> Result<ActiveUserStats> {
        self.client
            .request_as("/users/stats", RequestOptions::get())
            .await
    }
}
