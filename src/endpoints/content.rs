use serde_json::Value;

use crate::client::StatsClient;
use crate::error::Result;
use crate::models::RequestOptions;

pub struct Content<'a> {
    pub(crate) client: &'a StatsClient,
}

impl Content<'_> {
    pub async fn get_banners(&self) -> Result<Value> {
        self.client
            .request("/content/banners", RequestOptions::get())
            .await
    }

    pub async fn get_livestreams(&self) -> Result<Value> {
        self.client
            .request("/content/livestreams", RequestOptions::get())
            .await
    }
}
