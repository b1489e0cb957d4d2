use serde_json::Value;

use crate::client::StatsClient;
use crate::error::Result;
use crate::models::RequestOptions;

pub struct System<'a> {
    pub(crate) client: &'a StatsClient,
}

impl System<'_> {
    // always live
    pub async fn health(&self) -> Result<Value> {
        self.client
            .request("/health", RequestOptions::get().no_cache())
            .await
    }

    pub async fn get_features(&self) -> Result<Value> {
        self.client
            .request("/features", RequestOptions::get())
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::endpoints::testing::{client, last_url};

    #[tokio::test(start_paused = true)]
    async fn health_is_never_cached() {
        let (client, transport) = client();

        client.system().health().await.unwrap();
        client.system().health().await.unwrap();
        assert_eq!(transport.calls(), 2);

        client.system().get_features().await.unwrap();
        client.system().get_features().await.unwrap();
        assert_eq!(transport.calls(), 3);
        assert_eq!(last_url(&transport), "https://api.test/features");

        client.content().get_livestreams().await.unwrap();
        assert_eq!(last_url(&transport), "https://api.test/content/livestreams");
    }
}
