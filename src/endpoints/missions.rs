use serde_json::Value;

use super::segment;
use crate::client::StatsClient;
use crate::error::Result;
use crate::models::{ListQuery, RequestOptions};

pub struct Missions<'a> {
    pub(crate) client: &'a StatsClient,
}

impl Missions<'_> {
    pub async fn list(&self, query: &ListQuery) -> Result<Value> {
        self.client
            .request("/missions", RequestOptions::get().query(query))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value> {
        self.client
            .request(&format!("/missions/{}", segment(id)), RequestOptions::get())
            .await
    }

    pub async fn get_by_room(&self, room_id: &str, query: &ListQuery) -> Result<Value> {
        self.client
            .request(
                &format!("/rooms/{}/missions", segment(room_id)),
                RequestOptions::get().query(query),
            )
            .await
    }

    pub async fn get_leaderboard(&self, id: &str, limit: Option<u32>) -> Result<Value> {
        self.client
            .request(
                &format!("/missions/{}/leaderboard", segment(id)),
                RequestOptions::get().param_opt("limit", limit),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::endpoints::testing::{client, last_url};
    use crate::models::ListQuery;

    #[tokio::test(start_paused = true)]
    async fn paths() {
        let (client, transport) = client();

        client.missions().get_by_room("7", &ListQuery::new()).await.unwrap();
        assert_eq!(last_url(&transport), "https://api.test/rooms/7/missions");

        client.missions().get_leaderboard("m1", Some(25)).await.unwrap();
        assert_eq!(last_url(&transport), "https://api.test/missions/m1/leaderboard?limit=25");
    }
}
