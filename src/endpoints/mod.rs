//! Endpoint groups, one per API resource.
//!
//! Each group borrows the client and maps a method onto a path plus options.
//! Bodies come back as `serde_json::Value`; the shape depends on the endpoint.

mod bets;
mod content;
mod igames;
mod missions;
mod rooms;
mod system;
mod users;

pub use bets::Bets;
pub use content::Content;
pub use igames::IGames;
pub use missions::Missions;
pub use rooms::Rooms;
pub use system::System;
pub use users::Users;

use crate::client::StatsClient;

impl StatsClient {
    pub fn rooms(&self) -> Rooms<'_> {
        Rooms { client: self }
    }

    pub fn users(&self) -> Users<'_> {
        Users { client: self }
    }

    pub fn igames(&self) -> IGames<'_> {
        IGames { client: self }
    }

    pub fn missions(&self) -> Missions<'_> {
        Missions { client: self }
    }

    pub fn bets(&self) -> Bets<'_> {
        Bets { client: self }
    }

    pub fn content(&self) -> Content<'_> {
        Content { client: self }
    }

    pub fn system(&self) -> System<'_> {
        System { client: self }
    }
}

// path segments come from callers, keep them from escaping the resource
pub(crate) fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::client::StatsClient;
    use crate::config::ClientConfig;
    use crate::mocks::{MockClock, MockReply, MockTransport};

    // client answering {} to everything, plus the transport to inspect
    pub fn client() -> (StatsClient, MockTransport) {
        let transport = MockTransport::new();
        transport.always(MockReply::json(200, serde_json::json!({})));
        let client = StatsClient::with_parts(
            ClientConfig {
                base_url: "https://api.test".into(),
                ..ClientConfig::default()
            },
            Arc::new(transport.clone()),
            Arc::new(MockClock::default()),
        );
        (client, transport)
    }

    pub fn last_url(transport: &MockTransport) -> String {
        transport
            .requests()
            .last()
            .map(|r| r.url.to_string())
            .unwrap_or_default()
    }
}
