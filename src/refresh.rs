use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::client::StatsClient;
use crate::error::Result;

/// Periodic refetch for one widget.
///
/// Runs `fetch` right away and then on every tick, handing each result to
/// `on_result`. Stops on [`RefreshHandle::cancel`] or when the handle is dropped.
pub struct AutoRefresh;

#[must_use = "dropping the handle stops the refresh"]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl AutoRefresh {
    pub fn spawn<T, F, Fut, C>(
        client: StatsClient,
        every: Duration,
        fetch: F,
        mut on_result: C,
    ) -> RefreshHandle
    where
        T: Send + 'static,
        F: Fn(StatsClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        C: FnMut(Result<T>) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let result = fetch(client.clone()).await;
                if let Err(e) = &result {
                    debug!(code = %e.code(), "refresh failed");
                }
                on_result(result);
            }
        });

        RefreshHandle { task }
    }
}

impl RefreshHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::mocks::{MockClock, MockReply, MockTransport};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn refetches_on_every_tick_until_cancelled() {
        let transport = MockTransport::new();
        transport.always(MockReply::json(200, json!({"status": "ok"})));
        let client = StatsClient::with_parts(
            ClientConfig {
                base_url: "https://api.test".into(),
                ..ClientConfig::default()
            },
            Arc::new(transport.clone()),
            Arc::new(MockClock::default()),
        );

        let results: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = results.clone();
        let handle = AutoRefresh::spawn(
            client,
            Duration::from_secs(5),
            |client| async move { client.system().health().await },
            move |res| sink.lock().unwrap().push(res.unwrap()),
        );

        // immediate run plus ticks at 5s and 10s
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(results.lock().unwrap().len(), 3);
        assert!(handle.is_active());

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(results.lock().unwrap().len(), 3);
        assert_eq!(transport.calls(), 3);
        assert!(!handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_refetching() {
        let transport = MockTransport::new();
        transport.always(MockReply::json(200, json!({"status": "ok"})));
        let client = StatsClient::with_parts(
            ClientConfig {
                base_url: "https://api.test".into(),
                ..ClientConfig::default()
            },
            Arc::new(transport.clone()),
            Arc::new(MockClock::default()),
        );

        let handle = AutoRefresh::spawn(
            client,
            Duration::from_secs(5),
            |client| async move { client.system().health().await },
            |_res| {},
        );
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(transport.calls(), 2);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.calls(), 2);
    }
}
