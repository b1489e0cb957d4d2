//! Test doubles: a controllable clock and a scripted transport.
//!
//! Compiled for this crate's own tests and with the `test-helpers` feature.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.current.lock().expect("mock clock poisoned");
        *now += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock().expect("mock clock poisoned")
    }
}

// One scripted answer
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    Error(TransportError),
    // wait on the tokio clock, then answer
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        MockReply::Response(HttpResponse::new(status, body.to_string()))
    }

    pub fn status(status: u16) -> Self {
        MockReply::Response(HttpResponse::new(status, Vec::new()))
    }
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    seen: Vec<HttpRequest>,
}

/// Transport that answers from a queue of [`MockReply`]s and records every
/// request it receives. Once the queue is empty the fallback reply (if any) is
/// repeated; with no fallback it answers 599.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: MockReply) -> &Self {
        self.lock().queue.push_back(reply);
        self
    }

    pub fn always(&self, reply: MockReply) -> &Self {
        self.lock().fallback = Some(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().seen.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("mock transport poisoned")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = {
            let mut script = self.lock();
            script.seen.push(request);
            script
                .queue
                .pop_front()
                .or_else(|| script.fallback.clone())
                .unwrap_or_else(|| MockReply::status(599))
        };

        let mut reply = reply;
        loop {
            match reply {
                MockReply::Response(res) => return Ok(res),
                MockReply::Error(err) => return Err(err),
                MockReply::Delayed(wait, inner) => {
                    tokio::time::sleep(wait).await;
                    reply = *inner;
                }
            }
        }
    }
}
