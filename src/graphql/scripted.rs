//! Transport that replays a fixed script of replies.

use crate::graphql::transport::{GraphqlRequest, GraphqlTransport, HttpReply, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    sent_at: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            sent_at: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.sent_at.lock().unwrap().len()
    }

    /// Time elapsed between consecutive requests.
    pub(crate) fn gaps(&self) -> Vec<Duration> {
        let sent_at = self.sent_at.lock().unwrap();
        sent_at.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl GraphqlTransport for ScriptedTransport {
    async fn send(
        &self,
        _request: &GraphqlRequest<'_>,
        _credential: &str,
    ) -> Result<HttpReply, TransportError> {
        self.sent_at.lock().unwrap().push(Instant::now());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("script exhausted".to_string())))
    }
}
