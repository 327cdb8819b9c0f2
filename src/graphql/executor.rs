//! GraphQL Request Executor
//!
//! Issues one GraphQL request, classifies the reply and retries transient
//! failures with bounded exponential backoff.

use crate::graphql::retry::RetryPolicy;
use crate::graphql::transport::{GraphqlRequest, GraphqlTransport, HttpReply, TransportError};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Classification of a single request/reply exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Decoded payload without an error list.
    Success(Value),
    /// Worth retrying: transport failure, non-2xx status or unreadable body.
    Transient { status: Option<u16>, reason: String },
    /// The server rejected the query itself.
    Fatal(Vec<String>),
}

/// Terminal result of [`GraphqlExecutor::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    FatalError(Vec<String>),
    Exhausted { attempts: u32 },
    Cancelled,
}

/// Classify one exchange. Pure and deterministic for a given reply.
pub fn classify(reply: std::result::Result<&HttpReply, &TransportError>) -> Classification {
    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            return Classification::Transient {
                status: None,
                reason: e.to_string(),
            }
        }
    };

    if !reply.is_success() {
        return Classification::Transient {
            status: Some(reply.status),
            reason: format!("HTTP status {}: {}", reply.status, truncate(&reply.body, 512)),
        };
    }

    let payload: Value = match serde_json::from_str(&reply.body) {
        Ok(payload) => payload,
        Err(e) => {
            return Classification::Transient {
                status: Some(reply.status),
                reason: format!("Undecodable response body: {}", e),
            }
        }
    };

    match payload.get("errors") {
        None | Some(Value::Null) => Classification::Success(payload),
        Some(Value::Array(items)) if items.is_empty() => Classification::Success(payload),
        Some(errors) => Classification::Fatal(error_messages(errors)),
    }
}

fn error_messages(errors: &Value) -> Vec<String> {
    match errors {
        Value::Array(items) => items.iter().map(error_message).collect(),
        other => vec![error_message(other)],
    }
}

fn error_message(item: &Value) -> String {
    item.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| item.to_string())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Executes GraphQL requests with retry.
pub struct GraphqlExecutor {
    transport: Arc<dyn GraphqlTransport>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl GraphqlExecutor {
    pub fn new(transport: Arc<dyn GraphqlTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an external stop signal with this executor.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run one request to a terminal outcome.
    pub async fn execute(&self, query: &str, variables: &Value, credential: &str) -> Outcome {
        let request = GraphqlRequest { query, variables };
        let mut retry: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            debug!(attempt = retry + 1, "Sending GraphQL request");
            let reply = self.transport.send(&request, credential).await;

            match classify(reply.as_ref()) {
                Classification::Success(payload) => {
                    debug!(attempt = retry + 1, "GraphQL request succeeded");
                    return Outcome::Success(payload);
                }
                Classification::Fatal(messages) => {
                    error!(errors = ?messages, "GraphQL errors in response");
                    return Outcome::FatalError(messages);
                }
                Classification::Transient { status, reason } => {
                    retry += 1;
                    let Some(delay) = self.policy.delay_for(retry) else {
                        warn!(attempts = retry, status = ?status, %reason, "Max retry attempts reached");
                        return Outcome::Exhausted { attempts: retry };
                    };

                    warn!(
                        attempt = retry,
                        status = ?status,
                        backoff_ms = delay.as_millis() as u64,
                        %reason,
                        "Request failed, retrying in {:?}",
                        delay
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Outcome::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
