//! HTTP transport for GraphQL requests.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Request body sent to the GraphQL endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
}

/// Raw HTTP reply; classification happens in the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure below the HTTP status layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Sends one GraphQL request and returns whatever came back.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn send(
        &self,
        request: &GraphqlRequest<'_>,
        credential: &str,
    ) -> std::result::Result<HttpReply, TransportError>;
}

/// `reqwest` transport. The client (and its connection pool) lives as long
/// as the transport, so one transport per collection run means one session.
pub struct ReqwestTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl ReqwestTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &GraphqlRequest<'_>,
        credential: &str,
    ) -> std::result::Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let variables = serde_json::json!({"pagination": {"currentPage": 2}});
        let request = GraphqlRequest {
            query: "query { ping }",
            variables: &variables,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["query"], "query { ping }");
        assert_eq!(body["variables"]["pagination"]["currentPage"], 2);
    }

    #[test]
    fn test_reply_success_range() {
        assert!(HttpReply::new(200, "").is_success());
        assert!(HttpReply::new(204, "").is_success());
        assert!(!HttpReply::new(429, "").is_success());
        assert!(!HttpReply::new(503, "").is_success());
    }
}
