//! GraphQL request execution
//!
//! Transport, retry policy and the request executor used by the collector.

pub mod executor;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod scripted;

pub use executor::{classify, Classification, GraphqlExecutor, Outcome};
pub use retry::RetryPolicy;
pub use transport::{GraphqlRequest, GraphqlTransport, HttpReply, ReqwestTransport, TransportError};
