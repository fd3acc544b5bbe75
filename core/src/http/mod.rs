pub mod client;

pub use client::HttpClient;

use async_trait::async_trait;
use thiserror::Error;

/// A response that made it back from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub body: String,
}

impl FetchedResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Failure to obtain a response at all: DNS, connect, TLS, timeout,
/// malformed URL, or a body that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}")]
pub struct TransportError {
    description: String,
}

impl TransportError {
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into() }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(describe_chain(&err))
    }
}

/// Flattens an error and its sources into one line, skipping causes whose
/// text is already part of the message.
fn describe_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Request/response capability used by the prober. One call is one GET.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedResponse, TransportError>;
}
