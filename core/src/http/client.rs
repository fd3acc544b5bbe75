use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, ClientBuilder, Proxy};
use url::Url;

use super::{FetchedResponse, Transport, TransportError};

/// Shared reqwest-backed transport. Cloning the inner client is cheap and
/// all workers share one connection pool.
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Builds the client. `timeout` of `None` leaves reqwest's default (no
    /// overall request timeout) in place.
    pub fn new(timeout: Option<Duration>, proxy_url: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = ClientBuilder::new();

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy) = proxy_url {
            let proxy = Proxy::all(proxy).with_context(|| format!("invalid proxy URL '{}'", proxy))?;
            builder = builder.proxy(proxy);
        }

        let inner = builder.build().context("failed to build HTTP client")?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: &str) -> Result<FetchedResponse, TransportError> {
        let parsed = Url::parse(url)
            .map_err(|e| TransportError::new(format!("invalid URL '{}': {}", url, e)))?;

        let response = self.inner.get(parsed).send().await?;
        let status = response.status().as_u16();
        debug!("GET {} -> {}", url, status);

        let body = response.text().await?;
        Ok(FetchedResponse { status, body })
    }
}
