//! # StockWatch Probe
//! Fetches a product page over HTTP and extracts name, price, and
//! availability.

pub mod extract;

use async_trait::async_trait;
use std::time::Duration;
use stockwatch_core::config::ProbeConfig;
use stockwatch_core::error::{Result, StockWatchError};
use stockwatch_core::traits::Prober;
use stockwatch_core::types::ProbeResult;

pub use extract::extract_product;

/// HTTP prober. One GET per probe, no retries.
pub struct HttpProber {
    client: reqwest::Client,
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| StockWatchError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Fetch the page body. Anything but `200 OK` is a failure.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                StockWatchError::Timeout(format!("{url}: {e}"))
            } else {
                StockWatchError::Http(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(StockWatchError::ProbeStatus(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| StockWatchError::probe(format!("Unreadable body from {url}: {e}")))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, resource: &str) -> Result<ProbeResult> {
        let body = self.fetch(resource).await?;
        let result = extract_product(&body, &self.config.price_suffix);
        tracing::trace!(
            "Probed {resource}: {} / {} / in_stock={}",
            result.display_name,
            result.price,
            result.in_stock
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober() -> HttpProber {
        HttpProber::new(ProbeConfig { timeout_secs: 5, ..ProbeConfig::default() }).unwrap()
    }

    #[tokio::test]
    async fn test_probe_parses_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/item")
            .match_header("user-agent", mockito::Matcher::Regex("Mozilla".into()))
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(
                r#"<h1 class="nom-name">Rose</h1>
                   <meta itemprop="price" content="990">
                   <meta itemprop="availability" content="InStock">"#,
            )
            .create_async()
            .await;

        let result = prober().probe(&format!("{}/item", server.url())).await.unwrap();
        assert_eq!(result.display_name, "Rose");
        assert_eq!(result.price, "990 ₽");
        assert!(result.in_stock);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/gone").with_status(404).create_async().await;

        let err = prober().probe(&format!("{}/gone", server.url())).await.unwrap_err();
        assert!(matches!(err, StockWatchError::ProbeStatus(404)));
        assert!(err.is_probe_failure());
    }

    #[tokio::test]
    async fn test_connection_error_is_failure() {
        // Port 9 (discard) on localhost is normally closed.
        let err = prober().probe("http://127.0.0.1:9/item").await.unwrap_err();
        assert!(err.is_probe_failure());
    }
}
