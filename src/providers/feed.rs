use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::price::{PricePoint, PriceSource};

/// HTTP price-feed client. The feed serves integer prices in reference
/// terms together with their decimal scale; the swap-rate cache layered
/// above handles freshness, so this client performs no caching itself.
pub struct HttpPriceFeed {
    base_url: String,
}

impl HttpPriceFeed {
    pub fn new(base_url: &str) -> Self {
        HttpPriceFeed {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct FeedPriceResponse {
    price: u64,
    decimals: u32,
    timestamp: i64,
}

#[async_trait]
impl PriceSource for HttpPriceFeed {
    #[instrument(
        name = "FeedPriceFetch",
        skip(self),
        fields(asset = %asset)
    )]
    async fn get_price(&self, asset: &str) -> Result<PricePoint> {
        let url = format!("{}/v1/prices/{}", self.base_url, asset);
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder().user_agent("mfc/0.1").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for asset: {} URL: {}", e, asset, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for asset: {}",
                response.status(),
                asset
            ));
        }

        let text = response.text().await?;
        let data: FeedPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", asset, e))?;

        let timestamp = Utc
            .timestamp_opt(data.timestamp, 0)
            .single()
            .ok_or_else(|| anyhow!("Invalid timestamp in feed response for {}", asset))?;

        Ok(PricePoint {
            price: data.price as u128,
            decimals: data.decimals,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(asset: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v1/prices/{asset}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let mock_response = r#"{
            "price": 5000000000000,
            "decimals": 8,
            "timestamp": 1724500000
        }"#;

        let mock_server = create_mock_server("WBTC", mock_response).await;
        let provider = HttpPriceFeed::new(&mock_server.uri());

        let result = provider.get_price("WBTC").await.unwrap();
        assert_eq!(result.price, 5_000_000_000_000);
        assert_eq!(result.decimals, 8);
        assert_eq!(result.timestamp.timestamp(), 1_724_500_000);
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/prices/WBTC"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = HttpPriceFeed::new(&mock_server.uri());
        let result = provider.get_price("WBTC").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for asset: WBTC"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"value": 42}"#;
        let mock_server = create_mock_server("WBTC", mock_response).await;
        let provider = HttpPriceFeed::new(&mock_server.uri());

        let result = provider.get_price("WBTC").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for WBTC")
        );
    }

    #[tokio::test]
    async fn test_unknown_asset_is_an_error() {
        let mock_server = MockServer::start().await;
        let provider = HttpPriceFeed::new(&mock_server.uri());
        // no mock mounted: wiremock answers 404
        let result = provider.get_price("DOGE").await;
        assert!(result.is_err());
    }
}
