use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mounts a feed price for one asset on the mock server.
    pub async fn mount_price(server: &MockServer, asset: &str, price: u64, decimals: u32) {
        let body = format!(
            r#"{{"price": {price}, "decimals": {decimals}, "timestamp": {}}}"#,
            chrono::Utc::now().timestamp()
        );
        Mock::given(method("GET"))
            .and(path(format!("/v1/prices/{asset}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub fn config_yaml(feed_url: &str) -> String {
        format!(
            r#"
fund:
  reference_asset: "USDQ"
  reference_decimals: 6
  share_token: "MFC"
  owner: "fund-admin"
  management_fee_bps: 200
  redemption_fee_bps: 100
  min_investment: 100000000
  max_slippage_bps: 50
  freshness_minutes: 5
basket:
  - identifier: "WBTC"
    allocation_bps: 1250
    decimals: 8
  - identifier: "WETH"
    allocation_bps: 1250
    decimals: 18
  - identifier: "LINK"
    allocation_bps: 1250
    decimals: 18
  - identifier: "DOT"
    allocation_bps: 1250
    decimals: 10
providers:
  feed:
    base_url: {feed_url}
"#
        )
    }
}

#[test_log::test(tokio::test)]
async fn test_prices_command_with_feed_mock() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price(&mock_server, "WBTC", 5_000_000_000_000, 8).await;
    test_utils::mount_price(&mock_server, "WETH", 250_000_000_000, 8).await;
    test_utils::mount_price(&mock_server, "LINK", 2_500_000_000, 8).await;
    test_utils::mount_price(&mock_server, "DOT", 1_000_000_000, 8).await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        test_utils::config_yaml(&mock_server.uri()),
    )
    .expect("Failed to write config file");

    let result = mfc::run_command(
        mfc::AppCommand::Prices,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Prices command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_prices_command_fails_when_feed_is_down() {
    let mock_server = wiremock::MockServer::start().await;
    // only one of four assets is served
    test_utils::mount_price(&mock_server, "WBTC", 5_000_000_000_000, 8).await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        test_utils::config_yaml(&mock_server.uri()),
    )
    .expect("Failed to write config file");

    let result = mfc::run_command(
        mfc::AppCommand::Prices,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_full_simulation_flow() {
    // the simulate command runs initialize -> invest -> fee -> redeem
    // against in-memory providers; it exercises the whole settlement path
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        test_utils::config_yaml("http://unused.example"),
    )
    .expect("Failed to write config file");

    let result = mfc::run_command(
        mfc::AppCommand::Simulate,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Simulation failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_rate_cache_over_http_feed() {
    use chrono::Duration;
    use mfc::core::clock::SystemClock;
    use mfc::core::rates::SwapRateCache;
    use mfc::core::registry::BasketAsset;
    use mfc::core::venue::ExecutionVenue;
    use mfc::providers::feed::HttpPriceFeed;
    use std::sync::Arc;

    struct NoVenue;
    #[async_trait::async_trait]
    impl ExecutionVenue for NoVenue {
        async fn swap(&self, _: &str, _: &str, _: u128) -> anyhow::Result<u128> {
            anyhow::bail!("venue not under test")
        }
    }

    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_price(&mock_server, "WBTC", 5_000_000_000_000, 8).await;

    let cache = SwapRateCache::new(
        Arc::new(HttpPriceFeed::new(&mock_server.uri())),
        Arc::new(NoVenue),
        Arc::new(SystemClock),
        "USDQ",
        6,
        Duration::minutes(5),
    );

    let asset = BasketAsset {
        identifier: "WBTC".to_string(),
        target_allocation_bps: 1250,
        decimals: 8,
    };

    // never fetched yet
    assert!(cache.cached_rate("WBTC").await.is_none());

    // quoting 50,000 USDQ at a 50,000 price buys 1 WBTC
    let out = cache.quote_to_asset(&asset, 50_000_000_000).await.unwrap();
    info!(out, "quote through HTTP feed");
    assert_eq!(out, 100_000_000);

    let status = cache.cached_rate("WBTC").await.unwrap();
    assert!(!status.is_stale);
    assert_eq!(status.price, 5_000_000_000_000);

    // an unknown asset is a typed PriceUnavailable failure
    let missing = BasketAsset {
        identifier: "DOGE".to_string(),
        target_allocation_bps: 0,
        decimals: 8,
    };
    let err = cache.quote_to_asset(&missing, 1_000_000).await.unwrap_err();
    assert!(matches!(
        err,
        mfc::core::error::LedgerError::PriceUnavailable { .. }
    ));
}
