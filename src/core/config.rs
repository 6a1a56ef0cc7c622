use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FundConfig {
    pub reference_asset: String,
    pub reference_decimals: u32,
    pub share_token: String,
    pub owner: String,
    pub management_fee_bps: u32,
    pub redemption_fee_bps: u32,
    /// Minimum accepted deposit, in reference base units.
    pub min_investment: u128,
    pub max_slippage_bps: u32,
    /// Rate cache freshness window, in minutes.
    pub freshness_minutes: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BasketAssetConfig {
    pub identifier: String,
    pub allocation_bps: u32,
    pub decimals: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub feed: Option<FeedProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            feed: Some(FeedProviderConfig {
                base_url: "https://rates.mfc.example".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub fund: FundConfig,
    pub basket: Vec<BasketAssetConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "mfc", "mfc")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
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
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.fund.reference_asset, "USDQ");
        assert_eq!(config.fund.reference_decimals, 6);
        assert_eq!(config.fund.management_fee_bps, 200);
        assert_eq!(config.fund.min_investment, 100_000_000);
        assert_eq!(config.basket.len(), 2);
        assert_eq!(config.basket[0].identifier, "WBTC");
        assert_eq!(config.basket[0].allocation_bps, 1250);
        assert_eq!(config.basket[1].decimals, 18);
        // providers default in when omitted
        assert_eq!(
            config.providers.feed.unwrap().base_url,
            "https://rates.mfc.example"
        );

        let yaml_str_with_providers = format!(
            "{yaml_str}providers:\n  feed:\n    base_url: \"http://example.com/feed\"\n"
        );
        let config: AppConfig =
            serde_yaml::from_str(&yaml_str_with_providers).expect("Failed to deserialize");
        assert_eq!(
            config.providers.feed.unwrap().base_url,
            "http://example.com/feed"
        );
    }
}
