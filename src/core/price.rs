//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time price for one asset, denominated in the reference
/// asset and scaled by `decimals`. Price feeds do not agree on decimal
/// counts (6, 8 and 18 all occur), so the scale travels with the value
/// and is normalized explicitly wherever prices are combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: u128,
    pub decimals: u32,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn get_price(&self, asset: &str) -> Result<PricePoint>;
}
