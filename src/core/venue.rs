//! Execution venue abstraction

use anyhow::Result;
use async_trait::async_trait;

/// An external venue that exchanges `amount_in` base units of `asset_in`
/// for `asset_out` and reports the realized output. The realized rate may
/// differ from what the price source implies; settlement bounds that gap
/// with a slippage tolerance.
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    async fn swap(&self, asset_in: &str, asset_out: &str, amount_in: u128) -> Result<u128>;
}
