//! Swap-rate cache: freshness-checked conversion rates between the
//! reference asset and basket assets, plus slippage-bounded execution
//! against the external venue.
//!
//! Quotes never mutate balances; execution reports the realized output and
//! the ledger applies it. A stale or unavailable rate aborts before the
//! venue is touched, which in turn aborts the enclosing invest/redeem.

use crate::core::amount::{BPS_DENOM, mul_div_floor, pow10, rescale};
use crate::core::clock::Clock;
use crate::core::error::{LedgerError, LedgerResult};
use crate::core::price::PriceSource;
use crate::core::registry::BasketAsset;
use crate::core::venue::ExecutionVenue;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedRate {
    price: u128,
    decimals: u32,
    captured_at: DateTime<Utc>,
}

/// Snapshot of one cache entry, as reported to callers. Absence of an
/// entry means "never fetched", which is distinct from stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateStatus {
    pub price: u128,
    pub decimals: u32,
    pub captured_at: DateTime<Utc>,
    pub is_stale: bool,
}

pub struct SwapRateCache {
    source: Arc<dyn PriceSource>,
    venue: Arc<dyn ExecutionVenue>,
    clock: Arc<dyn Clock>,
    reference_asset: String,
    reference_decimals: u32,
    freshness: Duration,
    cache: Mutex<HashMap<String, CachedRate>>,
}

impl SwapRateCache {
    pub fn new(
        source: Arc<dyn PriceSource>,
        venue: Arc<dyn ExecutionVenue>,
        clock: Arc<dyn Clock>,
        reference_asset: &str,
        reference_decimals: u32,
        freshness: Duration,
    ) -> Self {
        Self {
            source,
            venue,
            clock,
            reference_asset: reference_asset.to_string(),
            reference_decimals,
            freshness,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn reference_asset(&self) -> &str {
        &self.reference_asset
    }

    /// Serves the cached rate when fresh, otherwise fetches and overwrites.
    async fn fresh_rate(&self, asset: &str) -> LedgerResult<CachedRate> {
        let now = self.clock.now();
        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.get(asset) {
            if now - entry.captured_at <= self.freshness {
                debug!(asset, "rate cache HIT");
                return Ok(entry.clone());
            }
            debug!(asset, "rate cache STALE");
        } else {
            debug!(asset, "rate cache MISS");
        }

        let point = self
            .source
            .get_price(asset)
            .await
            .map_err(|e| LedgerError::PriceUnavailable {
                asset: asset.to_string(),
                reason: e.to_string(),
            })?;
        if point.price == 0 {
            return Err(LedgerError::PriceUnavailable {
                asset: asset.to_string(),
                reason: "source returned a zero price".to_string(),
            });
        }
        let entry = CachedRate {
            price: point.price,
            decimals: point.decimals,
            captured_at: now,
        };
        cache.insert(asset.to_string(), entry.clone());
        Ok(entry)
    }

    fn to_asset_units(&self, rate: &CachedRate, asset: &BasketAsset, amount_in: u128) -> LedgerResult<u128> {
        // amount_ref / 10^rd whole units, divided by price / 10^pd ref per
        // whole asset, expressed in 10^ad asset base units
        let numerator_scale = pow10(rate.decimals + asset.decimals);
        let denominator = rate
            .price
            .checked_mul(pow10(self.reference_decimals))
            .ok_or(LedgerError::AmountOverflow)?;
        mul_div_floor(amount_in, numerator_scale, denominator)
    }

    fn to_reference_units(&self, rate: &CachedRate, asset: &BasketAsset, amount_in: u128) -> LedgerResult<u128> {
        let value = mul_div_floor(amount_in, rate.price, pow10(rate.decimals))?;
        rescale(value, asset.decimals, self.reference_decimals)
    }

    /// Quotes how many base units of `asset` the given reference amount
    /// buys at the current rate. Pure with respect to balances.
    pub async fn quote_to_asset(&self, asset: &BasketAsset, amount_in: u128) -> LedgerResult<u128> {
        let rate = self.fresh_rate(&asset.identifier).await?;
        self.to_asset_units(&rate, asset, amount_in)
    }

    /// Quotes the reference-asset value of the given amount of `asset`.
    pub async fn quote_to_reference(&self, asset: &BasketAsset, amount_in: u128) -> LedgerResult<u128> {
        let rate = self.fresh_rate(&asset.identifier).await?;
        self.to_reference_units(&rate, asset, amount_in)
    }

    /// Reports the most recently captured rate for `asset`, or `None` if a
    /// rate was never fetched.
    pub async fn cached_rate(&self, asset: &str) -> Option<RateStatus> {
        let cache = self.cache.lock().await;
        cache.get(asset).map(|entry| RateStatus {
            price: entry.price,
            decimals: entry.decimals,
            captured_at: entry.captured_at,
            is_stale: self.clock.now() - entry.captured_at > self.freshness,
        })
    }

    /// Force-fetches a new rate and overwrites the cache entry.
    pub async fn refresh(&self, asset: &str) -> LedgerResult<()> {
        let point = self
            .source
            .get_price(asset)
            .await
            .map_err(|e| LedgerError::PriceUnavailable {
                asset: asset.to_string(),
                reason: e.to_string(),
            })?;
        let mut cache = self.cache.lock().await;
        cache.insert(
            asset.to_string(),
            CachedRate {
                price: point.price,
                decimals: point.decimals,
                captured_at: self.clock.now(),
            },
        );
        Ok(())
    }

    /// Drops the cache entry for `asset` entirely.
    pub async fn clear(&self, asset: &str) {
        let mut cache = self.cache.lock().await;
        cache.remove(asset);
    }

    /// Swaps reference asset into `asset` at the venue and accepts the
    /// realized output only if it lands within `max_slippage_bps` of the
    /// quote computed at call time.
    pub async fn execute_to_asset(
        &self,
        asset: &BasketAsset,
        amount_in: u128,
        max_slippage_bps: u32,
    ) -> LedgerResult<u128> {
        let rate = self.fresh_rate(&asset.identifier).await?;
        let quoted = self.to_asset_units(&rate, asset, amount_in)?;
        let realized = self
            .venue
            .swap(&self.reference_asset, &asset.identifier, amount_in)
            .await
            .map_err(|e| LedgerError::TransferFailed(format!(
                "venue swap into {} failed: {e}",
                asset.identifier
            )))?;
        self.check_slippage(&asset.identifier, quoted, realized, max_slippage_bps)?;
        Ok(realized)
    }

    /// Mirror of [`execute_to_asset`]: sells `asset` back into the
    /// reference asset.
    pub async fn execute_to_reference(
        &self,
        asset: &BasketAsset,
        amount_in: u128,
        max_slippage_bps: u32,
    ) -> LedgerResult<u128> {
        let rate = self.fresh_rate(&asset.identifier).await?;
        let quoted = self.to_reference_units(&rate, asset, amount_in)?;
        let realized = self
            .venue
            .swap(&asset.identifier, &self.reference_asset, amount_in)
            .await
            .map_err(|e| LedgerError::TransferFailed(format!(
                "venue swap out of {} failed: {e}",
                asset.identifier
            )))?;
        self.check_slippage(&asset.identifier, quoted, realized, max_slippage_bps)?;
        Ok(realized)
    }

    fn check_slippage(
        &self,
        asset: &str,
        quoted: u128,
        realized: u128,
        max_slippage_bps: u32,
    ) -> LedgerResult<()> {
        let deviation = quoted
            .abs_diff(realized)
            .checked_mul(BPS_DENOM)
            .ok_or(LedgerError::AmountOverflow)?;
        let tolerance = quoted
            .checked_mul(max_slippage_bps as u128)
            .ok_or(LedgerError::AmountOverflow)?;
        if deviation > tolerance {
            debug!(asset, quoted, realized, max_slippage_bps, "slippage bound hit");
            return Err(LedgerError::SlippageExceeded {
                asset: asset.to_string(),
                quoted,
                realized,
            });
        }
        Ok(())
    }
}
