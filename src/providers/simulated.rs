//! Deterministic in-memory providers.
//!
//! `FixedPriceSource` and `SpotVenue` stand in for the external feed and
//! execution venue in the test suite and the `simulate` command: prices
//! are whatever the caller sets, and the venue fills at the posted price
//! minus an optional skid.

use crate::core::amount::{apply_bps, mul_div_floor, pow10};
use crate::core::clock::Clock;
use crate::core::price::{PricePoint, PriceSource};
use crate::core::venue::ExecutionVenue;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub struct FixedPriceSource {
    clock: Arc<dyn Clock>,
    prices: Mutex<HashMap<String, (u128, u32)>>,
}

impl FixedPriceSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            prices: Mutex::new(HashMap::new()),
        }
    }

    /// Posts a price in reference terms, scaled by `decimals`.
    pub fn set_price(&self, asset: &str, price: u128, decimals: u32) {
        self.prices
            .lock()
            .unwrap()
            .insert(asset.to_string(), (price, decimals));
    }

    pub fn remove_price(&self, asset: &str) {
        self.prices.lock().unwrap().remove(asset);
    }

    fn price_of(&self, asset: &str) -> Result<(u128, u32)> {
        self.prices
            .lock()
            .unwrap()
            .get(asset)
            .copied()
            .ok_or_else(|| anyhow!("no price configured for {asset}"))
    }
}

#[async_trait]
impl PriceSource for FixedPriceSource {
    async fn get_price(&self, asset: &str) -> Result<PricePoint> {
        let (price, decimals) = self.price_of(asset)?;
        Ok(PricePoint {
            price,
            decimals,
            timestamp: self.clock.now(),
        })
    }
}

/// Fills every order at the posted source price, shaved by `skid_bps`
/// against the taker. `fail_next_swaps(true)` turns the venue off, which
/// tests use to exercise all-or-nothing settlement.
pub struct SpotVenue {
    source: Arc<FixedPriceSource>,
    reference_asset: String,
    reference_decimals: u32,
    asset_decimals: Mutex<HashMap<String, u32>>,
    skid_bps: AtomicU32,
    fail: AtomicBool,
}

impl SpotVenue {
    pub fn new(source: Arc<FixedPriceSource>, reference_asset: &str, reference_decimals: u32) -> Self {
        Self {
            source,
            reference_asset: reference_asset.to_string(),
            reference_decimals,
            asset_decimals: Mutex::new(HashMap::new()),
            skid_bps: AtomicU32::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// The venue needs each asset's own decimal count to express fills.
    pub fn register_asset(&self, asset: &str, decimals: u32) {
        self.asset_decimals
            .lock()
            .unwrap()
            .insert(asset.to_string(), decimals);
    }

    pub fn set_skid_bps(&self, bps: u32) {
        self.skid_bps.store(bps, Ordering::SeqCst);
    }

    pub fn fail_next_swaps(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn decimals_of(&self, asset: &str) -> Result<u32> {
        self.asset_decimals
            .lock()
            .unwrap()
            .get(asset)
            .copied()
            .ok_or_else(|| anyhow!("asset {asset} is not listed at this venue"))
    }
}

#[async_trait]
impl ExecutionVenue for SpotVenue {
    async fn swap(&self, asset_in: &str, asset_out: &str, amount_in: u128) -> Result<u128> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("venue rejected the order"));
        }

        let fair = if asset_in == self.reference_asset {
            let (price, price_decimals) = self.source.price_of(asset_out)?;
            let decimals = self.decimals_of(asset_out)?;
            mul_div_floor(
                amount_in,
                pow10(price_decimals + decimals),
                price
                    .checked_mul(pow10(self.reference_decimals))
                    .ok_or_else(|| anyhow!("price scale overflow for {asset_out}"))?,
            )?
        } else {
            let (price, price_decimals) = self.source.price_of(asset_in)?;
            let decimals = self.decimals_of(asset_in)?;
            let scaled = mul_div_floor(amount_in, price, pow10(price_decimals))?;
            mul_div_floor(scaled, pow10(self.reference_decimals), pow10(decimals))?
        };

        let skid = apply_bps(fair, self.skid_bps.load(Ordering::SeqCst))?;
        Ok(fair - skid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SystemClock;

    fn venue() -> (Arc<FixedPriceSource>, SpotVenue) {
        let source = Arc::new(FixedPriceSource::new(Arc::new(SystemClock)));
        // 1 WBTC = 50,000 USDQ at 8 price decimals
        source.set_price("WBTC", 50_000 * 100_000_000, 8);
        let venue = SpotVenue::new(Arc::clone(&source), "USDQ", 6);
        venue.register_asset("WBTC", 8);
        (source, venue)
    }

    #[tokio::test]
    async fn test_fills_both_directions_at_posted_price() {
        let (_, venue) = venue();
        // 50,000 USDQ buys 1 WBTC
        let out = venue.swap("USDQ", "WBTC", 50_000 * 1_000_000).await.unwrap();
        assert_eq!(out, 100_000_000);
        // and 1 WBTC sells for 50,000 USDQ
        let out = venue.swap("WBTC", "USDQ", 100_000_000).await.unwrap();
        assert_eq!(out, 50_000 * 1_000_000);
    }

    #[tokio::test]
    async fn test_skid_shaves_the_fill() {
        let (_, venue) = venue();
        venue.set_skid_bps(10);
        let out = venue.swap("USDQ", "WBTC", 50_000 * 1_000_000).await.unwrap();
        assert_eq!(out, 100_000_000 - 100_000);
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let (_, venue) = venue();
        venue.fail_next_swaps(true);
        assert!(venue.swap("USDQ", "WBTC", 1_000_000).await.is_err());
        venue.fail_next_swaps(false);
        assert!(venue.swap("USDQ", "WBTC", 1_000_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_unlisted_asset_is_rejected() {
        let (_, venue) = venue();
        assert!(venue.swap("USDQ", "DOGE", 1_000_000).await.is_err());
    }
}
