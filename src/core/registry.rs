//! Basket registry: the ordered set of supported assets and their target
//! allocation weights.

use crate::core::amount::BPS_DENOM;
use crate::core::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketAsset {
    pub identifier: String,
    pub target_allocation_bps: u32,
    pub decimals: u32,
}

/// Ordered set of basket assets. Insertion order is observable: invest and
/// redeem iterate it so that settlement legs execute in a reproducible
/// order. Allocations may not total more than 10000 bps; the remainder is held as
/// reference asset.
#[derive(Debug, Clone, Default)]
pub struct BasketRegistry {
    assets: Vec<BasketAsset>,
}

impl BasketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_asset(
        &mut self,
        identifier: &str,
        target_allocation_bps: u32,
        decimals: u32,
    ) -> LedgerResult<()> {
        if identifier.is_empty() {
            return Err(LedgerError::InvalidAsset(identifier.to_string()));
        }
        if self.assets.iter().any(|a| a.identifier == identifier) {
            return Err(LedgerError::InvalidAsset(identifier.to_string()));
        }
        // per-asset cap before the running total, so the sum stays in range
        if target_allocation_bps as u128 > BPS_DENOM {
            return Err(LedgerError::InvalidAsset(identifier.to_string()));
        }
        let total = self.total_allocation_bps() + target_allocation_bps;
        if total as u128 > BPS_DENOM {
            return Err(LedgerError::AllocationExceeded { total_bps: total });
        }
        self.assets.push(BasketAsset {
            identifier: identifier.to_string(),
            target_allocation_bps,
            decimals,
        });
        info!(identifier, target_allocation_bps, "basket asset registered");
        Ok(())
    }

    pub fn set_allocation(&mut self, identifier: &str, target_allocation_bps: u32) -> LedgerResult<()> {
        if target_allocation_bps as u128 > BPS_DENOM {
            return Err(LedgerError::InvalidAsset(identifier.to_string()));
        }
        let current = self
            .assets
            .iter()
            .find(|a| a.identifier == identifier)
            .ok_or_else(|| LedgerError::InvalidAsset(identifier.to_string()))?
            .target_allocation_bps;
        let total = self.total_allocation_bps() - current + target_allocation_bps;
        if total as u128 > BPS_DENOM {
            return Err(LedgerError::AllocationExceeded { total_bps: total });
        }
        for asset in &mut self.assets {
            if asset.identifier == identifier {
                asset.target_allocation_bps = target_allocation_bps;
            }
        }
        Ok(())
    }

    pub fn assets(&self) -> &[BasketAsset] {
        &self.assets
    }

    pub fn get(&self, identifier: &str) -> Option<&BasketAsset> {
        self.assets.iter().find(|a| a.identifier == identifier)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn total_allocation_bps(&self) -> u32 {
        self.assets.iter().map(|a| a.target_allocation_bps).sum()
    }

    /// Share of the fund implicitly held as reference asset.
    pub fn reference_remainder_bps(&self) -> u32 {
        BPS_DENOM as u32 - self.total_allocation_bps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_asset_preserves_order() {
        let mut registry = BasketRegistry::new();
        registry.add_asset("WBTC", 1250, 8).unwrap();
        registry.add_asset("WETH", 1250, 18).unwrap();
        registry.add_asset("LINK", 1250, 18).unwrap();

        let ids: Vec<_> = registry.assets().iter().map(|a| a.identifier.as_str()).collect();
        assert_eq!(ids, vec!["WBTC", "WETH", "LINK"]);
        assert_eq!(registry.total_allocation_bps(), 3750);
        assert_eq!(registry.reference_remainder_bps(), 6250);
    }

    #[test]
    fn test_add_asset_rejects_empty_and_duplicate() {
        let mut registry = BasketRegistry::new();
        assert_eq!(
            registry.add_asset("", 100, 6).unwrap_err(),
            LedgerError::InvalidAsset(String::new())
        );
        registry.add_asset("WBTC", 1250, 8).unwrap();
        assert_eq!(
            registry.add_asset("WBTC", 100, 8).unwrap_err(),
            LedgerError::InvalidAsset("WBTC".to_string())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_allocation_cap_is_enforced() {
        let mut registry = BasketRegistry::new();
        registry.add_asset("WBTC", 6000, 8).unwrap();
        let err = registry.add_asset("WETH", 5000, 18).unwrap_err();
        assert_eq!(err, LedgerError::AllocationExceeded { total_bps: 11_000 });
        // rejected add leaves state unchanged
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_allocation_bps(), 6000);

        // exactly 10000 is fine
        registry.add_asset("WETH", 4000, 18).unwrap();
        assert_eq!(registry.reference_remainder_bps(), 0);
    }

    #[test]
    fn test_per_asset_bps_cap() {
        let mut registry = BasketRegistry::new();
        registry.add_asset("WBTC", 4000, 8).unwrap();

        // a huge weight is rejected up front instead of wrapping the total
        assert_eq!(
            registry.add_asset("WETH", u32::MAX, 18).unwrap_err(),
            LedgerError::InvalidAsset("WETH".to_string())
        );
        assert_eq!(
            registry.add_asset("WETH", 10_001, 18).unwrap_err(),
            LedgerError::InvalidAsset("WETH".to_string())
        );
        assert_eq!(
            registry.set_allocation("WBTC", u32::MAX).unwrap_err(),
            LedgerError::InvalidAsset("WBTC".to_string())
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_allocation_bps(), 4000);
    }

    #[test]
    fn test_set_allocation() {
        let mut registry = BasketRegistry::new();
        registry.add_asset("WBTC", 4000, 8).unwrap();
        registry.add_asset("WETH", 4000, 18).unwrap();

        registry.set_allocation("WBTC", 5000).unwrap();
        assert_eq!(registry.get("WBTC").unwrap().target_allocation_bps, 5000);

        let err = registry.set_allocation("WETH", 5001).unwrap_err();
        assert_eq!(err, LedgerError::AllocationExceeded { total_bps: 10_001 });
        assert_eq!(registry.get("WETH").unwrap().target_allocation_bps, 4000);

        assert_eq!(
            registry.set_allocation("DOGE", 1).unwrap_err(),
            LedgerError::InvalidAsset("DOGE".to_string())
        );
    }
}
