//! Fund ledger: NAV valuation, share bookkeeping, atomic multi-asset
//! settlement and management-fee accrual.
//!
//! The ledger is a single-writer state machine
//! (`Uninitialized → Active ⇄ Paused`); every mutating operation runs to
//! completion and is all-or-nothing. Venue results are staged in locals and
//! applied only after every leg has succeeded, so a failed leg leaves
//! balances and share supply exactly as they were. The one external effect
//! taken before staging completes is the deposit `transfer_from`, which is
//! refunded in full on any later failure.

use crate::core::amount::{apply_bps, mul_div_floor, pow10};
use crate::core::clock::Clock;
use crate::core::error::{LedgerError, LedgerResult};
use crate::core::rates::SwapRateCache;
use crate::core::registry::{BasketAsset, BasketRegistry};
use crate::core::tokens::{TokenBank, TokenError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// The fund accepts exactly one seed size, in whole reference units.
pub const SEED_WHOLE_UNITS: u128 = 1_000_000;
/// Shares minted to the owner at initialization, in whole shares.
pub const INITIAL_SHARE_WHOLE_UNITS: u128 = 1_000_000;
/// Share-token precision, independent of reference-asset decimals.
pub const SHARE_DECIMALS: u32 = 6;
/// Initialization requires the full intended basket to be registered.
pub const MIN_BASKET_ASSETS: usize = 4;

const SECONDS_PER_YEAR: u128 = 31_536_000;

/// Construction-time parameters. `management_fee_bps` is immutable for the
/// life of the fund.
#[derive(Debug, Clone)]
pub struct FundParams {
    pub reference_asset: String,
    pub reference_decimals: u32,
    pub share_token: String,
    pub owner: String,
    pub fund_account: String,
    pub management_fee_bps: u32,
    pub redemption_fee_bps: u32,
    pub min_investment: u128,
    pub max_slippage_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentReceipt {
    pub investor: String,
    pub amount_in: u128,
    pub shares_out: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionReceipt {
    pub investor: String,
    pub shares_in: u128,
    pub gross_proceeds: u128,
    pub fee: u128,
    pub net_out: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeReceipt {
    pub fee_shares: u128,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundStats {
    pub initialized: bool,
    pub paused: bool,
    pub total_shares: u128,
    pub initial_shares: u128,
    pub circulating_supply: u128,
    pub management_fee_bps: u32,
    pub redemption_fee_bps: u32,
    pub accumulated_fees: u128,
    pub last_fee_collection: DateTime<Utc>,
}

/// One basket position, for the read-only composition surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub asset: BasketAsset,
    pub balance: u128,
}

struct SettledLeg {
    asset: String,
    amount_in: u128,
    amount_out: u128,
}

pub struct FundLedger {
    params: FundParams,
    registry: BasketRegistry,
    rates: Arc<SwapRateCache>,
    tokens: Arc<dyn TokenBank>,
    clock: Arc<dyn Clock>,

    reference_balance: u128,
    basket_balances: HashMap<String, u128>,
    total_shares: u128,
    initial_shares: u128,
    initialized: bool,
    paused: bool,
    last_fee_collection: DateTime<Utc>,
    accumulated_fees: u128,
}

impl FundLedger {
    pub fn new(
        params: FundParams,
        rates: Arc<SwapRateCache>,
        tokens: Arc<dyn TokenBank>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            params,
            registry: BasketRegistry::new(),
            rates,
            tokens,
            clock,
            reference_balance: 0,
            basket_balances: HashMap::new(),
            total_shares: 0,
            initial_shares: 0,
            initialized: false,
            paused: false,
            last_fee_collection: now,
            accumulated_fees: 0,
        }
    }

    fn ensure_owner(&self, caller: &str) -> LedgerResult<()> {
        if caller != self.params.owner {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    fn ensure_active(&self) -> LedgerResult<()> {
        if !self.initialized {
            return Err(LedgerError::NotInitialized);
        }
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    fn share_scale(&self) -> u128 {
        pow10(SHARE_DECIMALS)
    }

    fn map_token_err(err: TokenError) -> LedgerError {
        match err {
            TokenError::InsufficientAllowance { .. } => LedgerError::InsufficientAllowance,
            other => LedgerError::TransferFailed(other.to_string()),
        }
    }

    /// Returns the deposit to `to` after a failed settlement and restores
    /// the allowance the pull consumed. The ledger has not been touched at
    /// this point, so post-failure state matches pre-deposit state.
    fn refund(&self, to: &str, amount: u128) {
        if let Err(e) = self.tokens.transfer(
            &self.params.reference_asset,
            &self.params.fund_account,
            to,
            amount,
        ) {
            error!(to, amount, %e, "refund after failed settlement did not complete");
            return;
        }
        let remaining =
            self.tokens
                .allowance(&self.params.reference_asset, to, &self.params.fund_account);
        self.tokens.approve(
            &self.params.reference_asset,
            to,
            &self.params.fund_account,
            remaining.saturating_add(amount),
        );
    }

    /// Buys basket assets with `amount` of reference asset, one leg per
    /// registered asset in registry order, proportional to target
    /// allocations. Nothing is applied to ledger state here.
    async fn stage_purchases(&self, amount: u128) -> LedgerResult<Vec<SettledLeg>> {
        let mut legs = Vec::new();
        for asset in self.registry.assets().to_vec() {
            let leg_in = apply_bps(amount, asset.target_allocation_bps)?;
            if leg_in == 0 {
                continue;
            }
            let leg_out = self
                .rates
                .execute_to_asset(&asset, leg_in, self.params.max_slippage_bps)
                .await?;
            legs.push(SettledLeg {
                asset: asset.identifier,
                amount_in: leg_in,
                amount_out: leg_out,
            });
        }
        Ok(legs)
    }

    /// Applies staged purchase legs: reference tokens leave the fund
    /// account toward the venue, basket balances grow.
    fn apply_purchases(&mut self, legs: &[SettledLeg]) -> LedgerResult<u128> {
        let deployed = legs.iter().map(|l| l.amount_in).sum::<u128>();
        self.tokens
            .burn(&self.params.reference_asset, &self.params.fund_account, deployed)
            .map_err(Self::map_token_err)?;
        for leg in legs {
            *self.basket_balances.entry(leg.asset.clone()).or_insert(0) += leg.amount_out;
        }
        Ok(deployed)
    }

    /// One-time initialization: seeds the fund, deploys the basket and
    /// mints the initial share supply to the owner.
    pub async fn initialize(&mut self, caller: &str, seed_amount: u128) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        if self.initialized {
            return Err(LedgerError::AlreadyInitialized);
        }
        if self.registry.len() < MIN_BASKET_ASSETS {
            return Err(LedgerError::BasketIncomplete {
                registered: self.registry.len(),
                required: MIN_BASKET_ASSETS,
            });
        }
        let expected = SEED_WHOLE_UNITS * pow10(self.params.reference_decimals);
        if seed_amount != expected {
            return Err(LedgerError::InvalidSeedAmount {
                expected,
                got: seed_amount,
            });
        }

        self.tokens
            .transfer_from(
                &self.params.reference_asset,
                &self.params.owner,
                &self.params.fund_account,
                &self.params.fund_account,
                seed_amount,
            )
            .map_err(Self::map_token_err)?;

        let legs = match self.stage_purchases(seed_amount).await {
            Ok(legs) => legs,
            Err(e) => {
                self.refund(&self.params.owner, seed_amount);
                return Err(e);
            }
        };
        let deployed = self.apply_purchases(&legs)?;
        self.reference_balance = seed_amount - deployed;

        self.initial_shares = INITIAL_SHARE_WHOLE_UNITS * self.share_scale();
        self.total_shares = self.initial_shares;
        self.tokens
            .mint(&self.params.share_token, &self.params.owner, self.initial_shares);
        self.initialized = true;
        self.last_fee_collection = self.clock.now();

        info!(
            seed_amount,
            deployed,
            initial_shares = self.initial_shares,
            "fund initialized"
        );
        Ok(())
    }

    /// Net asset value in reference base units:
    /// `reference_balance + Σ basket_balance_i × price_i`.
    pub async fn calculate_nav(&self) -> LedgerResult<u128> {
        if !self.initialized {
            return Err(LedgerError::NotInitialized);
        }
        let mut nav = self.reference_balance;
        for asset in self.registry.assets().to_vec() {
            let balance = *self.basket_balances.get(&asset.identifier).unwrap_or(&0);
            if balance == 0 {
                continue;
            }
            let value = self.rates.quote_to_reference(&asset, balance).await?;
            nav = nav.checked_add(value).ok_or(LedgerError::AmountOverflow)?;
        }
        Ok(nav)
    }

    /// Reference base units per whole share, floored so investors are
    /// never over-credited.
    pub async fn calculate_share_value(&self) -> LedgerResult<u128> {
        let nav = self.calculate_nav().await?;
        if self.total_shares == 0 {
            return Err(LedgerError::ZeroShareSupply);
        }
        mul_div_floor(nav, self.share_scale(), self.total_shares)
    }

    /// Shares a deposit of `amount` would mint right now. Pure.
    pub async fn preview_invest(&self, amount: u128) -> LedgerResult<u128> {
        let share_value = self.calculate_share_value().await?;
        if share_value == 0 {
            return Err(LedgerError::ZeroShareSupply);
        }
        mul_div_floor(amount, self.share_scale(), share_value)
    }

    /// Gross reference entitlement of `shares`, before the redemption fee.
    /// Pure.
    pub async fn preview_redeem(&self, shares: u128) -> LedgerResult<u128> {
        let share_value = self.calculate_share_value().await?;
        mul_div_floor(shares, share_value, self.share_scale())
    }

    /// Pulls a deposit from the investor, deploys it across the basket at
    /// target weights and mints shares at the pre-deposit share value.
    pub async fn invest(&mut self, investor: &str, amount: u128) -> LedgerResult<InvestmentReceipt> {
        self.ensure_active()?;
        if amount < self.params.min_investment {
            return Err(LedgerError::BelowMinimum {
                minimum: self.params.min_investment,
                got: amount,
            });
        }
        let shares_out = self.preview_invest(amount).await?;

        self.tokens
            .transfer_from(
                &self.params.reference_asset,
                investor,
                &self.params.fund_account,
                &self.params.fund_account,
                amount,
            )
            .map_err(Self::map_token_err)?;

        let legs = match self.stage_purchases(amount).await {
            Ok(legs) => legs,
            Err(e) => {
                self.refund(investor, amount);
                return Err(e);
            }
        };
        let deployed = self.apply_purchases(&legs)?;
        self.reference_balance += amount - deployed;
        self.total_shares += shares_out;
        self.tokens
            .mint(&self.params.share_token, investor, shares_out);

        info!(investor, amount_in = amount, shares_out, "investment settled");
        Ok(InvestmentReceipt {
            investor: investor.to_string(),
            amount_in: amount,
            shares_out,
        })
    }

    /// Burns `shares` and pays out the proportional entitlement: the
    /// reference share of NAV directly, the basket share by unwinding each
    /// position at the venue. A redemption fee in bps of the gross is
    /// retained by the fund.
    pub async fn redeem(&mut self, investor: &str, shares: u128) -> LedgerResult<RedemptionReceipt> {
        self.ensure_active()?;
        if shares == 0 {
            return Err(LedgerError::InvalidShareAmount);
        }
        let held = self.tokens.balance_of(&self.params.share_token, investor);
        if held < shares {
            return Err(LedgerError::InsufficientShares {
                available: held,
                requested: shares,
            });
        }

        // A single NAV read backs both the entitlement and the reference
        // split; a second read could see refreshed rates and size the split
        // past the held reference balance.
        let nav = self.calculate_nav().await?;
        if self.total_shares == 0 {
            return Err(LedgerError::ZeroShareSupply);
        }
        let share_value = mul_div_floor(nav, self.share_scale(), self.total_shares)?;
        let gross_entitlement = mul_div_floor(shares, share_value, self.share_scale())?;
        let reference_portion = mul_div_floor(gross_entitlement, self.reference_balance, nav)?;

        // Unwind the proportional slice of every position. Staged: nothing
        // below touches ledger state until all legs have settled.
        let mut legs = Vec::new();
        for asset in self.registry.assets().to_vec() {
            let balance = *self.basket_balances.get(&asset.identifier).unwrap_or(&0);
            if balance == 0 {
                continue;
            }
            let slice = mul_div_floor(balance, shares, self.total_shares)?;
            if slice == 0 {
                continue;
            }
            let proceeds = self
                .rates
                .execute_to_reference(&asset, slice, self.params.max_slippage_bps)
                .await?;
            legs.push(SettledLeg {
                asset: asset.identifier,
                amount_in: slice,
                amount_out: proceeds,
            });
        }

        let basket_proceeds = legs.iter().map(|l| l.amount_out).sum::<u128>();
        let gross_proceeds = reference_portion
            .checked_add(basket_proceeds)
            .ok_or(LedgerError::AmountOverflow)?;
        let fee = apply_bps(gross_proceeds, self.params.redemption_fee_bps)?;
        let net_out = gross_proceeds - fee;
        let next_reference_balance = self
            .reference_balance
            .checked_sub(reference_portion)
            .and_then(|v| v.checked_add(fee))
            .ok_or(LedgerError::AmountOverflow)?;

        self.tokens
            .burn(&self.params.share_token, investor, shares)
            .map_err(Self::map_token_err)?;
        self.total_shares -= shares;
        for leg in &legs {
            if let Some(balance) = self.basket_balances.get_mut(&leg.asset) {
                *balance -= leg.amount_in;
            }
        }
        // Basket proceeds arrive from the venue, the net leaves to the
        // investor, the fee stays in the fund.
        self.tokens.mint(
            &self.params.reference_asset,
            &self.params.fund_account,
            basket_proceeds,
        );
        self.reference_balance = next_reference_balance;
        self.tokens
            .transfer(
                &self.params.reference_asset,
                &self.params.fund_account,
                investor,
                net_out,
            )
            .map_err(Self::map_token_err)?;

        info!(investor, shares_in = shares, net_out, "redemption settled");
        Ok(RedemptionReceipt {
            investor: investor.to_string(),
            shares_in: shares,
            gross_proceeds,
            fee,
            net_out,
        })
    }

    /// Accrues the management fee since the last collection, annualized
    /// over elapsed seconds against circulating supply, and mints it in
    /// shares to the owner. A zero computed fee is a no-op that still
    /// advances the accrual window.
    pub fn collect_management_fee(&mut self, caller: &str) -> LedgerResult<FeeReceipt> {
        self.ensure_owner(caller)?;
        if !self.initialized {
            return Err(LedgerError::NotInitialized);
        }
        let now = self.clock.now();
        let elapsed = (now - self.last_fee_collection).num_seconds().max(0) as u128;
        let circulating = self.circulating_supply();

        let annual = mul_div_floor(
            circulating,
            self.params.management_fee_bps as u128,
            crate::core::amount::BPS_DENOM,
        )?;
        let fee_shares = mul_div_floor(annual, elapsed, SECONDS_PER_YEAR)?;

        if fee_shares > 0 {
            self.tokens
                .mint(&self.params.share_token, &self.params.owner, fee_shares);
            self.total_shares += fee_shares;
            self.accumulated_fees += fee_shares;
            info!(fee_shares, elapsed, "management fee collected");
        }
        self.last_fee_collection = now;
        Ok(FeeReceipt {
            fee_shares,
            collected_at: now,
        })
    }

    pub fn add_supported_asset(
        &mut self,
        caller: &str,
        identifier: &str,
        target_allocation_bps: u32,
        decimals: u32,
    ) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.registry
            .add_asset(identifier, target_allocation_bps, decimals)
    }

    pub fn set_allocation(
        &mut self,
        caller: &str,
        identifier: &str,
        target_allocation_bps: u32,
    ) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.registry.set_allocation(identifier, target_allocation_bps)
    }

    pub fn pause(&mut self, caller: &str) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.paused = true;
        info!("fund paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &str) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        self.paused = false;
        info!("fund unpaused");
        Ok(())
    }

    /// Shares held outside the fund's owner; the base for fee accrual.
    pub fn circulating_supply(&self) -> u128 {
        let owner_held = self
            .tokens
            .balance_of(&self.params.share_token, &self.params.owner);
        self.total_shares.saturating_sub(owner_held)
    }

    pub fn stats(&self) -> FundStats {
        FundStats {
            initialized: self.initialized,
            paused: self.paused,
            total_shares: self.total_shares,
            initial_shares: self.initial_shares,
            circulating_supply: self.circulating_supply(),
            management_fee_bps: self.params.management_fee_bps,
            redemption_fee_bps: self.params.redemption_fee_bps,
            accumulated_fees: self.accumulated_fees,
            last_fee_collection: self.last_fee_collection,
        }
    }

    /// Basket positions in registration order, with held balances in each
    /// asset's own decimals.
    pub fn composition(&self) -> Vec<Position> {
        self.registry
            .assets()
            .iter()
            .map(|asset| Position {
                asset: asset.clone(),
                balance: *self.basket_balances.get(&asset.identifier).unwrap_or(&0),
            })
            .collect()
    }

    pub fn registry(&self) -> &BasketRegistry {
        &self.registry
    }

    pub fn reference_balance(&self) -> u128 {
        self.reference_balance
    }

    pub fn basket_balance(&self, identifier: &str) -> u128 {
        *self.basket_balances.get(identifier).unwrap_or(&0)
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn params(&self) -> &FundParams {
        &self.params
    }
}
