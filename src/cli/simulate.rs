use super::ui;
use crate::core::clock::{Clock, ManualClock};
use crate::core::config::AppConfig;
use crate::core::fund::{FundLedger, FundParams, SEED_WHOLE_UNITS, SHARE_DECIMALS};
use crate::core::price::PriceSource;
use crate::core::rates::SwapRateCache;
use crate::core::tokens::{MemoryTokens, TokenBank};
use crate::core::venue::ExecutionVenue;
use crate::providers::simulated::{FixedPriceSource, SpotVenue};
use anyhow::Result;
use chrono::{Duration, Utc};
use comfy_table::Cell;
use std::sync::Arc;

const INVESTOR: &str = "investor-1";
const FUND_ACCOUNT: &str = "fund-treasury";

/// Demo price posted for every configured asset: 100 reference units at
/// 8 price decimals.
const DEMO_PRICE: u128 = 100 * 100_000_000;

/// Runs a full fund lifecycle in memory against the simulated providers:
/// initialize, invest, accrue a month of management fee, redeem.
pub async fn run(config: &AppConfig) -> Result<()> {
    let fund = &config.fund;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let clock_dyn: Arc<dyn Clock> = Arc::clone(&clock) as _;

    let source = Arc::new(FixedPriceSource::new(Arc::clone(&clock_dyn)));
    let venue = Arc::new(SpotVenue::new(
        Arc::clone(&source),
        &fund.reference_asset,
        fund.reference_decimals,
    ));
    for asset in &config.basket {
        source.set_price(&asset.identifier, DEMO_PRICE, 8);
        venue.register_asset(&asset.identifier, asset.decimals);
    }

    let source_dyn: Arc<dyn PriceSource> = Arc::clone(&source) as _;
    let venue_dyn: Arc<dyn ExecutionVenue> = Arc::clone(&venue) as _;
    let rates = Arc::new(SwapRateCache::new(
        source_dyn,
        venue_dyn,
        Arc::clone(&clock_dyn),
        &fund.reference_asset,
        fund.reference_decimals,
        Duration::minutes(fund.freshness_minutes),
    ));

    let tokens = Arc::new(MemoryTokens::new());
    let tokens_dyn: Arc<dyn TokenBank> = Arc::clone(&tokens) as _;
    let mut ledger = FundLedger::new(
        FundParams {
            reference_asset: fund.reference_asset.clone(),
            reference_decimals: fund.reference_decimals,
            share_token: fund.share_token.clone(),
            owner: fund.owner.clone(),
            fund_account: FUND_ACCOUNT.to_string(),
            management_fee_bps: fund.management_fee_bps,
            redemption_fee_bps: fund.redemption_fee_bps,
            min_investment: fund.min_investment,
            max_slippage_bps: fund.max_slippage_bps,
        },
        rates,
        tokens_dyn,
        Arc::clone(&clock_dyn),
    );

    for asset in &config.basket {
        ledger.add_supported_asset(
            &fund.owner,
            &asset.identifier,
            asset.allocation_bps,
            asset.decimals,
        )?;
    }

    let unit = crate::core::amount::pow10(fund.reference_decimals);
    let seed = SEED_WHOLE_UNITS * unit;
    tokens.mint(&fund.reference_asset, &fund.owner, seed);
    tokens.approve(&fund.reference_asset, &fund.owner, FUND_ACCOUNT, seed);
    ledger.initialize(&fund.owner, seed).await?;
    println!(
        "{}",
        ui::style_text("Fund initialized with a 1,000,000 unit seed", ui::StyleType::Title)
    );
    print_state(&ledger, fund.reference_decimals).await?;

    // An outside investor deposits 1,000 reference units
    let deposit = 1_000 * unit;
    tokens.mint(&fund.reference_asset, INVESTOR, deposit);
    tokens.approve(&fund.reference_asset, INVESTOR, FUND_ACCOUNT, deposit);
    let receipt = ledger.invest(INVESTOR, deposit).await?;
    ui::print_separator();
    println!(
        "Invested {} {} for {} shares",
        ui::format_amount(receipt.amount_in, fund.reference_decimals),
        fund.reference_asset,
        ui::format_amount(receipt.shares_out, SHARE_DECIMALS),
    );
    print_state(&ledger, fund.reference_decimals).await?;

    // A month passes, the management fee accrues
    clock.advance(Duration::days(30));
    let fee = ledger.collect_management_fee(&fund.owner)?;
    ui::print_separator();
    println!(
        "Collected {} fee shares after 30 days",
        ui::format_amount(fee.fee_shares, SHARE_DECIMALS)
    );

    // The investor exits half the position
    let shares_back = receipt.shares_out / 2;
    let redemption = ledger.redeem(INVESTOR, shares_back).await?;
    ui::print_separator();
    println!(
        "Redeemed {} shares for {} {} net of a {} fee",
        ui::format_amount(redemption.shares_in, SHARE_DECIMALS),
        ui::format_amount(redemption.net_out, fund.reference_decimals),
        fund.reference_asset,
        ui::format_amount(redemption.fee, fund.reference_decimals),
    );
    print_state(&ledger, fund.reference_decimals).await?;

    Ok(())
}

async fn print_state(ledger: &FundLedger, reference_decimals: u32) -> Result<()> {
    let nav = ledger.calculate_nav().await?;
    let share_value = ledger.calculate_share_value().await?;
    let stats = ledger.stats();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Target"),
        ui::header_cell("Balance"),
    ]);
    for position in ledger.composition() {
        table.add_row(vec![
            Cell::new(&position.asset.identifier),
            ui::bps_cell(position.asset.target_allocation_bps),
            ui::amount_cell(position.balance, position.asset.decimals),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!("{} (remainder)", ledger.params().reference_asset)),
        ui::bps_cell(ledger.registry().reference_remainder_bps()),
        ui::amount_cell(ledger.reference_balance(), reference_decimals),
    ]);
    println!("\n{table}");

    println!(
        "NAV: {}  Share value: {}  Shares: {}  Circulating: {}",
        ui::style_text(
            &ui::format_amount(nav, reference_decimals),
            ui::StyleType::TotalValue
        ),
        ui::format_amount(share_value, reference_decimals),
        ui::format_amount(stats.total_shares, SHARE_DECIMALS),
        ui::format_amount(stats.circulating_supply, SHARE_DECIMALS),
    );
    Ok(())
}
