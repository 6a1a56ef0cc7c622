use super::ui;
use crate::core::config::AppConfig;
use crate::core::price::{PricePoint, PriceSource};
use crate::providers::feed::HttpPriceFeed;
use anyhow::{Context, Result};
use comfy_table::Cell;
use futures::future::join_all;
use std::collections::HashMap;

/// Fetches the current feed price for every basket asset and renders the
/// target composition with prices attached.
pub async fn run(config: &AppConfig) -> Result<()> {
    let feed_config = config
        .providers
        .feed
        .as_ref()
        .context("No price feed configured")?;
    let feed = HttpPriceFeed::new(&feed_config.base_url);

    let pb = ui::new_progress_bar(config.basket.len() as u64, true);
    pb.set_message("Fetching prices...");

    let price_futures = config.basket.iter().map(|asset| {
        let pb_clone = pb.clone();
        let feed = &feed;
        async move {
            let res = feed.get_price(&asset.identifier).await;
            pb_clone.inc(1);
            (asset.identifier.clone(), res)
        }
    });
    let price_results: HashMap<String, Result<PricePoint>> =
        join_all(price_futures).await.into_iter().collect();
    pb.finish_and_clear();

    let reference = &config.fund.reference_asset;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Target"),
        ui::header_cell(&format!("Price ({reference})")),
        ui::header_cell("As of"),
    ]);

    let mut all_valid = true;
    for asset in &config.basket {
        let (price_cell, time_cell) = match price_results.get(&asset.identifier) {
            Some(Ok(point)) => (
                ui::amount_cell(point.price, point.decimals),
                Cell::new(point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            ),
            Some(Err(e)) => {
                all_valid = false;
                (
                    Cell::new(ui::style_text(&e.to_string(), ui::StyleType::Error)),
                    ui::na_cell(true),
                )
            }
            None => {
                all_valid = false;
                (ui::na_cell(true), ui::na_cell(true))
            }
        };
        table.add_row(vec![
            Cell::new(&asset.identifier),
            ui::bps_cell(asset.allocation_bps),
            price_cell,
            time_cell,
        ]);
    }

    let remainder =
        10_000u32.saturating_sub(config.basket.iter().map(|a| a.allocation_bps).sum::<u32>());
    table.add_row(vec![
        Cell::new(format!("{reference} (remainder)")),
        ui::bps_cell(remainder),
        Cell::new("1"),
        ui::na_cell(false),
    ]);

    println!(
        "Basket: {}\n\n{table}",
        ui::style_text(&config.fund.share_token, ui::StyleType::Title)
    );

    if !all_valid {
        anyhow::bail!("One or more basket prices could not be fetched");
    }
    Ok(())
}
