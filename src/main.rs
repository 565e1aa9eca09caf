use std::{error::Error, sync::Arc};

use log::{error, info, warn};

use craft_value_scanner::{
    app::{CraftingSnapshot, ItemWindow},
    domain::{AggregatedTable, PriceSource},
    infra::{albion::AlbionDataClient, catalog::JsonItemCatalog},
    util::{
        config::AppConfig,
        persistence::{load_settings, save_settings},
        version::{version_label, APP_NAME},
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(item_id) = std::env::args().nth(1) else {
        eprintln!("usage: craft_value_scanner <ITEM_ID>");
        std::process::exit(2);
    };

    info!("{APP_NAME} {}", version_label());
    let config = AppConfig::from_env();
    let catalog = JsonItemCatalog::load(&config.item_catalog_path)?;
    let source: Arc<dyn PriceSource> =
        Arc::new(AlbionDataClient::with_base_url(&config.market_api_base_url)?);

    let mut settings = load_settings();
    if let Some(interval) = config.refresh_interval_ms {
        settings.refresh_interval_ms = interval;
    }

    let window = ItemWindow::open(&item_id, &catalog, source, settings)?;
    let session = Arc::clone(window.session());
    let extra = session.item().extra_information();
    info!(
        "[session] {} {} ({} / {}, weight {:.2})",
        session.item().display_name(),
        session.item().tier_level_label(),
        extra.shop_category,
        extra.shop_sub_category,
        extra.weight
    );
    if let Some(durability) = extra.durability {
        info!("[session] Durability {durability:.0}");
    }

    let mut table_rx = session.subscribe_table();
    let mut crafting_rx = session.subscribe_crafting();
    let mut error_rx = session.subscribe_errors();
    report_table(&table_rx.borrow_and_update());
    report_crafting(&crafting_rx.borrow_and_update());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = table_rx.changed() => {
                if changed.is_err() { break; }
                report_table(&table_rx.borrow_and_update());
            }
            changed = crafting_rx.changed() => {
                if changed.is_err() { break; }
                report_crafting(&crafting_rx.borrow_and_update());
            }
            changed = error_rx.changed() => {
                if changed.is_err() { break; }
                if let Some(err) = error_rx.borrow_and_update().as_ref() {
                    warn!("[session] {err}");
                }
            }
            _ = &mut shutdown => break,
        }
    }

    let settings = window.close().await;
    if let Err(err) = save_settings(&settings) {
        error!("[settings] Failed to persist settings: {err}");
    }
    Ok(())
}

fn report_table(table: &AggregatedTable) {
    for entry in table.visible() {
        let quote = &entry.quote;
        info!(
            "[prices] {:<16} {:<11} sell {:>9}{} buy {:>9}{}",
            quote.location.display_name(),
            quote.quality.name(),
            quote.sell_price_min.price,
            if entry.is_best_sell { "*" } else { " " },
            quote.buy_price_max.price,
            if entry.is_best_buy { "*" } else { " " },
        );
    }

    let averages = table.average_prices();
    info!(
        "[prices] average sell {} buy {}",
        averages.sell_price_min, averages.buy_price_max
    );
}

fn report_crafting(snapshot: &CraftingSnapshot) {
    if !snapshot.is_craftable() {
        return;
    }
    let calc = &snapshot.outcome.calculation;
    info!(
        "[crafting] {} items, costs {:.0}, sells {:.0}, balance {:.0}",
        calc.possible_item_crafting, calc.total_costs, calc.total_item_sells, calc.grand_total
    );
}
