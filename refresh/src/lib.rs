//! # Coin import
//!
//! Pulls pages of CoinGecko's `/coins/markets` listing and upserts them
//! into the coins table: unknown slugs become approved listings, known
//! slugs get their market fields refreshed. Run once to seed a fresh
//! database, or from cron to keep the catalog current between the
//! server's own price refresh ticks.

use chrono::Utc;
use feeds::{CoinGecko, Quote, coingecko::MarketRow};
use indicatif::{ProgressBar, ProgressStyle};

use server::{config::Config, db, db::coins::CoinRepository};

pub async fn load_coins(pages: u32, per_page: u32) {
    let config = Config::load();
    let database = db::connect(&config.database_url)
        .await
        .expect("Database misconfigured!");

    let client = CoinGecko::new();

    let pb = ProgressBar::new(pages as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    let mut imported = 0;
    let mut skipped = 0;

    for page in 1..=pages {
        pb.set_message(format!("Fetching page {page}"));

        let rows = client.markets(page, per_page).await.unwrap();

        for row in rows {
            if upsert_row(&database, &row).await {
                imported += 1;
            } else {
                skipped += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!("Imported/refreshed: {imported}");
    println!("Skipped (no price): {skipped}");
}

async fn upsert_row(database: &db::DatabaseConnection, row: &MarketRow) -> bool {
    // Rows without a price are delistings or stubs, not worth a row.
    let Some(price) = row.current_price else {
        return false;
    };

    let quote = Quote {
        slug: row.id.clone(),
        price_usd: price,
        market_cap_usd: row.market_cap,
        change_24h: row.price_change_percentage_24h,
        fetched_at: Utc::now(),
    };

    CoinRepository::upsert_market(
        database,
        &row.id,
        &row.name,
        &row.symbol,
        row.image.clone(),
        &quote,
    )
    .await
    .unwrap();

    true
}
