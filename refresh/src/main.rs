use clap::Parser;

/// Bulk import/refresh of coin rows from the CoinGecko markets listing.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of market pages to pull, ordered by market cap.
    #[arg(default_value_t = 1)]
    pages: u32,

    /// Coins per page.
    #[arg(long, default_value_t = 100)]
    per_page: u32,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    refresh::load_coins(args.pages, args.per_page).await;
}
