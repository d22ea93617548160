//! Stock Watch - inventory back-in-stock notifier
//!
//! Polls the product list on an interval and sends a Telegram alert each time
//! a product comes back in stock.

use clap::Parser;
use stock_watch::{
    available_for_pincode, format_product_list, normalize, Config, Fetcher, PincodeFilter,
    Poller, StockStateStore, TelegramNotifier,
};

#[tokio::main]
async fn main() {
    // Set RUST_LOG to control the log level (LOG_LEVEL is accepted too)
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into())),
    )
    .init();

    let config = Config::parse();
    let fetcher = Fetcher::new(
        config.api_endpoint.clone(),
        config.payload_file.clone(),
        config.retry_policy(),
    );

    if config.check {
        if let Err(e) = run_check(&config, &fetcher).await {
            log::error!("Check failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    log::info!("Starting stock_watch...");
    log::info!("State file: {}", config.state_file.display());

    let store = StockStateStore::open(&config.state_file);
    let notifier = TelegramNotifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    );
    let mut poller = Poller::new(
        fetcher,
        store,
        notifier,
        config.poll_interval(),
        config.poll_jitter(),
    );

    if config.once {
        poller.run_cycle().await;
        return;
    }

    log::info!(
        "Starting stock monitor loop (interval={}s, jitter={:.0}%)",
        config.poll_interval,
        config.poll_jitter() * 100.0
    );
    poller
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
}

/// Print the products currently in stock, optionally filtered by pincode
async fn run_check(config: &Config, fetcher: &Fetcher) -> stock_watch::Result<()> {
    let snapshot = fetcher.fetch().await;
    log::info!("Checking availability using {} data", snapshot.source);

    let products = normalize(&snapshot.payload);
    let filter = PincodeFilter::load(&config.pincode_map);
    let pincode = config.pincode.as_deref().unwrap_or_default();
    let available = available_for_pincode(&products, &filter, pincode);

    if config.json {
        println!("{}", serde_json::to_string_pretty(&available)?);
    } else {
        println!("{}", format_product_list(&available));
    }
    Ok(())
}
