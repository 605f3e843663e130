// Whisper Prediction Market - Main Entry Point

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use whisper_prediction_market::config::StoreBackend;
use whisper_prediction_market::error::Result;
use whisper_prediction_market::{router_with_timeout, AppState, Config};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    println!("\n═══════════════════════════════════════════════");
    println!("     🎲 Whisper Prediction Market");
    println!("═══════════════════════════════════════════════\n");

    let state = AppState::from_config(&config)?;
    let app = router_with_timeout(state.clone(), config.request_timeout);

    match &config.store {
        StoreBackend::Memory => info!("Store: memory"),
        StoreBackend::Sled { path } => info!("Store: sled at {}", path.display()),
    }
    info!("Settlement contract {} on chain {}", config.contract.address, config.contract.chain_id);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("🚀 Listening on http://{}", config.bind_addr);

    println!("📋 Available Endpoints:");
    println!("   GET    /markets           - List markets (category, visibility, creator, resolved, tag, viewer)");
    println!("   POST   /markets           - Create new market");
    println!("   GET    /markets/:id       - Market details, bets and odds");
    println!("   PUT    /markets/:id       - Resolve market");
    println!("   DELETE /markets/:id       - Delete market and its bets");
    println!("   GET    /bets              - List bets (marketId, bettor)");
    println!("   POST   /bets              - Place bet");
    println!("   POST   /transactions      - Build settlement contract call");
    println!("   GET    /health            - Health check\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("💾 Flushing ledger store...");
    state.flush()?;
    info!("👋 Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
}
