use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use solana_wallet_watch::{
  ConnectionSupervisor, EnrichmentReader, FeedConnector, Notifier, SolanaFeedConnector,
  SwapProgramSet, TelegramTransport, TrackerConfig, TrackerSettings, UpdatePipeline,
  WalletTracker,
};

fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  // Initialize logging
  tracing_subscriber::fmt()
    .with_level(true)
    .with_target(false)
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_file(true)
    .with_line_number(true)
    .init();

  let config = TrackerConfig::from_env().context("Invalid configuration")?;

  tokio::runtime::Runtime::new()?.block_on(async {
    info!("Starting Solana Wallet Watch v{}...", solana_wallet_watch::VERSION);
    info!("RPC URL: {}", config.rpc_url);
    info!("WS URL: {}", config.ws_url);
    info!("Tracking {} wallets", config.wallet_addresses.len());

    let connector: Arc<dyn FeedConnector> = Arc::new(SolanaFeedConnector::new(
      config.rpc_url.clone(),
      config.ws_url.clone(),
    ));
    let supervisor = Arc::new(
      ConnectionSupervisor::connect(connector, config.request_timeout)
        .await
        .context("Initial connection failed")?,
    );

    let swap_programs = SwapProgramSet::new(config.swap_program_ids.clone());
    if swap_programs.is_empty() {
      warn!("No swap program ids configured, every transaction reports Swap Detected: NO");
    } else {
      info!("Swap detection over {} programs", swap_programs.len());
    }

    let reader = EnrichmentReader::new(
      swap_programs,
      config.include_balance_snapshots,
      config.request_timeout,
    );
    let notifier = Notifier::new(
      Arc::new(TelegramTransport::new(config.telegram_token.clone())),
      config.chat_ids.clone(),
      config.request_timeout,
    );
    let pipeline = Arc::new(UpdatePipeline::new(supervisor.clone(), reader, notifier));

    let tracker = Arc::new(WalletTracker::new(
      config.wallet_addresses.clone(),
      supervisor,
      pipeline,
      TrackerSettings {
        cooldown: config.fetch_cooldown,
        trailing_edge: config.trailing_edge,
        subscribe_timeout: config.request_timeout,
      },
    ));

    let monitor = tracker.start(config.probe_interval).await;

    info!("Wallet watcher is running. Press Ctrl+C to stop.");

    // Keep the program running
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    monitor.abort();
    tracker.shutdown().await;

    Ok::<(), anyhow::Error>(())
  })
}
