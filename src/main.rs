//! Announcement Sniper
//!
//! Main entry point. Reads channel messages (JSON lines on stdin or from a
//! file), pulls a token address out of each announcement, waits for its
//! PancakeSwap pool to receive liquidity and buys it.
//!
//! Startup order:
//! - config (.env + environment), logging, channel resolution
//! - HTTP provider, price feed, signer (only the address is ever logged)
//! - preflight: chain id, stable balance, router allowance
//! - SIGINT/SIGTERM → shutdown flag; polling pipelines end as Cancelled
//!   and an idle stdin read does not hold the process open
//!
//! Usage:
//!     announce-sniper                          # messages on stdin
//!     announce-sniper --messages feed.jsonl    # messages from a file
//!     announce-sniper --dry-run                # sign, never send

use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use announce_sniper::chain::RpcChain;
use announce_sniper::config::{load_config_from_file, BusyPolicy};
use announce_sniper::execution::{run_preflight, TradeExecutor};
use announce_sniper::liquidity::{LiquidityMonitor, LiquidityPoller};
use announce_sniper::logging::init_logging;
use announce_sniper::pipeline::Orchestrator;
use announce_sniper::pricing::HttpPriceOracle;
use announce_sniper::shutdown;
use announce_sniper::source::{ChannelFilter, JsonLinesSource};
use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};

/// Announcement Sniper - PancakeSwap V2 (BSC)
#[derive(Parser)]
#[command(name = "announce-sniper")]
struct Args {
    /// Env file with RPC_URL, PRIVATE_KEY, BUY_AMOUNT, ...
    #[arg(long, env = "ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

    /// Sign swaps but never submit them (overrides DRY_RUN)
    #[arg(long)]
    dry_run: bool,

    /// JSON-lines message file; stdin when omitted
    #[arg(long)]
    messages: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config_from_file(&args.env_file)
        .with_context(|| format!("Failed to load configuration from {}", args.env_file.display()))?;
    let _log_guard = init_logging(config.log_format, config.log_file.as_deref())?;

    info!("Announcement Sniper starting (chain_id: {})", config.exchange.chain_id);
    info!("RPC URL: {}", config.rpc_url_for_log());
    info!("Router: {:?} | Factory: {:?}", config.exchange.router, config.exchange.factory);
    info!(
        "Buy amount: {} stable | Gas price: {} gwei | Gas multiplier: {}",
        config.trade.buy_amount, config.trade.gas_price_gwei, config.trade.gas_multiplier
    );
    match config.busy_policy {
        BusyPolicy::Queue { capacity } => info!("Busy policy: queue (capacity {})", capacity),
        BusyPolicy::Drop => info!("Busy policy: drop"),
    }

    let channels = ChannelFilter::resolve(&config.channels).context("Channel resolution failed")?;

    let provider = ProviderBuilder::new().connect_http(config.rpc_url.parse().context("Invalid RPC URL")?);
    let chain = Arc::new(RpcChain::new(Arc::new(provider), config.call_timeout));
    let oracle = Arc::new(HttpPriceOracle::new(
        config.price_feed_url.clone(),
        config.call_timeout,
    )?);

    let signer: PrivateKeySigner = config
        .private_key
        .expose()
        .parse()
        .context("PRIVATE_KEY is not a valid secp256k1 key")?;
    info!("Trading account: {:?}", signer.address());

    run_preflight(
        chain.as_ref(),
        chain.as_ref(),
        &config.exchange,
        &config.trade,
        signer.address(),
    )
    .await
    .context("Preflight failed")?;

    let monitor = Arc::new(LiquidityMonitor::new(
        chain.clone(),
        oracle,
        config.exchange.clone(),
        config.price_precision,
    ));
    let poller = Arc::new(LiquidityPoller::new(monitor, config.poll.clone()));

    let mut executor = TradeExecutor::new(
        chain.clone(),
        signer,
        config.exchange.clone(),
        config.trade.clone(),
    );
    executor.set_dry_run(config.dry_run || args.dry_run);
    executor.set_explorer_tx_url(config.explorer_tx_url.clone());

    // SIGINT/SIGTERM → shutdown
    let (trigger, stop) = shutdown::channel();
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    tokio::spawn(async move {
        if let Some(sig) = signals.next().await {
            warn!("Received signal {}, shutting down", sig);
            trigger.trigger();
        }
    });

    let orchestrator = Orchestrator::new(poller, Arc::new(executor), config.busy_policy, stop);

    let summary = match &args.messages {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Cannot open {}", path.display()))?;
            info!("Reading messages from {}", path.display());
            let mut source = JsonLinesSource::new(BufReader::new(file), channels);
            orchestrator.run(&mut source).await?
        }
        None => {
            info!("Reading messages from stdin");
            let mut source =
                JsonLinesSource::from_blocking(std::io::BufReader::new(std::io::stdin()), channels)?;
            orchestrator.run(&mut source).await?
        }
    };

    signals_handle.close();
    info!("Sniper stopped after {} trade(s)", summary.submitted);
    Ok(())
}
