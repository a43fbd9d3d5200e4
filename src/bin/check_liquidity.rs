//! Liquidity Check
//!
//! Runs the liquidity monitor for one token and prints what the sniper
//! would decide: whether a pool holds liquidity and which path it would buy
//! through. With `--wait` it keeps polling under the configured backoff
//! until liquidity shows up (Ctrl-C to stop).
//!
//! Usage:
//!     check-liquidity 0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82
//!     check-liquidity --wait --env-file .env.testnet 0x...

use alloy::providers::ProviderBuilder;
use announce_sniper::chain::RpcChain;
use announce_sniper::config::load_config_from_file;
use announce_sniper::liquidity::{LiquidityMonitor, LiquidityPoller};
use announce_sniper::logging::init_logging;
use announce_sniper::pricing::HttpPriceOracle;
use announce_sniper::shutdown;
use announce_sniper::types::{SwapPath, TokenCandidate};
use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use signal_hook::consts::SIGINT;
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "check-liquidity")]
struct Args {
    /// Token address to check
    token: String,

    #[arg(long, env = "ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

    /// Poll until liquidity appears instead of checking once
    #[arg(long)]
    wait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let token: TokenCandidate = args.token.parse()?;

    let config = load_config_from_file(&args.env_file)
        .with_context(|| format!("Failed to load configuration from {}", args.env_file.display()))?;
    let _log_guard = init_logging(config.log_format, config.log_file.as_deref())?;

    let provider = ProviderBuilder::new().connect_http(config.rpc_url.parse().context("Invalid RPC URL")?);
    let chain = Arc::new(RpcChain::new(Arc::new(provider), config.call_timeout));
    let oracle = Arc::new(HttpPriceOracle::new(
        config.price_feed_url.clone(),
        config.call_timeout,
    )?);
    let monitor = Arc::new(LiquidityMonitor::new(
        chain,
        oracle,
        config.exchange.clone(),
        config.price_precision,
    ));

    info!("Checking liquidity for {}", token);
    let report = if args.wait {
        let (trigger, mut stop) = shutdown::channel();
        let mut signals = Signals::new([SIGINT])?;
        tokio::spawn(async move {
            if signals.next().await.is_some() {
                trigger.trigger();
            }
        });
        LiquidityPoller::new(monitor, config.poll.clone())
            .wait_for_liquidity(&token, &mut stop)
            .await?
    } else {
        monitor.check(&token).await?
    };

    let (has_liquidity, is_native_pair) = report.decision();
    info!(
        "Native pool: {} | reserve {} | value {}",
        report.native.pair.map(|p| p.to_checksum(None)).unwrap_or_else(|| "none".into()),
        report.native.reserve,
        report.native_value.round_dp(4)
    );
    info!(
        "Stable pool: {} | reserve {} | value {}",
        report.stable.pair.map(|p| p.to_checksum(None)).unwrap_or_else(|| "none".into()),
        report.stable.reserve,
        report.stable_value.round_dp(4)
    );
    info!("hasLiquidity={} isNativePair={}", has_liquidity, is_native_pair);
    if has_liquidity {
        info!(
            "Would buy via: {}",
            SwapPath::for_trade(&config.exchange, token.address(), is_native_pair)
        );
    }

    Ok(())
}
