//! Liquidity Poller: bounded, cancellable wait for a pool to appear
//!
//! Design:
//!     - Each attempt runs one `LiquidityMonitor::check`
//!     - "No liquidity yet" and transient failures (network, price feed,
//!       timeout) both back off: initial → 2× → 2× → ... → max_delay
//!     - Non-transient failures end the wait immediately
//!     - Gives up with `PollExhausted` after `max_attempts` or `max_elapsed`
//!     - Shutdown interrupts both the in-flight check and the sleep

use crate::config::PollPolicy;
use crate::error::{Result, SniperError};
use crate::liquidity::LiquidityMonitor;
use crate::shutdown::Shutdown;
use crate::types::{LiquidityReport, TokenCandidate};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Escalation multiplier per attempt
const BACKOFF_FACTOR: u32 = 2;

/// Floor for every sleep, so a zero policy cannot spin on the RPC
const MIN_DELAY: Duration = Duration::from_millis(1);

pub struct LiquidityPoller {
    monitor: Arc<LiquidityMonitor>,
    policy: PollPolicy,
}

/// Delay after `current`, doubled and capped, never below `MIN_DELAY`
pub fn next_delay(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(BACKOFF_FACTOR).min(max).max(MIN_DELAY)
}

impl LiquidityPoller {
    pub fn new(monitor: Arc<LiquidityMonitor>, policy: PollPolicy) -> Self {
        Self { monitor, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until the token has liquidity. The returned report carries the
    /// quote-asset decision used for the trade.
    pub async fn wait_for_liquidity(
        &self,
        token: &TokenCandidate,
        shutdown: &mut Shutdown,
    ) -> Result<LiquidityReport> {
        let started = Instant::now();
        let mut delay = self.policy.initial_delay.max(MIN_DELAY);
        let mut attempts: u32 = 0;

        loop {
            if shutdown.is_triggered() {
                return Err(SniperError::Cancelled);
            }
            attempts += 1;

            let outcome = tokio::select! {
                res = self.monitor.check(token) => res,
                _ = shutdown.wait() => return Err(SniperError::Cancelled),
            };

            match outcome {
                Ok(report) if report.has_liquidity() => {
                    info!(
                        token = %token,
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Liquidity confirmed"
                    );
                    return Ok(report);
                }
                Ok(_) => {
                    debug!(token = %token, attempt = attempts, "No liquidity, retrying in {:?}", delay);
                }
                Err(e) if e.is_transient() => {
                    warn!(token = %token, attempt = attempts, "Liquidity check failed: {}, retrying in {:?}", e, delay);
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            let out_of_attempts = self.policy.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = self
                .policy
                .max_elapsed
                .is_some_and(|max| elapsed.saturating_add(delay) > max);
            if out_of_attempts || out_of_time {
                warn!(token = %token, attempts, "Giving up on liquidity after {:?}", elapsed);
                return Err(SniperError::PollExhausted { attempts, elapsed });
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.wait() => return Err(SniperError::Cancelled),
            }
            delay = next_delay(delay, self.policy.max_delay);
        }
    }
}
