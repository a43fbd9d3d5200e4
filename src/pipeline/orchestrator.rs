//! Orchestrator
//!
//! Message → extract → (gate) → poll liquidity → execute.
//!
//! Single-slot invariant: accepted candidates go through one bounded queue
//! drained by a single trade worker, which runs each pipeline from
//! CandidateFound until Done/Failed before taking the next. Two trades can
//! never share the signing account's nonce. Extraction runs before the gate;
//! messages without a candidate never touch the queue.
//!
//! While a trade is in flight, `BusyPolicy` decides:
//!     - Queue: enqueue in arrival order, at most `capacity` waiters
//!     - Drop:  discard the candidate with a log line

use crate::config::BusyPolicy;
use crate::error::{Result, SniperError};
use crate::execution::TradeExecutor;
use crate::extractor::AddressExtractor;
use crate::liquidity::LiquidityPoller;
use crate::pipeline::state::{PipelineRun, PipelineState};
use crate::shutdown::Shutdown;
use crate::source::MessageSource;
use crate::types::{SubmittedTrade, TokenCandidate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Terminal result of one pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    Submitted(SubmittedTrade),
    Failed {
        token: TokenCandidate,
        error: SniperError,
    },
}

/// Resolves to the outcome of one accepted candidate
pub type PipelineHandle = oneshot::Receiver<PipelineOutcome>;

/// What happened to one inbound message
#[derive(Debug)]
pub enum Dispatch {
    /// No candidate in the text
    Ignored,
    /// Worker was idle; pipeline starts immediately
    Started(TokenCandidate, PipelineHandle),
    /// Worker busy; candidate waits its turn
    Queued(TokenCandidate, PipelineHandle),
    /// Worker busy and policy (or a full queue) discarded the candidate
    Dropped(TokenCandidate),
}

/// Counters for one `run` over a message source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub messages: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub submitted: u64,
    pub failed: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: Option<PipelineOutcome>) {
        match outcome {
            Some(PipelineOutcome::Submitted(_)) => self.submitted += 1,
            Some(PipelineOutcome::Failed { .. }) => self.failed += 1,
            None => {
                error!("Trade worker stopped before reporting an outcome");
                self.failed += 1;
            }
        }
    }
}

struct Job {
    token: TokenCandidate,
    reply: oneshot::Sender<PipelineOutcome>,
}

pub struct Orchestrator {
    extractor: AddressExtractor,
    policy: BusyPolicy,
    jobs: mpsc::Sender<Job>,
    /// Accepted and unfinished candidates: the active trade plus its queue
    pending: Arc<AtomicUsize>,
    shutdown: Shutdown,
}

impl Orchestrator {
    /// Spawns the trade worker, so this must be called inside a tokio runtime.
    pub fn new(
        poller: Arc<LiquidityPoller>,
        executor: Arc<TradeExecutor>,
        policy: BusyPolicy,
        shutdown: Shutdown,
    ) -> Self {
        let depth = match policy {
            BusyPolicy::Queue { capacity } => capacity + 1,
            BusyPolicy::Drop => 1,
        };
        let (jobs, rx) = mpsc::channel(depth);
        let pending = Arc::new(AtomicUsize::new(0));
        tokio::spawn(trade_worker(
            rx,
            poller,
            executor,
            shutdown.clone(),
            pending.clone(),
        ));

        Self {
            extractor: AddressExtractor::new(),
            policy,
            jobs,
            pending,
            shutdown,
        }
    }

    /// True while a pipeline is running or queued
    pub fn is_busy(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Candidates currently queued behind the active trade
    pub fn waiting(&self) -> usize {
        self.pending.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Handle one message. Queue position is fixed here, in call order.
    pub fn dispatch(&self, text: &str) -> Dispatch {
        let token = match self.extractor.extract(text) {
            Some(token) => token,
            None => return Dispatch::Ignored,
        };

        let max_waiting = match self.policy {
            BusyPolicy::Queue { capacity } => capacity,
            BusyPolicy::Drop => 0,
        };

        let ahead = self.pending.fetch_add(1, Ordering::SeqCst);
        if ahead > max_waiting {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            match self.policy {
                BusyPolicy::Drop => warn!(token = %token, "Trade in flight, dropping candidate"),
                BusyPolicy::Queue { capacity } => {
                    warn!(token = %token, capacity, "Trade queue full, dropping candidate")
                }
            }
            return Dispatch::Dropped(token);
        }

        let (reply, handle) = oneshot::channel();
        match self.jobs.try_send(Job { token, reply }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                warn!(token = %token, "Trade queue full, dropping candidate");
                return Dispatch::Dropped(token);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                error!(token = %token, "Trade worker stopped, dropping candidate");
                return Dispatch::Dropped(token);
            }
        }

        if ahead == 0 {
            Dispatch::Started(token, handle)
        } else {
            info!(token = %token, position = ahead, "Trade in flight, candidate queued");
            Dispatch::Queued(token, handle)
        }
    }

    /// Consume `source` until it ends or shutdown fires, then wait for every
    /// accepted pipeline to settle.
    pub async fn run<S: MessageSource + ?Sized>(&self, source: &mut S) -> Result<RunSummary> {
        let mut shutdown = self.shutdown.clone();
        let mut summary = RunSummary::default();
        let mut in_flight: Vec<PipelineHandle> = Vec::new();
        let mut source_error = None;

        loop {
            let next = tokio::select! {
                next = source.next_message() => next,
                _ = shutdown.wait() => {
                    info!("Shutdown requested, no longer reading messages");
                    break;
                }
            };

            let message = match next {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("Message source closed");
                    break;
                }
                Err(e) => {
                    error!("Message source failed: {}", e);
                    source_error = Some(e);
                    break;
                }
            };

            summary.messages += 1;
            debug!(channel = %message.channel, "Message received");

            match self.dispatch(&message.text) {
                Dispatch::Ignored => summary.ignored += 1,
                Dispatch::Dropped(_) => summary.dropped += 1,
                Dispatch::Started(_, handle) | Dispatch::Queued(_, handle) => in_flight.push(handle),
            }

            in_flight.retain_mut(|handle| match handle.try_recv() {
                Ok(outcome) => {
                    summary.record(Some(outcome));
                    false
                }
                Err(TryRecvError::Empty) => true,
                Err(TryRecvError::Closed) => {
                    summary.record(None);
                    false
                }
            });
        }

        if !in_flight.is_empty() {
            info!("Waiting for {} pipeline(s) to finish", in_flight.len());
        }
        for handle in in_flight {
            summary.record(handle.await.ok());
        }

        info!(
            "Run finished: {} messages | {} ignored | {} dropped | {} submitted | {} failed",
            summary.messages, summary.ignored, summary.dropped, summary.submitted, summary.failed
        );

        match source_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

/// The single consumer of the job queue. Runs until every `Orchestrator`
/// sender is gone.
async fn trade_worker(
    mut jobs: mpsc::Receiver<Job>,
    poller: Arc<LiquidityPoller>,
    executor: Arc<TradeExecutor>,
    shutdown: Shutdown,
    pending: Arc<AtomicUsize>,
) {
    while let Some(Job { token, reply }) = jobs.recv().await {
        let outcome = run_pipeline(token, &poller, &executor, shutdown.clone()).await;
        pending.fetch_sub(1, Ordering::SeqCst);
        if reply.send(outcome).is_err() {
            debug!(token = %token, "Pipeline outcome discarded, nobody waiting");
        }
    }
}

/// One candidate end to end
async fn run_pipeline(
    token: TokenCandidate,
    poller: &LiquidityPoller,
    executor: &TradeExecutor,
    mut shutdown: Shutdown,
) -> PipelineOutcome {
    let mut run = PipelineRun::start(token);
    info!(token = %token, "Candidate accepted, waiting for liquidity");

    run.advance(PipelineState::PollingLiquidity);
    let report = match poller.wait_for_liquidity(&token, &mut shutdown).await {
        Ok(report) => report,
        Err(error) => return fail(run, error),
    };

    run.advance(PipelineState::LiquidityConfirmed);
    run.advance(PipelineState::Executing);
    match executor.execute(&token, report.is_native_pair()).await {
        Ok(trade) => {
            run.advance(PipelineState::Done);
            info!(
                token = %token,
                tx_hash = %trade.tx_hash,
                elapsed_ms = run.elapsed().as_millis() as u64,
                "Pipeline done"
            );
            PipelineOutcome::Submitted(trade)
        }
        Err(error) => fail(run, error),
    }
}

fn fail(mut run: PipelineRun, error: SniperError) -> PipelineOutcome {
    let token = *run.token();
    let stage = run.state();
    run.advance(PipelineState::Failed);
    match &error {
        SniperError::Cancelled => info!(token = %token, "Pipeline cancelled during {}", stage),
        e => error!(token = %token, "Pipeline failed during {}: {}", stage, e),
    }
    PipelineOutcome::Failed { token, error }
}
