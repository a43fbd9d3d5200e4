// Per-candidate state machine
//
//   Idle → CandidateFound → PollingLiquidity → LiquidityConfirmed → Executing → Done
//                       \________________ any non-terminal → Failed

use crate::types::TokenCandidate;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    CandidateFound,
    PollingLiquidity,
    LiquidityConfirmed,
    Executing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, CandidateFound)
            | (CandidateFound, PollingLiquidity)
            | (PollingLiquidity, PollingLiquidity)
            | (PollingLiquidity, LiquidityConfirmed)
            | (LiquidityConfirmed, Executing)
            | (Executing, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "Idle",
            PipelineState::CandidateFound => "CandidateFound",
            PipelineState::PollingLiquidity => "PollingLiquidity",
            PipelineState::LiquidityConfirmed => "LiquidityConfirmed",
            PipelineState::Executing => "Executing",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Tracks one candidate through the machine
#[derive(Debug)]
pub struct PipelineRun {
    token: TokenCandidate,
    state: PipelineState,
    started: Instant,
}

impl PipelineRun {
    /// A run begins the moment a candidate is extracted
    pub fn start(token: TokenCandidate) -> Self {
        let mut run = Self {
            token,
            state: PipelineState::Idle,
            started: Instant::now(),
        };
        run.advance(PipelineState::CandidateFound);
        run
    }

    pub fn token(&self) -> &TokenCandidate {
        &self.token
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Move to `next`. Illegal moves are logged and ignored.
    pub fn advance(&mut self, next: PipelineState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(
                token = %self.token,
                "Ignoring illegal pipeline transition {} → {}", self.state, next
            );
            return false;
        }
        debug!(token = %self.token, from = %self.state, to = %next, "Pipeline transition");
        self.state = next;
        true
    }
}
