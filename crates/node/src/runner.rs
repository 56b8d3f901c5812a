//! Clock-driven agreement runner.

use crate::config::RunnerConfig;
use notary_agreement::{Agreement, AgreementError, Progress};
use notary_core::AgreementAction;
use notary_types::Position;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Errors from the agreement runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Agreement error: {0}")]
    Agreement(#[from] AgreementError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The slot at this position was finalized.
    Finalized(Position),
    /// The shutdown handle fired first.
    Shutdown,
}

/// Handle for shutting down a running [`AgreementRunner`].
///
/// When dropped, signals the runner to exit gracefully.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Trigger shutdown (consumes the handle).
    pub fn shutdown(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Drives one agreement instance through its states on a fixed clock.
///
/// Each step asks peers for votes if the instance is stuck in pull-vote,
/// fires the current state, then waits out the state's clock ticks while
/// polling the instance for finalization or a fast-forward.
pub struct AgreementRunner {
    agreement: Arc<Agreement>,
    actions: mpsc::UnboundedSender<AgreementAction>,
    config: RunnerConfig,
    shutdown_rx: oneshot::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AgreementRunner {
    /// Create a runner for a restarted `agreement`.
    ///
    /// `actions` receives the runner's own `PullVotes` requests; it is
    /// usually the sender of the agreement's [`ActionReceiver`](crate::ActionReceiver).
    pub fn new(
        agreement: Arc<Agreement>,
        actions: mpsc::UnboundedSender<AgreementAction>,
        config: RunnerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        Self {
            agreement,
            actions,
            config,
            shutdown_rx,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Take the shutdown handle.
    ///
    /// Returns a handle that when dropped triggers graceful shutdown.
    /// Can only be called once; subsequent calls return None.
    pub fn shutdown_handle(&mut self) -> Option<ShutdownHandle> {
        self.shutdown_tx
            .take()
            .map(|tx| ShutdownHandle { tx: Some(tx) })
    }

    /// Run until the slot is finalized or shutdown is requested.
    pub async fn run(mut self) -> Result<RunOutcome, RunnerError> {
        let position = self.agreement.agreement_id();
        info!(
            node = %self.agreement.node_id(),
            %position,
            lambda_ms = self.config.lambda.as_millis() as u64,
            "Starting agreement runner"
        );

        let mut ticker = tokio::time::interval(self.config.lambda);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            if self.agreement.pull_votes() {
                let action = AgreementAction::PullVotes {
                    position,
                    period: self.agreement.period(),
                };
                if self.actions.send(action).is_err() {
                    debug!(%position, "Action channel closed, dropping vote pull");
                }
            }

            self.agreement.next_state()?;

            if let Some(outcome) = self.wait_clocks(&mut ticker, position).await {
                return Ok(outcome);
            }
        }
    }

    /// Wait out the current state's clocks, polling `done` before each tick.
    async fn wait_clocks(
        &mut self,
        ticker: &mut Interval,
        position: Position,
    ) -> Option<RunOutcome> {
        let mut remaining = self.agreement.clocks();
        loop {
            match self.agreement.done() {
                Progress::Finalized => {
                    info!(%position, "Agreement runner finished");
                    return Some(RunOutcome::Finalized(position));
                }
                Progress::FastForwarded(period) => {
                    debug!(%position, period, "Restarting clocks after fast-forward");
                    remaining = self.agreement.clocks();
                }
                Progress::Pending => {}
            }

            if remaining == 0 {
                return None;
            }

            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    info!(%position, "Shutdown signal received");
                    return Some(RunOutcome::Shutdown);
                }

                _ = ticker.tick() => {
                    remaining -= 1;
                }
            }
        }
    }
}
