use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::ChatId;
use crate::engine::{TradeRunner, PANIC_REASON};
use crate::messages::RunEvent;
use crate::notifier::Notifier;

/// Launches boost runs in the background on behalf of chat commands.
///
/// Runs are unguarded by default: two runs for the same wallet may overlap
/// and race on its transactions. `serialize_runs` queues them behind one lock
/// instead.
#[derive(Clone)]
pub struct Dispatcher {
    runner: Arc<TradeRunner>,
    notifier: Arc<dyn Notifier>,
    trade_size_lamports: u64,
    max_repeat_count: u32,
    run_lock: Option<Arc<Mutex<()>>>,
}

impl Dispatcher {
    pub fn new(
        runner: Arc<TradeRunner>,
        notifier: Arc<dyn Notifier>,
        trade_size_lamports: u64,
        max_repeat_count: u32,
        serialize_runs: bool,
    ) -> Self {
        Self {
            runner,
            notifier,
            trade_size_lamports,
            max_repeat_count,
            run_lock: serialize_runs.then(|| Arc::new(Mutex::new(()))),
        }
    }

    /// Starts a run and returns without waiting for it.
    ///
    /// The returned handle completes once the run (or its rejection or panic
    /// report) is done; production callers drop it.
    pub fn start_run(&self, destination: ChatId, repeat_count: u32) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.supervise(destination, repeat_count).await })
    }

    async fn supervise(self, destination: ChatId, repeat_count: u32) {
        if repeat_count > self.max_repeat_count {
            warn!(
                %destination,
                repeat_count,
                max = self.max_repeat_count,
                "dispatch.run.rejected"
            );
            let event = RunEvent::Rejected {
                repeat_count,
                max_repeat_count: self.max_repeat_count,
            };
            self.send(destination, event).await;
            return;
        }

        let guard = match &self.run_lock {
            Some(lock) => Some(self.acquire(lock.clone(), destination, repeat_count).await),
            None => None,
        };

        let runner = self.runner.clone();
        let notifier = self.notifier.clone();
        let size = self.trade_size_lamports;
        let run = tokio::spawn(async move {
            let _guard = guard;
            runner.run(repeat_count, size, destination, notifier.as_ref()).await
        });

        // Attempts isolate their own panics; this only catches ones raised
        // outside an attempt, e.g. by the notifier.
        match run.await {
            Ok(result) => {
                info!(
                    %destination,
                    succeeded = result.succeeded,
                    attempted = result.attempted,
                    "dispatch.run.done"
                );
            }
            Err(join_err) if join_err.is_panic() => {
                error!(%destination, repeat_count, "dispatch.run.panicked");
                let event = RunEvent::Aborted {
                    reason: PANIC_REASON,
                };
                self.send(destination, event).await;
            }
            Err(join_err) => {
                warn!(%destination, error = %join_err, "dispatch.run.cancelled");
                let event = RunEvent::Aborted {
                    reason: "cancelled",
                };
                self.send(destination, event).await;
            }
        }
    }

    /// Takes the run lock, telling the requester when it has to wait.
    async fn acquire(
        &self,
        lock: Arc<Mutex<()>>,
        destination: ChatId,
        repeat_count: u32,
    ) -> OwnedMutexGuard<()> {
        match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                info!(%destination, repeat_count, "dispatch.run.queued");
                self.send(destination, RunEvent::Queued { repeat_count }).await;
                lock.lock_owned().await
            }
        }
    }

    async fn send(&self, destination: ChatId, event: RunEvent<'_>) {
        let text = event.render(self.runner.explorer());
        if let Err(err) = self.notifier.notify(destination, &text).await {
            warn!(%destination, error = %err, "dispatch.notify.failed");
        }
    }
}
