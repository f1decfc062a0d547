use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::domain::{AttemptOutcome, ChatId, RunResult, Submission};
use crate::error::BoostResult;
use crate::jupiter::SwapQuoter;
use crate::messages::{truncate_reason, Explorer, RunEvent, REASON_LIMIT};
use crate::notifier::Notifier;
use crate::pacing::Pacing;
use crate::submitter::TxSubmitter;
use crate::wallet::Credential;

/// Reason recorded for an attempt that panicked.
pub const PANIC_REASON: &str = "internal error";

/// Executes boost runs: quote, sign, submit, report, pace, repeat.
pub struct TradeRunner {
    quoter: Arc<dyn SwapQuoter>,
    submitter: Arc<dyn TxSubmitter>,
    credential: Arc<Credential>,
    pacing: Pacing,
    explorer: Explorer,
    slippage_bps: u16,
}

impl TradeRunner {
    pub fn new(
        quoter: Arc<dyn SwapQuoter>,
        submitter: Arc<dyn TxSubmitter>,
        credential: Arc<Credential>,
        pacing: Pacing,
        explorer: Explorer,
        slippage_bps: u16,
    ) -> Self {
        Self {
            quoter,
            submitter,
            credential,
            pacing,
            explorer,
            slippage_bps,
        }
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    /// Runs `repeat_count` independent, sequential attempts and reports each
    /// one to `destination`. Attempt failures, panics included, never end the
    /// run early.
    pub async fn run(
        &self,
        repeat_count: u32,
        trade_size_lamports: u64,
        destination: ChatId,
        notifier: &dyn Notifier,
    ) -> RunResult {
        let mut result = RunResult::new();
        info!(%destination, repeat_count, trade_size_lamports, "engine.run.start");
        self.report(notifier, destination, RunEvent::Started { repeat_count })
            .await;

        for index in 0..repeat_count {
            let outcome = self.guarded_attempt(index, trade_size_lamports).await;
            let succeeded = outcome.is_success();

            let event = RunEvent::Attempt {
                index: index + 1,
                repeat_count,
                outcome: &outcome,
            };
            self.report(notifier, destination, event).await;
            result.record(outcome);

            if index + 1 < repeat_count {
                tokio::time::sleep(self.pacing.delay_after(index, succeeded)).await;
            }
        }

        result.finished_at = Some(Utc::now());
        info!(
            %destination,
            succeeded = result.succeeded,
            attempted = result.attempted,
            elapsed_ms = (Utc::now() - result.started_at).num_milliseconds(),
            "engine.run.finished"
        );
        let summary = RunEvent::Finished {
            succeeded: result.succeeded,
            repeat_count,
        };
        self.report(notifier, destination, summary).await;
        result
    }

    /// Runs one attempt and folds its error or panic into an outcome.
    async fn guarded_attempt(&self, index: u32, trade_size_lamports: u64) -> AttemptOutcome {
        let attempt = AssertUnwindSafe(self.attempt(trade_size_lamports)).catch_unwind();
        match attempt.await {
            Ok(Ok(sub)) => {
                info!(
                    attempt = index + 1,
                    signature = %sub.signature,
                    simulated = sub.simulated,
                    "engine.attempt.ok"
                );
                AttemptOutcome::Success {
                    transaction_id: sub.signature,
                    simulated: sub.simulated,
                }
            }
            Ok(Err(err)) => {
                warn!(attempt = index + 1, error = %err, "engine.attempt.failed");
                AttemptOutcome::Failure {
                    reason: truncate_reason(&err.to_string(), REASON_LIMIT),
                }
            }
            Err(_) => {
                error!(attempt = index + 1, "engine.attempt.panicked");
                AttemptOutcome::Failure {
                    reason: PANIC_REASON.to_string(),
                }
            }
        }
    }

    /// One quote -> sign -> submit cycle. The unsigned payload and the signed
    /// transaction are each moved forward exactly once.
    async fn attempt(&self, trade_size_lamports: u64) -> BoostResult<Submission> {
        let unsigned = self
            .quoter
            .get_swap_transaction(trade_size_lamports, self.slippage_bps)
            .await?;
        let signed = self.credential.sign(unsigned)?;
        self.submitter.submit(signed).await
    }

    async fn report(&self, notifier: &dyn Notifier, destination: ChatId, event: RunEvent<'_>) {
        let text = event.render(&self.explorer);
        if let Err(err) = notifier.notify(destination, &text).await {
            warn!(%destination, error = %err, "engine.notify.failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::Keypair;

    use super::*;
    use crate::domain::{SignedTransaction, UnsignedTransaction};
    use crate::error::BoostError;
    use crate::wallet::test_support::unsigned_transfer;

    /// Scripted reply for one quoter call.
    enum Reply {
        Tx,
        Fail(BoostError),
        Panic,
    }

    struct ScriptedQuoter {
        payer: Pubkey,
        script: Mutex<VecDeque<Reply>>,
    }

    #[async_trait]
    impl SwapQuoter for ScriptedQuoter {
        async fn get_swap_transaction(
            &self,
            _amount: u64,
            _slippage: u16,
        ) -> BoostResult<UnsignedTransaction> {
            let reply = self.script.lock().unwrap().pop_front().unwrap_or(Reply::Tx);
            match reply {
                Reply::Tx => Ok(unsigned_transfer(&self.payer)),
                Reply::Fail(err) => Err(err),
                Reply::Panic => panic!("route table poisoned"),
            }
        }
    }

    #[derive(Default)]
    struct CountingSubmitter {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TxSubmitter for CountingSubmitter {
        async fn submit(&self, tx: SignedTransaction) -> BoostResult<Submission> {
            let sig = tx.signature();
            self.sent.lock().unwrap().push(sig.clone());
            Ok(Submission {
                signature: sig,
                simulated: false,
            })
        }
    }

    #[derive(Default)]
    struct FlakyNotifier {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn notify(&self, _destination: ChatId, text: &str) -> anyhow::Result<()> {
            self.texts.lock().unwrap().push(text.to_string());
            Err(anyhow!("chat unreachable"))
        }
    }

    fn runner(script: Vec<Reply>, submitter: Arc<CountingSubmitter>) -> TradeRunner {
        let credential = Arc::new(Credential::from_keypair(Keypair::new()));
        let quoter = ScriptedQuoter {
            payer: credential.pubkey(),
            script: Mutex::new(script.into()),
        };
        TradeRunner::new(
            Arc::new(quoter),
            submitter,
            credential,
            Pacing::none(),
            Explorer::new("https://solscan.io/tx", None),
            200,
        )
    }

    #[tokio::test]
    async fn each_attempt_submits_one_distinct_transaction() {
        let submitter = Arc::new(CountingSubmitter::default());
        let r = runner(vec![], submitter.clone());
        let notifier = FlakyNotifier::default();

        let result = r.run(4, 500_000, ChatId(1), &notifier).await;

        assert_eq!(result.succeeded, 4);
        let sent = submitter.sent.lock().unwrap();
        assert_eq!(sent.len(), 4);
        let mut unique = sent.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[tokio::test]
    async fn failed_quote_skips_submission() {
        let submitter = Arc::new(CountingSubmitter::default());
        let script = vec![Reply::Fail(BoostError::QuoteUnavailable("no route".into()))];
        let r = runner(script, submitter.clone());

        let result = r.run(2, 1, ChatId(1), &FlakyNotifier::default()).await;

        assert_eq!(result.outcomes.len(), 2);
        assert!(!result.outcomes[0].is_success());
        assert!(result.outcomes[1].is_success());
        assert_eq!(submitter.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn panicking_attempt_becomes_failure_and_run_continues() {
        let submitter = Arc::new(CountingSubmitter::default());
        let r = runner(vec![Reply::Tx, Reply::Panic, Reply::Tx], submitter.clone());
        let notifier = FlakyNotifier::default();

        let result = r.run(3, 1, ChatId(1), &notifier).await;

        assert_eq!(result.attempted, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(
            result.outcomes[1],
            AttemptOutcome::Failure {
                reason: PANIC_REASON.to_string()
            }
        );
        assert_eq!(submitter.sent.lock().unwrap().len(), 2);

        let texts = notifier.texts.lock().unwrap();
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[2], "Failed 2: internal error");
        assert!(texts[4].contains("2/3"));
    }

    #[tokio::test]
    async fn notifier_errors_do_not_stop_the_run() {
        let submitter = Arc::new(CountingSubmitter::default());
        let r = runner(vec![], submitter);
        let notifier = FlakyNotifier::default();

        let result = r.run(3, 1, ChatId(7), &notifier).await;

        assert_eq!(result.succeeded, 3);
        assert_eq!(notifier.texts.lock().unwrap().len(), 5);
        assert!(result.finished_at.is_some());
    }
}
