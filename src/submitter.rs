use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use tracing::info;

use crate::domain::{SignedTransaction, Submission};
use crate::error::{BoostError, BoostResult};

/// Broadcasts signed transactions. Takes ownership so a transaction can only
/// be handed over once.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit(&self, tx: SignedTransaction) -> BoostResult<Submission>;
}

pub struct RpcSubmitter {
    rpc: RpcClient,
    dry_run: bool,
    skip_preflight: bool,
}

impl RpcSubmitter {
    pub fn new(url: String, timeout: Duration, dry_run: bool, skip_preflight: bool) -> Self {
        let rpc =
            RpcClient::new_with_timeout_and_commitment(url, timeout, CommitmentConfig::confirmed());
        Self {
            rpc,
            dry_run,
            skip_preflight,
        }
    }
}

#[async_trait]
impl TxSubmitter for RpcSubmitter {
    async fn submit(&self, tx: SignedTransaction) -> BoostResult<Submission> {
        if self.dry_run {
            let sim = self
                .rpc
                .simulate_transaction_with_config(
                    tx.transaction(),
                    RpcSimulateTransactionConfig {
                        sig_verify: false,
                        replace_recent_blockhash: true,
                        commitment: Some(CommitmentConfig::processed()),
                        ..RpcSimulateTransactionConfig::default()
                    },
                )
                .await
                .map_err(|e| BoostError::service(format!("simulateTransaction: {e}")))?;

            if let Some(err) = sim.value.err {
                return Err(BoostError::service(format!("simulation failed: {err}")));
            }
            info!(units = ?sim.value.units_consumed, "dry_run: simulation ok, skipping send");
            return Ok(Submission {
                signature: tx.signature(),
                simulated: true,
            });
        }

        let sig = self
            .rpc
            .send_transaction_with_config(
                tx.transaction(),
                RpcSendTransactionConfig {
                    skip_preflight: self.skip_preflight,
                    preflight_commitment: Some(CommitmentConfig::processed().commitment),
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await
            .map_err(|e| BoostError::service(format!("sendTransaction: {e}")))?;

        Ok(Submission {
            signature: sig.to_string(),
            simulated: false,
        })
    }
}
