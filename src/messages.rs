use crate::domain::AttemptOutcome;

/// Upper bound on failure reasons shown in chat.
pub const REASON_LIMIT: usize = 100;

/// Truncates to at most `limit` characters without splitting a code point.
pub fn truncate_reason(reason: &str, limit: usize) -> String {
    match reason.char_indices().nth(limit) {
        Some((cut, _)) => reason[..cut].to_string(),
        None => reason.to_string(),
    }
}

/// Block explorer link builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explorer {
    tx_url: String,
    cluster: Option<String>,
}

impl Explorer {
    pub fn new(tx_url: impl Into<String>, cluster: Option<String>) -> Self {
        Self {
            tx_url: tx_url.into().trim_end_matches('/').to_string(),
            cluster,
        }
    }

    pub fn tx_link(&self, transaction_id: &str) -> String {
        match self.cluster.as_deref() {
            Some(c) => format!("{}/{transaction_id}?cluster={c}", self.tx_url),
            None => format!("{}/{transaction_id}", self.tx_url),
        }
    }
}

/// Everything a run reports to its requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent<'a> {
    Started { repeat_count: u32 },
    /// Waiting for another run to release the wallet.
    Queued { repeat_count: u32 },
    /// `index` is 1-based.
    Attempt {
        index: u32,
        repeat_count: u32,
        outcome: &'a AttemptOutcome,
    },
    Finished {
        succeeded: u32,
        repeat_count: u32,
    },
    Rejected {
        repeat_count: u32,
        max_repeat_count: u32,
    },
    Aborted { reason: &'a str },
}

impl RunEvent<'_> {
    pub fn render(&self, explorer: &Explorer) -> String {
        match self {
            RunEvent::Started { repeat_count } => {
                format!("Starting {repeat_count} volume trades... 🔥")
            }
            RunEvent::Queued { repeat_count } => {
                format!("Another boost is running; {repeat_count} trades queued ⏳")
            }
            RunEvent::Attempt {
                index,
                repeat_count,
                outcome,
            } => match outcome {
                AttemptOutcome::Success {
                    transaction_id,
                    simulated: false,
                } => {
                    format!("{index}/{repeat_count} ✅ {}", explorer.tx_link(transaction_id))
                }
                AttemptOutcome::Success {
                    transaction_id,
                    simulated: true,
                } => {
                    format!("{index}/{repeat_count} ✅ simulated {transaction_id}")
                }
                AttemptOutcome::Failure { reason } => format!("Failed {index}: {reason}"),
            },
            RunEvent::Finished {
                succeeded,
                repeat_count,
            } => {
                format!("Volume boost finished! {succeeded}/{repeat_count} trades sent 💧")
            }
            RunEvent::Rejected {
                repeat_count,
                max_repeat_count,
            } => {
                format!(
                    "Cannot boost {repeat_count}x: the limit is {max_repeat_count} trades per run"
                )
            }
            RunEvent::Aborted { reason } => {
                format!("Volume boost aborted: {}", truncate_reason(reason, REASON_LIMIT))
            }
        }
    }
}
