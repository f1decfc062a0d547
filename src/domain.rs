use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::VersionedTransaction;

use crate::error::{BoostError, BoostResult};

pub const MAX_SLIPPAGE_BPS: u16 = 10_000;

/// Chat (or other destination) that receives progress notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// base units of the input mint (lamports for SOL)
    pub amount: u64,
    pub max_slippage_bps: u16,
}

impl TradeRequest {
    pub fn new(
        input_mint: impl Into<String>,
        output_mint: impl Into<String>,
        amount: u64,
        max_slippage_bps: u16,
    ) -> BoostResult<Self> {
        if amount == 0 {
            return Err(BoostError::InvalidRequest("amount must be > 0".into()));
        }
        ensure_slippage_bounds(max_slippage_bps)?;
        Ok(Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            max_slippage_bps,
        })
    }
}

pub fn ensure_slippage_bounds(slippage_bps: u16) -> BoostResult<()> {
    if slippage_bps > MAX_SLIPPAGE_BPS {
        return Err(BoostError::InvalidRequest(format!(
            "slippage_bps ({slippage_bps}) exceeds {MAX_SLIPPAGE_BPS}"
        )));
    }
    Ok(())
}

/// Routing data for one swap build. Kept as raw JSON and forwarded verbatim.
#[derive(Debug, Clone)]
pub struct QuotedRoute {
    pub out_amount: String,
    pub raw: serde_json::Value,
}

/// Wire-encoded (base64) transaction as built by the routing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction(pub String);

impl UnsignedTransaction {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Transaction carrying the credential's signature. Not `Clone`: it is
/// moved into the submitter and cannot be broadcast twice.
#[derive(Debug)]
pub struct SignedTransaction(VersionedTransaction);

impl SignedTransaction {
    pub(crate) fn new(tx: VersionedTransaction) -> Self {
        Self(tx)
    }

    pub fn transaction(&self) -> &VersionedTransaction {
        &self.0
    }

    /// Fee-payer signature, which is also the network transaction id.
    pub fn signature(&self) -> String {
        self.0
            .signatures
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default()
    }
}

/// Accepted (or simulated) submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub signature: String,
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success {
        transaction_id: String,
        simulated: bool,
    },
    Failure { reason: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub attempted: u32,
    pub succeeded: u32,
    pub outcomes: Vec<AttemptOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunResult {
    pub fn new() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            outcomes: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: AttemptOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        }
        self.outcomes.push(outcome);
    }
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}
