use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{QuotedRoute, TradeRequest, UnsignedTransaction};
use crate::error::{BoostError, BoostResult};

/// Longest upstream body excerpt carried inside an error.
const BODY_EXCERPT: usize = 160;

/// Turns a trade size into a broadcastable unsigned transaction.
#[async_trait]
pub trait SwapQuoter: Send + Sync {
    async fn get_swap_transaction(
        &self,
        amount_lamports: u64,
        slippage_bps: u16,
    ) -> BoostResult<UnsignedTransaction>;
}

#[derive(Clone)]
pub struct JupiterClient {
    base_url: String,
    http: Client,
}

impl JupiterClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn quote(&self, req: &QuoteRequest) -> BoostResult<QuotedRoute> {
        let url = format!("{}/quote", self.base_url);
        let resp = self
            .http
            .get(url)
            .query(req)
            .send()
            .await
            .map_err(|e| BoostError::service(format!("quote request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = excerpt(resp).await;
            return Err(BoostError::QuoteUnavailable(format!("{status}: {body}")));
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BoostError::service(format!("quote response unreadable: {e}")))?;
        let parsed: QuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| BoostError::service(format!("quote response malformed: {e}")))?;

        if parsed.route_plan.is_empty() {
            return Err(BoostError::QuoteUnavailable(format!(
                "no route for {} -> {}",
                req.input_mint, req.output_mint
            )));
        }

        Ok(QuotedRoute {
            out_amount: parsed.out_amount,
            raw,
        })
    }

    pub async fn swap(&self, req: &SwapRequest) -> BoostResult<SwapResponse> {
        let url = format!("{}/swap", self.base_url);
        let resp = self
            .http
            .post(url)
            .json(req)
            .send()
            .await
            .map_err(|e| BoostError::service(format!("swap request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = excerpt(resp).await;
            return Err(BoostError::service(format!("swap build rejected {status}: {body}")));
        }

        resp.json()
            .await
            .map_err(|e| BoostError::service(format!("swap response malformed: {e}")))
    }
}

async fn excerpt(resp: Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    body.chars().take(BODY_EXCERPT).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(rename = "inputMint")]
    pub input_mint: String,
    #[serde(rename = "outputMint")]
    pub output_mint: String,
    /// Amount in the input mint's base units
    pub amount: u64,
    #[serde(rename = "slippageBps")]
    pub slippage_bps: u16,
}

impl From<&TradeRequest> for QuoteRequest {
    fn from(t: &TradeRequest) -> Self {
        Self {
            input_mint: t.input_mint.clone(),
            output_mint: t.output_mint.clone(),
            amount: t.amount,
            slippage_bps: t.max_slippage_bps,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "routePlan", default)]
    route_plan: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    /// The quote exactly as returned by `/quote`.
    #[serde(rename = "quoteResponse")]
    pub quote_response: serde_json::Value,

    #[serde(rename = "userPublicKey")]
    pub user_public_key: String,

    #[serde(rename = "wrapAndUnwrapSol")]
    pub wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResponse {
    /// base64 encoded VersionedTransaction
    #[serde(rename = "swapTransaction")]
    pub swap_transaction: String,

    #[serde(rename = "lastValidBlockHeight", default)]
    pub last_valid_block_height: Option<u64>,
}

/// Quoter for one fixed pair on behalf of one wallet, SOL wrapping enabled.
#[derive(Clone)]
pub struct JupiterQuoter {
    client: JupiterClient,
    input_mint: String,
    output_mint: String,
    user_public_key: String,
}

impl JupiterQuoter {
    pub fn new(
        client: JupiterClient,
        input_mint: String,
        output_mint: String,
        user_public_key: String,
    ) -> Self {
        Self {
            client,
            input_mint,
            output_mint,
            user_public_key,
        }
    }
}

#[async_trait]
impl SwapQuoter for JupiterQuoter {
    async fn get_swap_transaction(
        &self,
        amount_lamports: u64,
        slippage_bps: u16,
    ) -> BoostResult<UnsignedTransaction> {
        let trade = TradeRequest::new(
            self.input_mint.as_str(),
            self.output_mint.as_str(),
            amount_lamports,
            slippage_bps,
        )?;

        // Re-quoted on every call: routes go stale between attempts.
        let route = self.client.quote(&QuoteRequest::from(&trade)).await?;
        debug!(out_amount = %route.out_amount, "jupiter.quote");

        let swap = self
            .client
            .swap(&SwapRequest {
                quote_response: route.raw,
                user_public_key: self.user_public_key.clone(),
                wrap_and_unwrap_sol: true,
            })
            .await?;

        if swap.swap_transaction.trim().is_empty() {
            return Err(BoostError::service("swap response has empty swapTransaction"));
        }
        Ok(UnsignedTransaction(swap.swap_transaction))
    }
}
