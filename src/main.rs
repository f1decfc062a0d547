use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use solana_boost_bot::bot::{Bot, Menu};
use solana_boost_bot::config::Config;
use solana_boost_bot::dispatch::Dispatcher;
use solana_boost_bot::engine::TradeRunner;
use solana_boost_bot::jupiter::{JupiterClient, JupiterQuoter};
use solana_boost_bot::messages::Explorer;
use solana_boost_bot::monitoring;
use solana_boost_bot::submitter::RpcSubmitter;
use solana_boost_bot::telegram::TelegramClient;
use solana_boost_bot::wallet::Credential;

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present (no-op in prod/systemd envs)
    let _ = dotenvy::dotenv();

    monitoring::init_tracing();

    let cfg = Config::from_env()?;
    info!(?cfg, "boot");

    let credential = Arc::new(Credential::load(
        std::env::var("WALLET_SECRET").ok(),
        cfg.sol_keypair_path.as_deref(),
    )?);
    let wallet = credential.pubkey().to_string();
    info!(%wallet, dry_run = cfg.dry_run, "wallet.loaded");

    let bot_token = std::env::var("BOT_TOKEN").context("BOT_TOKEN is required")?;
    let telegram = TelegramClient::new(&cfg.telegram_api_url, &bot_token, cfg.http_timeout())?;

    let jupiter = JupiterClient::new(cfg.jupiter_base_url.clone(), cfg.http_timeout())?;
    let quoter = JupiterQuoter::new(
        jupiter,
        cfg.input_mint.clone(),
        cfg.output_mint.clone(),
        wallet.clone(),
    );
    let submitter = RpcSubmitter::new(
        cfg.rpc_http_url.clone(),
        cfg.http_timeout(),
        cfg.dry_run,
        cfg.skip_preflight,
    );

    let runner = TradeRunner::new(
        Arc::new(quoter),
        Arc::new(submitter),
        credential,
        cfg.pacing()?,
        Explorer::new(cfg.explorer_tx_url.clone(), cfg.explorer_cluster.clone()),
        cfg.slippage_bps,
    );
    let dispatcher = Dispatcher::new(
        Arc::new(runner),
        Arc::new(telegram.clone()),
        cfg.trade_size_lamports,
        cfg.max_repeat_count,
        cfg.serialize_runs,
    );

    let menu = Menu {
        wallet,
        token_mint: cfg.output_mint.clone(),
        presets: cfg.boost_presets.clone(),
    };
    Bot::new(telegram, dispatcher, menu, cfg.poll_timeout_secs).run().await
}
