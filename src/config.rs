use std::any::type_name;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::domain::MAX_SLIPPAGE_BPS;
use crate::pacing::Pacing;

pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Process configuration. Holds no secrets so it can be logged at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // RPC
    pub rpc_http_url: String,
    pub http_timeout_secs: u64,

    // Runtime
    pub dry_run: bool,
    pub skip_preflight: bool,

    // Execution
    pub jupiter_base_url: String,
    pub input_mint: String,
    pub output_mint: String,
    pub trade_size_lamports: u64,
    pub slippage_bps: u16,

    // Pacing
    pub pace_success_base_ms: u64,
    pub pace_success_step_ms: u64,
    pub pace_failure_ms: u64,

    // Reporting
    pub explorer_tx_url: String,
    pub explorer_cluster: Option<String>,

    // Chat
    pub telegram_api_url: String,
    pub poll_timeout_secs: u64,
    pub boost_presets: Vec<u32>,
    pub max_repeat_count: u32,
    pub serialize_runs: bool,

    // Keys
    pub sol_keypair_path: Option<String>,
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Environment lookup, swappable in tests.
struct Vars<F: Fn(&str) -> Option<String>>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// `default` when unset; a value that is set but unreadable is an error.
    fn env_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => parse_bool(&v).ok_or_else(|| anyhow!("{key} is not a boolean: {v}")),
        }
    }

    /// `default` when unset; a value that is set but does not parse as `T`
    /// (fractions, out of range, typos) is an error.
    fn env_parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| anyhow!("{key} is not a valid {}: {v} ({e})", type_name::<T>())),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|k| vars.get(k).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Vars(lookup);

        // RPC
        let rpc_http_url = env
            .get("SOLANA_RPC_URL")
            .or_else(|| env.get("HELIUS_HTTP_URL"))
            .unwrap_or_else(|| "https://api.devnet.solana.com".to_string());
        let http_timeout_secs = env.env_parse::<u64>("HTTP_TIMEOUT_SECS", 20)?;
        if http_timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS must be > 0"));
        }

        // Runtime
        let dry_run = env.env_bool("DRY_RUN", false)?;
        let skip_preflight = env.env_bool("SKIP_PREFLIGHT", false)?;

        // Execution
        let jupiter_base_url = env.string("JUPITER_BASE_URL", "https://quote-api.jup.ag/v6");
        let input_mint = env.string("INPUT_MINT", WSOL_MINT);
        let output_mint = env
            .get("TOKEN_MINT")
            .ok_or_else(|| anyhow!("TOKEN_MINT is required"))?;
        for (key, mint) in [("INPUT_MINT", &input_mint), ("TOKEN_MINT", &output_mint)] {
            Pubkey::from_str(mint)
                .map_err(|e| anyhow!("{key} is not a valid mint ({mint}): {e}"))?;
        }

        let trade_size_lamports = env.env_parse::<u64>("TRADE_SIZE_LAMPORTS", 500_000)?;
        if trade_size_lamports == 0 {
            return Err(anyhow!("TRADE_SIZE_LAMPORTS must be > 0"));
        }
        let slippage_bps = env.env_parse::<u16>("SLIPPAGE_BPS", 200)?;
        if slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(anyhow!("SLIPPAGE_BPS cannot exceed {MAX_SLIPPAGE_BPS}"));
        }

        // Pacing
        let pace_success_base_ms = env.env_parse::<u64>("PACE_SUCCESS_BASE_MS", 3_000)?;
        let pace_success_step_ms = env.env_parse::<u64>("PACE_SUCCESS_STEP_MS", 1_000)?;
        let pace_failure_ms = env.env_parse::<u64>("PACE_FAILURE_MS", 5_000)?;

        // Reporting
        let explorer_tx_url = env.string("EXPLORER_TX_URL", "https://solscan.io/tx");
        let explorer_cluster = match (env.0)("EXPLORER_CLUSTER") {
            None => Some("devnet".to_string()),
            Some(v) if v.trim().is_empty() || v.trim().eq_ignore_ascii_case("mainnet") => None,
            Some(v) => Some(v.trim().to_string()),
        };

        // Chat
        let telegram_api_url = env.string("TELEGRAM_API_URL", "https://api.telegram.org");
        let poll_timeout_secs = env.env_parse::<u64>("POLL_TIMEOUT_SECS", 30)?;
        let boost_presets = match env.get("BOOST_PRESETS") {
            None => vec![10, 50],
            Some(raw) => parse_presets(&raw)?,
        };
        let max_repeat_count = env.env_parse::<u32>("MAX_REPEAT_COUNT", 500)?;
        if let Some(p) = boost_presets.iter().find(|p| **p > max_repeat_count) {
            return Err(anyhow!("BOOST_PRESETS entry {p} exceeds MAX_REPEAT_COUNT"));
        }
        let serialize_runs = env.env_bool("SERIALIZE_RUNS", false)?;

        let sol_keypair_path = env.get("SOL_KEYPAIR_PATH");

        let cfg = Self {
            rpc_http_url,
            http_timeout_secs,
            dry_run,
            skip_preflight,
            jupiter_base_url,
            input_mint,
            output_mint,
            trade_size_lamports,
            slippage_bps,
            pace_success_base_ms,
            pace_success_step_ms,
            pace_failure_ms,
            explorer_tx_url,
            explorer_cluster,
            telegram_api_url,
            poll_timeout_secs,
            boost_presets,
            max_repeat_count,
            serialize_runs,
            sol_keypair_path,
        };
        // Reject pacing that would back off less after failures than after successes.
        cfg.pacing()?;
        Ok(cfg)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn pacing(&self) -> Result<Pacing> {
        Pacing::new(
            Duration::from_millis(self.pace_success_base_ms),
            Duration::from_millis(self.pace_success_step_ms),
            Duration::from_millis(self.pace_failure_ms),
        )
    }
}

fn parse_presets(raw: &str) -> Result<Vec<u32>> {
    let presets = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("invalid BOOST_PRESETS entry: {s}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if presets.is_empty() {
        return Err(anyhow!("BOOST_PRESETS must list at least one count"));
    }
    Ok(presets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        m.entry("TOKEN_MINT".into()).or_insert_with(|| MINT.into());
        m
    }

    #[test]
    fn defaults_follow_devnet_setup() {
        let cfg = Config::from_map(&vars(&[])).unwrap();
        assert_eq!(cfg.rpc_http_url, "https://api.devnet.solana.com");
        assert_eq!(cfg.input_mint, WSOL_MINT);
        assert_eq!(cfg.output_mint, MINT);
        assert_eq!(cfg.trade_size_lamports, 500_000);
        assert_eq!(cfg.slippage_bps, 200);
        assert_eq!(cfg.boost_presets, vec![10, 50]);
        assert_eq!(cfg.explorer_cluster.as_deref(), Some("devnet"));
        assert!(!cfg.dry_run);
        assert!(!cfg.serialize_runs);
    }

    #[test]
    fn token_mint_is_required() {
        let empty = HashMap::new();
        assert!(Config::from_map(&empty).is_err());
    }

    #[test]
    fn rejects_invalid_mint() {
        assert!(Config::from_map(&vars(&[("TOKEN_MINT", "not-a-key")])).is_err());
    }

    #[test]
    fn rejects_out_of_range_slippage() {
        assert!(Config::from_map(&vars(&[("SLIPPAGE_BPS", "10001")])).is_err());
        assert!(Config::from_map(&vars(&[("SLIPPAGE_BPS", "10000")])).is_ok());
    }

    #[test]
    fn rejects_failure_pacing_below_success_pacing() {
        let v = vars(&[
            ("PACE_SUCCESS_BASE_MS", "3000"),
            ("PACE_SUCCESS_STEP_MS", "1000"),
            ("PACE_FAILURE_MS", "2000"),
        ]);
        assert!(Config::from_map(&v).is_err());
    }

    #[test]
    fn mainnet_cluster_drops_query() {
        let cfg = Config::from_map(&vars(&[("EXPLORER_CLUSTER", "mainnet")])).unwrap();
        assert_eq!(cfg.explorer_cluster, None);
    }

    #[test]
    fn parses_presets_and_bools() {
        let cfg = Config::from_map(&vars(&[
            ("BOOST_PRESETS", "5, 25 ,100"),
            ("DRY_RUN", "yes"),
            ("SERIALIZE_RUNS", "on"),
        ]))
        .unwrap();
        assert_eq!(cfg.boost_presets, vec![5, 25, 100]);
        assert!(cfg.dry_run);
        assert!(cfg.serialize_runs);

        assert!(Config::from_map(&vars(&[("BOOST_PRESETS", "10,zero")])).is_err());
        assert!(Config::from_map(&vars(&[("BOOST_PRESETS", "1000")])).is_err());
    }

    #[test]
    fn rpc_url_falls_back_to_helius() {
        let cfg = Config::from_map(&vars(&[("HELIUS_HTTP_URL", "https://rpc.example")])).unwrap();
        assert_eq!(cfg.rpc_http_url, "https://rpc.example");
    }

    #[test]
    fn unparseable_numbers_are_startup_errors() {
        let err = Config::from_map(&vars(&[("TRADE_SIZE_LAMPORTS", "0.0005")])).unwrap_err();
        assert!(err.to_string().contains("TRADE_SIZE_LAMPORTS"));

        let err = Config::from_map(&vars(&[("SLIPPAGE_BPS", "99999")])).unwrap_err();
        assert!(err.to_string().contains("SLIPPAGE_BPS"));

        assert!(Config::from_map(&vars(&[("PACE_FAILURE_MS", "5s")])).is_err());
        assert!(Config::from_map(&vars(&[("MAX_REPEAT_COUNT", "-1")])).is_err());
    }

    #[test]
    fn unreadable_bools_are_startup_errors() {
        let err = Config::from_map(&vars(&[("DRY_RUN", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("DRY_RUN"));
    }

    #[test]
    fn set_numbers_override_defaults() {
        let cfg = Config::from_map(&vars(&[
            ("TRADE_SIZE_LAMPORTS", " 750000 "),
            ("SLIPPAGE_BPS", "50"),
        ]))
        .unwrap();
        assert_eq!(cfg.trade_size_lamports, 750_000);
        assert_eq!(cfg.slippage_bps, 50);
    }
}
