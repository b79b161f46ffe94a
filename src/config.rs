use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;

use crate::tracker::swap_detection::DEFAULT_SWAP_PROGRAM_IDS;
use crate::utils::helper::{parse_pubkey, split_list};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_WS_URL: &str = "wss://api.mainnet-beta.solana.com";
const DEFAULT_FETCH_COOLDOWN_MS: u64 = 15_000;
const DEFAULT_PROBE_INTERVAL_MS: u64 = 60_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Startup configuration, read once from the environment
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub rpc_url: String,
    pub ws_url: String,
    pub wallet_addresses: Vec<String>,
    pub telegram_token: String,
    pub chat_ids: Vec<String>,
    pub fetch_cooldown: Duration,
    pub probe_interval: Duration,
    pub request_timeout: Duration,
    pub swap_program_ids: Vec<String>,
    pub include_balance_snapshots: bool,
    pub trailing_edge: bool,
}

impl TrackerConfig {
    /// Load from process environment (call `dotenvy::dotenv()` first)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token = get("TG_TOKEN").context("TG_TOKEN is missing")?;

        let chat_ids = get("CHAT_IDS")
            .or_else(|| get("CHAT_ID"))
            .map(|raw| split_list(&raw))
            .unwrap_or_default();
        if chat_ids.is_empty() {
            anyhow::bail!("CHAT_IDS is missing");
        }

        let raw_wallets = get("WALLET_ADDRESSES").context("WALLET_ADDRESSES is missing")?;
        let wallet_addresses = parse_wallets(&raw_wallets)?;

        let swap_program_ids = match get("SWAP_PROGRAM_IDS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_SWAP_PROGRAM_IDS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            rpc_url: get("SOLANA_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            ws_url: get("SOLANA_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            wallet_addresses,
            telegram_token,
            chat_ids,
            fetch_cooldown: millis(&get, "FETCH_COOLDOWN_MS", DEFAULT_FETCH_COOLDOWN_MS)?,
            probe_interval: millis(&get, "PROBE_INTERVAL_MS", DEFAULT_PROBE_INTERVAL_MS)?,
            request_timeout: millis(&get, "REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?,
            swap_program_ids,
            include_balance_snapshots: flag(&get, "INCLUDE_BALANCE_SNAPSHOTS", true)?,
            trailing_edge: flag(&get, "TRAILING_EDGE", false)?,
        })
    }
}

/// Validate each address and drop repeats, keeping first occurrence order
fn parse_wallets(raw: &str) -> anyhow::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut wallets = Vec::new();

    for address in split_list(raw) {
        parse_pubkey(&address).context("WALLET_ADDRESSES contains an invalid address")?;
        if seen.insert(address.clone()) {
            wallets.push(address);
        }
    }

    if wallets.is_empty() {
        anyhow::bail!("WALLET_ADDRESSES is empty");
    }
    Ok(wallets)
}

fn millis<G>(get: &G, key: &str, default: u64) -> anyhow::Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let value = match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of milliseconds", key))?,
        None => default,
    };
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", key);
    }
    Ok(Duration::from_millis(value))
}

fn flag<G>(get: &G, key: &str, default: bool) -> anyhow::Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{} must be a boolean, got {:?}", key, other),
        },
    }
}
