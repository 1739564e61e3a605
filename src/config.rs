use crate::deployment::{AgeSource, DEFAULT_ASSUMED_AGE_DAYS, DEFAULT_BLOCK_TIME_SECS};
use crate::scanner::{DiscoveryMode, WatchedSpender};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;

const UNNAMED_SPENDER: &str = "Unknown Spender";

#[derive(Clone)]
pub struct Config {
    pub json_rpc_url: String,
    pub private_key: Option<String>,
    pub discovery_mode: DiscoveryMode,
    pub age_source: AgeSource,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("json_rpc_url", &self.json_rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("discovery_mode", &self.discovery_mode)
            .field("age_source", &self.age_source)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let json_rpc_url = get("JSON_RPC_URL")
            .or_else(|| get("ALCHEMY_URL"))
            .context("JSON_RPC_URL must be set in .env")?;

        let private_key = get("PRIVATE_KEY");

        let discovery_mode = match get("DISCOVERY_MODE").as_deref() {
            None | Some("synthetic") => DiscoveryMode::Synthetic,
            Some("allowance") => {
                let raw = get("SPENDER_WATCHLIST")
                    .context("SPENDER_WATCHLIST must be set when DISCOVERY_MODE=allowance")?;
                DiscoveryMode::Allowance {
                    watchlist: parse_watchlist(&raw)?,
                }
            }
            Some(other) => anyhow::bail!(
                "Invalid DISCOVERY_MODE {:?}, expected \"synthetic\" or \"allowance\"",
                other
            ),
        };

        let age_source = match get("AGE_SOURCE").as_deref() {
            None | Some("code") => AgeSource::CodePresence {
                assumed_age_days: parse_or(
                    get("ASSUMED_CONTRACT_AGE_DAYS"),
                    DEFAULT_ASSUMED_AGE_DAYS,
                    "ASSUMED_CONTRACT_AGE_DAYS",
                )?,
            },
            Some("deployment") => AgeSource::DeploymentBlock {
                block_time_secs: parse_or(
                    get("BLOCK_TIME_SECS"),
                    DEFAULT_BLOCK_TIME_SECS,
                    "BLOCK_TIME_SECS",
                )?,
            },
            Some(other) => anyhow::bail!(
                "Invalid AGE_SOURCE {:?}, expected \"code\" or \"deployment\"",
                other
            ),
        };

        Ok(Config {
            json_rpc_url,
            private_key,
            discovery_mode,
            age_source,
        })
    }
}

fn parse_or(value: Option<String>, default: u64, key: &str) -> Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value {v:?}")),
        None => Ok(default),
    }
}

/// Parses `address[:name]` entries separated by commas.
pub fn parse_watchlist(raw: &str) -> Result<Vec<WatchedSpender>> {
    let watchlist = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<WatchedSpender> {
            let (address, name) = match entry.split_once(':') {
                Some((address, name)) => (address.trim(), name.trim()),
                None => (entry, ""),
            };
            let address = Address::from_str(address)
                .with_context(|| format!("Invalid spender address in SPENDER_WATCHLIST: {address}"))?;
            let name = if name.is_empty() { UNNAMED_SPENDER } else { name };
            Ok(WatchedSpender {
                address,
                name: name.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if watchlist.is_empty() {
        anyhow::bail!("SPENDER_WATCHLIST contains no spenders");
    }
    Ok(watchlist)
}
