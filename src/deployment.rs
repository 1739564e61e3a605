use crate::chain_data::ChainData;
use alloy::rpc::types::BlockNumberOrTag;
use alloy_primitives::Address;
use anyhow::Result;
use tracing::{debug, info};

pub const DEFAULT_ASSUMED_AGE_DAYS: u64 = 180;
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 2; // Base produces a block every 2 seconds
const SECONDS_PER_DAY: u64 = 86_400;

/// Where the contract age signal comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgeSource {
    /// One `eth_getCode` call: no code means age 0, code present means
    /// `assumed_age_days`.
    CodePresence { assumed_age_days: u64 },
    /// Locates the creation block by binary search and converts the block
    /// distance to days.
    DeploymentBlock { block_time_secs: u64 },
}

impl Default for AgeSource {
    fn default() -> Self {
        AgeSource::CodePresence {
            assumed_age_days: DEFAULT_ASSUMED_AGE_DAYS,
        }
    }
}

pub async fn contract_age_days(
    chain: &dyn ChainData,
    address: Address,
    source: &AgeSource,
) -> Result<u64> {
    match source {
        AgeSource::CodePresence { assumed_age_days } => {
            let code = chain.get_code(address, BlockNumberOrTag::Latest).await?;
            if code.is_empty() {
                debug!("No code at {:?}, treating as age 0", address);
                Ok(0)
            } else {
                Ok(*assumed_age_days)
            }
        }
        AgeSource::DeploymentBlock { block_time_secs } => {
            let latest_block = chain.get_block_number().await?;
            let Some(deployment_block) =
                find_deployment_block(chain, address, latest_block).await?
            else {
                return Ok(0);
            };
            let age_secs = latest_block
                .saturating_sub(deployment_block)
                .saturating_mul(*block_time_secs);
            Ok(age_secs / SECONDS_PER_DAY)
        }
    }
}

/// First block at which `address` has code, or `None` if it has none at
/// `latest_block`.
pub async fn find_deployment_block(
    chain: &dyn ChainData,
    address: Address,
    latest_block: u64,
) -> Result<Option<u64>> {
    debug!("Searching for deployment block of contract {:?}", address);

    let code = chain
        .get_code(address, BlockNumberOrTag::Number(latest_block))
        .await?;
    if code.is_empty() {
        return Ok(None);
    }

    let mut left = 0u64;
    let mut right = latest_block;

    while left < right {
        let mid = left + (right - left) / 2;

        let code = chain
            .get_code(address, BlockNumberOrTag::Number(mid))
            .await?;

        if code.is_empty() {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    info!("Contract {:?} deployed at block {}", address, left);
    Ok(Some(left))
}
