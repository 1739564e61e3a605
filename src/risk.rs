use crate::chain_data::ChainData;
use crate::deployment::{AgeSource, contract_age_days};
use crate::models::{Allowance, RiskLevel};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

pub const MIN_CONTRACT_AGE_DAYS: u64 = 30;
pub const MIN_TRANSACTION_COUNT: u64 = 100;
pub const LARGE_ALLOWANCE: u64 = 1_000_000;

const YOUNG_CONTRACT_WEIGHT: u32 = 40;
const LOW_ACTIVITY_WEIGHT: u32 = 30;
const LARGE_ALLOWANCE_WEIGHT: u32 = 20;
const HIGH_RISK_ABOVE: u32 = 60;
const MEDIUM_RISK_ABOVE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskSignals {
    pub age_days: u64,
    pub transaction_count: u64,
}

impl RiskSignals {
    pub fn score(&self, allowance: &Allowance) -> u32 {
        let mut score = 0;
        if self.age_days < MIN_CONTRACT_AGE_DAYS {
            score += YOUNG_CONTRACT_WEIGHT;
        }
        if self.transaction_count < MIN_TRANSACTION_COUNT {
            score += LOW_ACTIVITY_WEIGHT;
        }
        if allowance.amount() > U256::from(LARGE_ALLOWANCE) {
            score += LARGE_ALLOWANCE_WEIGHT;
        }
        score
    }
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score > HIGH_RISK_ABOVE {
            RiskLevel::High
        } else if score > MEDIUM_RISK_ABOVE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Classifies spender approvals from on-chain signals about the spender.
#[derive(Clone)]
pub struct RiskScorer {
    chain: Arc<dyn ChainData>,
    age_source: AgeSource,
}

impl RiskScorer {
    pub fn new(chain: Arc<dyn ChainData>, age_source: AgeSource) -> Self {
        RiskScorer { chain, age_source }
    }

    /// Never fails: unlimited allowances are `High` without any lookup, and a
    /// failed signal lookup yields `Medium`.
    pub async fn classify(&self, contract: Address, allowance: &Allowance) -> RiskLevel {
        if allowance.is_unlimited() {
            debug!("Unlimited allowance for {:?}, high risk", contract);
            return RiskLevel::High;
        }

        match self.signals(contract).await {
            Ok(signals) => {
                let score = signals.score(allowance);
                let level = RiskLevel::from_score(score);
                debug!(
                    "Risk for {:?}: age={}d txs={} score={} level={}",
                    contract, signals.age_days, signals.transaction_count, score, level
                );
                level
            }
            Err(e) => {
                warn!("Risk analysis failed for {:?}: {:#}", contract, e);
                RiskLevel::Medium
            }
        }
    }

    pub async fn signals(&self, contract: Address) -> Result<RiskSignals> {
        let age_days = contract_age_days(self.chain.as_ref(), contract, &self.age_source)
            .await
            .context("Failed to determine contract age")?;
        let transaction_count = self
            .chain
            .get_transaction_count(contract)
            .await
            .context("Failed to fetch transaction count")?;

        Ok(RiskSignals {
            age_days,
            transaction_count,
        })
    }
}
