use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UNLIMITED: &str = "unlimited";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount a spender may move on the holder's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Allowance {
    Unlimited,
    Amount(U256),
}

impl Allowance {
    /// Maps an on-chain value to an allowance, treating `2^256 - 1` as unlimited.
    pub fn from_amount(amount: U256) -> Self {
        if amount == U256::MAX {
            Allowance::Unlimited
        } else {
            Allowance::Amount(amount)
        }
    }

    pub fn is_unlimited(&self) -> bool {
        match self {
            Allowance::Unlimited => true,
            Allowance::Amount(amount) => *amount == U256::MAX,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            Allowance::Unlimited => U256::MAX,
            Allowance::Amount(amount) => *amount,
        }
    }
}

impl fmt::Display for Allowance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allowance::Unlimited => f.write_str(UNLIMITED),
            Allowance::Amount(amount) => write!(f, "{amount}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid allowance {0:?}: expected a decimal amount or \"unlimited\"")]
pub struct InvalidAllowance(pub String);

impl FromStr for Allowance {
    type Err = InvalidAllowance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNLIMITED {
            return Ok(Allowance::Unlimited);
        }
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidAllowance(s.to_string()));
        }
        U256::from_str_radix(s, 10)
            .map(Allowance::from_amount)
            .map_err(|_| InvalidAllowance(s.to_string()))
    }
}

impl TryFrom<String> for Allowance {
    type Error = InvalidAllowance;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Allowance> for String {
    fn from(value: Allowance) -> Self {
        value.to_string()
    }
}

/// A spender's permission over one of the account's tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenApproval {
    pub token_address: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub spender_address: Address,
    pub spender_name: String,
    pub allowance: Allowance,
    pub risk_level: RiskLevel,
    pub value_at_risk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Whole-unit decimal rendering of a raw token amount, without trailing zeros.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals) {
        Ok(formatted) if formatted.contains('.') => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(formatted) => formatted,
        Err(_) => amount.to_string(),
    }
}
