use alloy::rpc::types::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub const UNKNOWN_TOKEN_NAME: &str = "Unknown Token";
pub const UNKNOWN_TOKEN_SYMBOL: &str = "UNK";
pub const DEFAULT_DECIMALS: u8 = 18;

/// Read-only view of the chain used by the scanner and the risk scorer.
///
/// Every method is a single request/response round trip against the
/// provider. Implementations must not retry.
#[async_trait]
pub trait ChainData: Send + Sync {
    async fn get_code(&self, address: Address, block: BlockNumberOrTag) -> Result<Bytes>;

    async fn get_block_number(&self) -> Result<u64>;

    async fn get_transaction_count(&self, address: Address) -> Result<u64>;

    /// Fungible (`erc20`) token balances held by `owner`, in provider order.
    async fn get_token_balances(&self, owner: Address) -> Result<Vec<TokenBalance>>;

    async fn get_token_metadata(&self, token: Address) -> Result<TokenMetadata>;

    async fn get_allowance(&self, token: Address, owner: Address, spender: Address)
    -> Result<U256>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub contract_address: Address,
    #[serde(default)]
    pub token_balance: Option<String>,
}

impl TokenBalance {
    pub fn new(contract_address: Address, token_balance: impl Into<String>) -> Self {
        Self {
            contract_address,
            token_balance: Some(token_balance.into()),
        }
    }

    /// Balance as a number: `0x`-prefixed hex, or plain decimal digits.
    /// Missing or malformed balances count as zero.
    pub fn amount(&self) -> U256 {
        let Some(raw) = self.token_balance.as_deref() else {
            return U256::ZERO;
        };
        parse_quantity(raw).unwrap_or_else(|| {
            debug!(
                "Unparseable balance {:?} for token {:?}, treating as zero",
                raw, self.contract_address
            );
            U256::ZERO
        })
    }

    pub fn is_zero(&self) -> bool {
        self.amount().is_zero()
    }
}

fn parse_quantity(raw: &str) -> Option<U256> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => Some(U256::ZERO),
        Some(digits) => U256::from_str_radix(digits, 16).ok(),
        None if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => {
            U256::from_str_radix(raw, 10).ok()
        }
        None => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl TokenMetadata {
    pub fn display_name(&self) -> String {
        non_empty(&self.name).unwrap_or(UNKNOWN_TOKEN_NAME).to_string()
    }

    pub fn display_symbol(&self) -> String {
        non_empty(&self.symbol)
            .unwrap_or(UNKNOWN_TOKEN_SYMBOL)
            .to_string()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_DECIMALS)
    }

    pub fn logo_url(&self) -> Option<String> {
        non_empty(&self.logo).map(str::to_string)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
