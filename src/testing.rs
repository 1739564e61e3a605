use crate::chain_data::{ChainData, TokenBalance, TokenMetadata};
use alloy::rpc::types::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes, U256};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory chain with per-method call counters and switchable failures.
#[derive(Default)]
pub struct FakeChain {
    pub balances: Vec<TokenBalance>,
    pub metadata: HashMap<Address, TokenMetadata>,
    pub code: HashMap<Address, Bytes>,
    /// First block at which each contract has code.
    pub deployed_at: HashMap<Address, u64>,
    pub latest_block: u64,
    pub transaction_counts: HashMap<Address, u64>,
    pub allowances: HashMap<(Address, Address, Address), U256>,
    pub fail_balances: bool,
    pub fail_metadata: bool,
    pub fail_code: bool,
    pub fail_transaction_count: bool,
    pub yield_on_balances: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeChain {
    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|m| **m == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

#[async_trait]
impl ChainData for FakeChain {
    async fn get_code(&self, address: Address, block: BlockNumberOrTag) -> Result<Bytes> {
        self.record("eth_getCode");
        if self.fail_code {
            bail!("eth_getCode unavailable");
        }
        let deployed = match (block, self.deployed_at.get(&address)) {
            (BlockNumberOrTag::Number(n), Some(at)) => n >= *at,
            (_, Some(_)) => true,
            (_, None) => self.code.contains_key(&address),
        };
        if deployed {
            Ok(self
                .code
                .get(&address)
                .cloned()
                .unwrap_or_else(|| Bytes::from_static(&[0x60, 0x80])))
        } else {
            Ok(Bytes::new())
        }
    }

    async fn get_block_number(&self) -> Result<u64> {
        self.record("eth_blockNumber");
        Ok(self.latest_block)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.record("eth_getTransactionCount");
        if self.fail_transaction_count {
            bail!("eth_getTransactionCount unavailable");
        }
        Ok(self.transaction_counts.get(&address).copied().unwrap_or(0))
    }

    async fn get_token_balances(&self, _owner: Address) -> Result<Vec<TokenBalance>> {
        self.record("alchemy_getTokenBalances");
        if self.yield_on_balances {
            tokio::task::yield_now().await;
        }
        if self.fail_balances {
            bail!("alchemy_getTokenBalances unavailable");
        }
        Ok(self.balances.clone())
    }

    async fn get_token_metadata(&self, token: Address) -> Result<TokenMetadata> {
        self.record("alchemy_getTokenMetadata");
        if self.fail_metadata {
            bail!("alchemy_getTokenMetadata unavailable");
        }
        Ok(self.metadata.get(&token).cloned().unwrap_or_default())
    }

    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        self.record("eth_call");
        Ok(self
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}
