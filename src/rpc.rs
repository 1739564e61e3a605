use crate::chain_data::{ChainData, TokenBalance, TokenMetadata};
use crate::contracts::IERC20;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Display;
use tracing::{debug, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

const TOKEN_BALANCES_METHOD: &str = "alchemy_getTokenBalances";
const TOKEN_METADATA_METHOD: &str = "alchemy_getTokenMetadata";
const ERC20_TOKEN_KIND: &str = "erc20";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalancesResponse {
    #[serde(default)]
    token_balances: Vec<TokenBalance>,
}

/// JSON-RPC client for a single provider endpoint.
///
/// Each call is one request. Errors are logged with the endpoint and returned
/// to the caller unchanged; there is no retry or failover at this layer.
#[derive(Clone)]
pub struct RpcClient {
    provider: AlloyFullProvider,
    url: String,
}

impl RpcClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let parsed_url = rpc_url
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", rpc_url))?;
        let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);

        Ok(RpcClient {
            provider,
            url: rpc_url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn handle_error(&self, method: &str, error: impl Display) -> anyhow::Error {
        warn!("RPC error on {} calling {}: {}", self.url, method, error);
        anyhow::anyhow!("{} failed: {}", method, error)
    }
}

#[async_trait]
impl ChainData for RpcClient {
    async fn get_code(&self, address: Address, block: BlockNumberOrTag) -> Result<Bytes> {
        self.provider
            .get_code_at(address)
            .block_id(block.into())
            .await
            .map_err(|e| self.handle_error("eth_getCode", e))
    }

    async fn get_block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| self.handle_error("eth_blockNumber", e))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .block_id(BlockNumberOrTag::Latest.into())
            .await
            .map_err(|e| self.handle_error("eth_getTransactionCount", e))
    }

    async fn get_token_balances(&self, owner: Address) -> Result<Vec<TokenBalance>> {
        let response: TokenBalancesResponse = self
            .provider
            .raw_request(TOKEN_BALANCES_METHOD.into(), (owner, ERC20_TOKEN_KIND))
            .await
            .map_err(|e| self.handle_error(TOKEN_BALANCES_METHOD, e))?;

        debug!(
            "{} returned {} balance(s) for {:?}",
            TOKEN_BALANCES_METHOD,
            response.token_balances.len(),
            owner
        );
        Ok(response.token_balances)
    }

    async fn get_token_metadata(&self, token: Address) -> Result<TokenMetadata> {
        let metadata: Option<TokenMetadata> = self
            .provider
            .raw_request(TOKEN_METADATA_METHOD.into(), (token,))
            .await
            .map_err(|e| self.handle_error(TOKEN_METADATA_METHOD, e))?;

        Ok(metadata.unwrap_or_default())
    }

    async fn get_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| self.handle_error("allowance", e))
    }
}
