use crate::contracts::IERC20;
use crate::models::TokenApproval;
use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, TxHash, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum RevokeError {
    #[error("PRIVATE_KEY must be set to sign revocation transactions")]
    MissingSigner,
    #[error(
        "Revoking {spender:?} on token {token:?} failed: {reason}. Check the signer's gas balance and try again."
    )]
    Write {
        token: Address,
        spender: Address,
        reason: String,
    },
}

/// Authenticated write side: sets an ERC-20 allowance.
#[async_trait]
pub trait AllowanceWriter: Send + Sync {
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash>;
}

/// Provider that signs `approve` transactions with a local key.
#[derive(Clone)]
pub struct SignerClient {
    provider: DynProvider,
    owner: Address,
}

impl SignerClient {
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("Invalid PRIVATE_KEY format")?;
        let owner = signer.address();
        let parsed_url = rpc_url
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", rpc_url))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(parsed_url)
            .erased();

        Ok(SignerClient { provider, owner })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }
}

#[async_trait]
impl AllowanceWriter for SignerClient {
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        let pending = IERC20::new(token, self.provider.clone())
            .approve(spender, amount)
            .send()
            .await
            .context("approve transaction was rejected")?;
        Ok(*pending.tx_hash())
    }
}

pub struct Revoker<W> {
    writer: W,
}

impl<W: AllowanceWriter> Revoker<W> {
    pub fn new(writer: W) -> Self {
        Revoker { writer }
    }

    /// Sets the allowance of `approval` to zero with a single write.
    pub async fn revoke(&self, approval: &TokenApproval) -> Result<TxHash, RevokeError> {
        info!(
            "Revoking {} ({:?}) access to {} ({:?})",
            approval.spender_name,
            approval.spender_address,
            approval.token_symbol,
            approval.token_address
        );
        self.revoke_allowance(approval.token_address, approval.spender_address)
            .await
    }

    pub async fn revoke_allowance(
        &self,
        token: Address,
        spender: Address,
    ) -> Result<TxHash, RevokeError> {
        match self.writer.approve(token, spender, U256::ZERO).await {
            Ok(tx_hash) => {
                info!("Revocation submitted in transaction {:?}", tx_hash);
                Ok(tx_hash)
            }
            Err(e) => {
                error!("Revocation failed for {:?} on {:?}: {:#}", spender, token, e);
                Err(RevokeError::Write {
                    token,
                    spender,
                    reason: format!("{e:#}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::fallback_approvals;
    use anyhow::bail;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<(Address, Address, U256)>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl AllowanceWriter for RecordingWriter {
        async fn approve(
            &self,
            token: Address,
            spender: Address,
            amount: U256,
        ) -> Result<TxHash> {
            let mut writes = self.writes.lock().unwrap();
            writes.push((token, spender, amount));
            if self.fail.load(Ordering::Relaxed) {
                bail!("insufficient funds for gas");
            }
            Ok(TxHash::with_last_byte(writes.len() as u8))
        }
    }

    #[tokio::test]
    async fn revoke_writes_zero_allowance() {
        let revoker = Revoker::new(RecordingWriter::default());
        let approval = &fallback_approvals()[0];

        revoker.revoke(approval).await.unwrap();

        let writes = revoker.writer.writes.lock().unwrap();
        assert_eq!(
            *writes,
            vec![(approval.token_address, approval.spender_address, U256::ZERO)]
        );
    }

    #[tokio::test]
    async fn repeated_revoke_issues_independent_writes() {
        let revoker = Revoker::new(RecordingWriter::default());
        let approval = &fallback_approvals()[1];

        let first = revoker.revoke(approval).await.unwrap();
        let second = revoker.revoke(approval).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(revoker.writer.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_attempt_runs_after_a_failure() {
        let revoker = Revoker::new(RecordingWriter::default());
        revoker.writer.fail.store(true, Ordering::Relaxed);
        let approval = &fallback_approvals()[0];

        let err = revoker.revoke(approval).await.unwrap_err();
        assert!(matches!(err, RevokeError::Write { .. }));
        assert!(err.to_string().contains("insufficient funds for gas"));
        assert!(err.to_string().contains("try again"));

        revoker.writer.fail.store(false, Ordering::Relaxed);
        assert!(revoker.revoke(approval).await.is_ok());
        assert_eq!(revoker.writer.writes.lock().unwrap().len(), 2);
    }

    #[test]
    fn rejects_malformed_private_key() {
        assert!(SignerClient::new("http://localhost:8545", "not-a-key").is_err());
    }

    #[test]
    fn derives_owner_from_private_key() {
        // well-known development key #0
        let client = SignerClient::new(
            "http://localhost:8545",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            client.owner(),
            alloy_primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }
}
