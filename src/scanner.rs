use crate::chain_data::{ChainData, TokenBalance, TokenMetadata};
use crate::models::{Allowance, RiskLevel, TokenApproval, format_token_amount};
use crate::risk::RiskScorer;
use alloy_primitives::{Address, U256, address};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const SYNTHETIC_SPENDER: Address = address!("1234567890123456789012345678901234567890");
pub const SYNTHETIC_SPENDER_NAME: &str = "Suspicious Contract";

const BALANCES_FETCHED_PROGRESS: u8 = 30;
const TOKEN_PROGRESS_SPAN: usize = 40;
const SCAN_COMPLETE_PROGRESS: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedSpender {
    pub address: Address,
    pub name: String,
}

/// How spender records are produced for each held token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// One record per held token against [`SYNTHETIC_SPENDER`] with an
    /// unlimited allowance.
    #[default]
    Synthetic,
    /// Reads `allowance(account, spender)` for every watched spender.
    Allowance { watchlist: Vec<WatchedSpender> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    InProgress,
}

/// Receives scan progress as a percentage in `0..=100`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u8);
}

impl ProgressReporter for () {
    fn report(&self, _percent: u8) {}
}

impl ProgressReporter for mpsc::UnboundedSender<u8> {
    fn report(&self, percent: u8) {
        // the receiver going away only means nobody is watching
        let _ = self.send(percent);
    }
}

/// Logs progress through `tracing`.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, percent: u8) {
        info!("Scan progress: {}%", percent);
    }
}

struct Progress<'a> {
    reporter: &'a dyn ProgressReporter,
    last: u8,
}

impl<'a> Progress<'a> {
    fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Progress { reporter, last: 0 }
    }

    fn advance(&mut self, percent: u8) {
        let percent = percent.clamp(self.last, SCAN_COMPLETE_PROGRESS);
        self.last = percent;
        self.reporter.report(percent);
    }
}

fn token_progress(index: usize, total: usize) -> u8 {
    let step = TOKEN_PROGRESS_SPAN * index / total.max(1);
    BALANCES_FETCHED_PROGRESS + step as u8
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Discovers the token approvals of an account.
///
/// A scan is a strictly sequential chain of provider calls. Whenever any of
/// them fails the whole result is replaced by [`fallback_approvals`]; a scan
/// never returns a partial list or an error.
pub struct Scanner {
    chain: Arc<dyn ChainData>,
    scorer: RiskScorer,
    mode: DiscoveryMode,
    in_flight: AtomicBool,
}

impl Scanner {
    pub fn new(chain: Arc<dyn ChainData>, scorer: RiskScorer, mode: DiscoveryMode) -> Self {
        Scanner {
            chain,
            scorer,
            mode,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn scan(&self, account: Address) -> Vec<TokenApproval> {
        self.scan_with_progress(account, &()).await
    }

    pub async fn scan_with_progress(
        &self,
        account: Address,
        reporter: &dyn ProgressReporter,
    ) -> Vec<TokenApproval> {
        let mut progress = Progress::new(reporter);
        progress.advance(0);

        info!("Scanning token approvals for {:?}", account);

        let approvals = match self.discover(account, &mut progress).await {
            Ok(approvals) => {
                info!("Found {} approval(s) for {:?}", approvals.len(), account);
                approvals
            }
            Err(e) => {
                warn!(
                    "Scanning failed for {:?}: {:#}, using fallback dataset",
                    account, e
                );
                fallback_approvals()
            }
        };

        progress.advance(SCAN_COMPLETE_PROGRESS);
        approvals
    }

    /// Like [`Scanner::scan`], but rejects the call while another guarded
    /// scan on this scanner is running.
    pub async fn try_scan(&self, account: Address) -> Result<Vec<TokenApproval>, ScanError> {
        self.try_scan_with_progress(account, &()).await
    }

    pub async fn try_scan_with_progress(
        &self,
        account: Address,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<TokenApproval>, ScanError> {
        let _guard = self.acquire()?;
        Ok(self.scan_with_progress(account, reporter).await)
    }

    fn acquire(&self) -> Result<InFlight<'_>, ScanError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| {
                debug!("Rejecting scan, another one is in flight");
                ScanError::InProgress
            })
    }

    async fn discover(
        &self,
        account: Address,
        progress: &mut Progress<'_>,
    ) -> Result<Vec<TokenApproval>> {
        let balances = self
            .chain
            .get_token_balances(account)
            .await
            .context("Failed to fetch token balances")?;
        progress.advance(BALANCES_FETCHED_PROGRESS);

        let total = balances.len();
        debug!("Account {:?} holds {} token(s)", account, total);

        let mut approvals = Vec::new();
        for (index, balance) in balances.iter().enumerate() {
            progress.advance(token_progress(index, total));

            let metadata = self
                .chain
                .get_token_metadata(balance.contract_address)
                .await
                .with_context(|| {
                    format!("Failed to fetch metadata for {:?}", balance.contract_address)
                })?;

            if balance.is_zero() {
                debug!("Skipping {:?} with zero balance", balance.contract_address);
                continue;
            }

            match &self.mode {
                DiscoveryMode::Synthetic => {
                    approvals.push(self.synthetic_approval(balance, &metadata).await);
                }
                DiscoveryMode::Allowance { watchlist } => {
                    let found = self
                        .watched_approvals(account, balance, &metadata, watchlist)
                        .await?;
                    approvals.extend(found);
                }
            }
        }

        Ok(approvals)
    }

    async fn synthetic_approval(
        &self,
        balance: &TokenBalance,
        metadata: &TokenMetadata,
    ) -> TokenApproval {
        let allowance = Allowance::Unlimited;
        let risk_level = self.scorer.classify(SYNTHETIC_SPENDER, &allowance).await;

        TokenApproval {
            token_address: balance.contract_address,
            token_name: metadata.display_name(),
            token_symbol: metadata.display_symbol(),
            spender_address: SYNTHETIC_SPENDER,
            spender_name: SYNTHETIC_SPENDER_NAME.to_string(),
            allowance,
            risk_level,
            value_at_risk: format_token_amount(balance.amount(), metadata.decimals()),
            logo_url: metadata.logo_url(),
        }
    }

    async fn watched_approvals(
        &self,
        account: Address,
        balance: &TokenBalance,
        metadata: &TokenMetadata,
        watchlist: &[WatchedSpender],
    ) -> Result<Vec<TokenApproval>> {
        let token = balance.contract_address;
        let held = balance.amount();
        let mut approvals = Vec::new();

        for spender in watchlist {
            let granted = self
                .chain
                .get_allowance(token, account, spender.address)
                .await
                .with_context(|| {
                    format!(
                        "Failed to read allowance of {:?} on {:?}",
                        spender.address, token
                    )
                })?;
            if granted.is_zero() {
                continue;
            }

            let allowance = Allowance::from_amount(granted);
            let risk_level = self.scorer.classify(spender.address, &allowance).await;
            let exposed = held.min(granted);

            approvals.push(TokenApproval {
                token_address: token,
                token_name: metadata.display_name(),
                token_symbol: metadata.display_symbol(),
                spender_address: spender.address,
                spender_name: spender.name.clone(),
                allowance,
                risk_level,
                value_at_risk: format_token_amount(exposed, metadata.decimals()),
                logo_url: metadata.logo_url(),
            });
        }

        Ok(approvals)
    }
}

/// Fixed result returned whenever live discovery fails.
pub fn fallback_approvals() -> Vec<TokenApproval> {
    vec![
        TokenApproval {
            token_address: address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
            token_name: "USD Coin".to_string(),
            token_symbol: "USDC".to_string(),
            spender_address: SYNTHETIC_SPENDER,
            spender_name: "High Risk Contract".to_string(),
            allowance: Allowance::Unlimited,
            risk_level: RiskLevel::High,
            value_at_risk: "5000".to_string(),
            logo_url: None,
        },
        TokenApproval {
            token_address: address!("4200000000000000000000000000000000000006"),
            token_name: "Wrapped Ether".to_string(),
            token_symbol: "WETH".to_string(),
            spender_address: address!("abcdefabcdefabcdefabcdefabcdefabcdefabcd"),
            spender_name: "Uniswap V3 Router".to_string(),
            allowance: Allowance::Amount(U256::from(1_000_000_000_000_000_000_000u128)),
            risk_level: RiskLevel::Low,
            value_at_risk: "500".to_string(),
            logo_url: None,
        },
    ]
}
