//! Transfer construction and submission: randomized fee scaling, nonce
//! jitter, simulated-failure injection, and bounded retry with backoff.

use crate::error::{ConsoleError, ConsoleResult};
use crate::stealth;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

const GWEI: u128 = 1_000_000_000;

/// Convert a config-level ETH amount to wei. Floating point only ever
/// appears on the config/display side; everything on-chain is integer.
pub fn eth_to_wei(amount_eth: f64) -> U256 {
    U256::from((amount_eth * 1e18).round() as u128)
}

/// Scale an integer fee by a factor expressed as a percentage integer,
/// avoiding floating point on anything denominated in wei.
fn scale_by_factor(value: u128, factor: f64) -> u128 {
    let pct = (factor * 100.0).round() as u128;
    value * pct / 100
}

/// Network fee data read at action time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSnapshot {
    Eip1559 { max_fee: u128, priority_fee: u128 },
    Legacy { gas_price: u128 },
}

impl FeeSnapshot {
    /// The single number the gas-price gate compares against
    pub fn effective_price(&self) -> u128 {
        match self {
            FeeSnapshot::Eip1559 { max_fee, .. } => *max_fee,
            FeeSnapshot::Legacy { gas_price } => *gas_price,
        }
    }
}

/// Read current fee data, preferring EIP-1559 estimates and falling
/// back to the legacy gas price.
pub async fn fetch_fee_snapshot(provider: &DynProvider) -> ConsoleResult<FeeSnapshot> {
    match provider.estimate_eip1559_fees().await {
        Ok(estimate) => Ok(FeeSnapshot::Eip1559 {
            max_fee: estimate.max_fee_per_gas,
            priority_fee: estimate.max_priority_fee_per_gas,
        }),
        Err(_) => {
            let gas_price = provider
                .get_gas_price()
                .await
                .map_err(|e| ConsoleError::FeeRead(e.to_string()))?;
            Ok(FeeSnapshot::Legacy { gas_price })
        }
    }
}

/// Fee fields to stamp onto a transfer, after random scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePlan {
    Eip1559 { max_fee: u128, priority_fee: u128 },
    Legacy { gas_price: u128 },
}

impl FeePlan {
    /// Scale the snapshot by the drawn gas factor. Keeps max-fee at or
    /// above priority-fee, bumping by a one-gwei buffer when rounding
    /// pushes them past each other.
    pub fn from_snapshot(snapshot: FeeSnapshot, gas_factor: f64) -> Self {
        match snapshot {
            FeeSnapshot::Eip1559 { max_fee, priority_fee } => {
                let mut max_fee = scale_by_factor(max_fee, gas_factor);
                let priority_fee = scale_by_factor(priority_fee, gas_factor);
                if max_fee < priority_fee {
                    max_fee = priority_fee + GWEI;
                }
                FeePlan::Eip1559 { max_fee, priority_fee }
            }
            FeeSnapshot::Legacy { gas_price } => FeePlan::Legacy {
                gas_price: scale_by_factor(gas_price, gas_factor),
            },
        }
    }

    pub fn apply(&self, tx: TransactionRequest) -> TransactionRequest {
        match self {
            FeePlan::Eip1559 { max_fee, priority_fee } => tx
                .with_max_fee_per_gas(*max_fee)
                .with_max_priority_fee_per_gas(*priority_fee),
            FeePlan::Legacy { gas_price } => tx.with_gas_price(*gas_price),
        }
    }
}

/// Retry budget and pacing for dispatch. Backoff doubles per attempt
/// from `base_delay`, plus a small uniform jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64 * f64::powi(2.0, attempt as i32 - 1);
        let jitter = stealth::uniform(0.0, self.max_jitter.as_millis() as f64);
        Duration::from_millis((base + jitter) as u64)
    }
}

/// Submission seam. The production implementation goes through a
/// wallet-filled provider; tests swap in a scripted one.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    /// Submit and wait for confirmation, returning the transaction hash
    async fn submit(&self, tx: TransactionRequest) -> ConsoleResult<B256>;
}

/// Submits through an alloy provider carrying the wallet signer
pub struct ProviderSubmitter {
    provider: DynProvider,
}

impl ProviderSubmitter {
    pub fn connect(url: &str, signer: PrivateKeySigner) -> ConsoleResult<Self> {
        let parsed: reqwest::Url = url
            .parse()
            .map_err(|e| ConsoleError::Rpc(format!("invalid RPC URL '{}': {}", url, e)))?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(parsed)
            .erased();
        Ok(Self { provider })
    }

    /// Reads (balance, fees, nonce) share the session's connection
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

#[async_trait]
impl TxSubmitter for ProviderSubmitter {
    async fn submit(&self, tx: TransactionRequest) -> ConsoleResult<B256> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ConsoleError::Dispatch(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ConsoleError::Confirmation(e.to_string()))?;
        if !receipt.status() {
            return Err(ConsoleError::Confirmation(format!(
                "transaction {} reverted",
                receipt.transaction_hash
            )));
        }
        Ok(receipt.transaction_hash)
    }
}

/// Outcome of a dispatch, including how many attempts it took
#[derive(Debug, Clone, Copy)]
pub struct DispatchReport {
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub attempts: u32,
    pub skipped_after_retries: bool,
}

/// Execute a transfer with up to `max_retries` additional attempts.
///
/// A simulated-error roll runs before every attempt and is handled
/// exactly like a dispatch failure. Exhausting the budget reports a
/// skip, which the caller must not double-count as a generic failure.
pub async fn send_with_retry(
    submitter: &dyn TxSubmitter,
    tx: TransactionRequest,
    policy: RetryPolicy,
    simulated_error_pct: u32,
) -> DispatchReport {
    let total_attempts = 1 + policy.max_retries;

    for attempt in 1..=total_attempts {
        let result = if stealth::percent_roll(f64::from(simulated_error_pct)) {
            Err(ConsoleError::SimulatedFailure)
        } else {
            submitter.submit(tx.clone()).await
        };

        match result {
            Ok(hash) => {
                info!(attempt, %hash, "transaction confirmed");
                return DispatchReport {
                    success: true,
                    tx_hash: Some(hash),
                    attempts: attempt,
                    skipped_after_retries: false,
                };
            }
            Err(e) if !e.is_retryable() => {
                warn!(attempt, error = %e, "transaction failed with non-retryable error");
                return DispatchReport {
                    success: false,
                    tx_hash: None,
                    attempts: attempt,
                    skipped_after_retries: false,
                };
            }
            Err(e) => {
                warn!(attempt, total_attempts, error = %e, "transaction attempt failed");
                if attempt < total_attempts {
                    let delay = policy.backoff(attempt);
                    info!(delay_ms = delay.as_millis() as u64, "retrying after backoff");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    warn!(
        attempts = total_attempts,
        "transaction skipped after max retries"
    );
    DispatchReport {
        success: false,
        tx_hash: None,
        attempts: total_attempts,
        skipped_after_retries: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct AlwaysFails {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TxSubmitter for AlwaysFails {
        async fn submit(&self, _tx: TransactionRequest) -> ConsoleResult<B256> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ConsoleError::Dispatch("node rejected".into()))
        }
    }

    struct SucceedsImmediately {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TxSubmitter for SucceedsImmediately {
        async fn submit(&self, _tx: TransactionRequest) -> ConsoleResult<B256> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(B256::ZERO)
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_skip() {
        let submitter = AlwaysFails {
            calls: AtomicU32::new(0),
        };
        let report = send_with_retry(
            &submitter,
            TransactionRequest::default(),
            fast_policy(2),
            0,
        )
        .await;

        assert_eq!(submitter.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.attempts, 3);
        assert!(!report.success);
        assert!(report.skipped_after_retries);
    }

    #[tokio::test]
    async fn test_success_stops_retrying() {
        let submitter = SucceedsImmediately {
            calls: AtomicU32::new(0),
        };
        let report = send_with_retry(
            &submitter,
            TransactionRequest::default(),
            fast_policy(2),
            0,
        )
        .await;

        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
        assert!(report.success);
        assert_eq!(report.attempts, 1);
        assert!(!report.skipped_after_retries);
    }

    #[tokio::test]
    async fn test_certain_simulated_error_never_reaches_network() {
        let submitter = SucceedsImmediately {
            calls: AtomicU32::new(0),
        };
        let report = send_with_retry(
            &submitter,
            TransactionRequest::default(),
            fast_policy(1),
            100,
        )
        .await;

        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);
        assert!(!report.success);
        assert!(report.skipped_after_retries);
        assert_eq!(report.attempts, 2);
    }

    struct FailsHard {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TxSubmitter for FailsHard {
        async fn submit(&self, _tx: TransactionRequest) -> ConsoleResult<B256> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ConsoleError::InvalidAddress("0xjunk".into()))
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_without_retry() {
        let submitter = FailsHard {
            calls: AtomicU32::new(0),
        };
        let report = send_with_retry(
            &submitter,
            TransactionRequest::default(),
            fast_policy(5),
            0,
        )
        .await;

        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
        assert!(!report.success);
        assert!(!report.skipped_after_retries);
        assert_eq!(report.attempts, 1);
    }

    #[test]
    fn test_fee_scaling_uses_integer_percent() {
        let plan = FeePlan::from_snapshot(
            FeeSnapshot::Eip1559 {
                max_fee: 100 * GWEI,
                priority_fee: 2 * GWEI,
            },
            1.5,
        );
        assert_eq!(
            plan,
            FeePlan::Eip1559 {
                max_fee: 150 * GWEI,
                priority_fee: 3 * GWEI,
            }
        );

        let legacy = FeePlan::from_snapshot(FeeSnapshot::Legacy { gas_price: 40 * GWEI }, 0.9);
        assert_eq!(legacy, FeePlan::Legacy { gas_price: 36 * GWEI });
    }

    #[test]
    fn test_max_fee_buffered_above_priority_fee() {
        // Rounding or odd node data can push priority above max; the plan
        // restores the invariant with a one-gwei buffer.
        let plan = FeePlan::from_snapshot(
            FeeSnapshot::Eip1559 {
                max_fee: 2 * GWEI,
                priority_fee: 5 * GWEI,
            },
            1.0,
        );
        match plan {
            FeePlan::Eip1559 { max_fee, priority_fee } => {
                assert_eq!(priority_fee, 5 * GWEI);
                assert_eq!(max_fee, 6 * GWEI);
            }
            _ => panic!("expected eip1559 plan"),
        }
    }

    #[test]
    fn test_effective_price_picks_comparable_number() {
        let eip = FeeSnapshot::Eip1559 {
            max_fee: 21,
            priority_fee: 2,
        };
        assert_eq!(eip.effective_price(), 21);
        assert_eq!(FeeSnapshot::Legacy { gas_price: 10 }.effective_price(), 10);
    }

    #[test]
    fn test_eth_to_wei_conversion() {
        assert_eq!(eth_to_wei(1.0), U256::from(10u128.pow(18)));
        assert_eq!(eth_to_wei(0.0001), U256::from(100_000_000_000_000u128));
    }
}
