use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Missing configuration value: {0}")]
    MissingConfiguration(String),

    // Wallet errors
    #[error("Failed to load wallet key: {0}")]
    WalletLoad(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No wallets loaded")]
    NoWallets,

    // Endpoint errors
    #[error("RPC health check failed for {url}: {reason}")]
    HealthCheck { url: String, reason: String },

    #[error("Chain {0} has no usable endpoints")]
    ChainUnavailable(u64),

    #[error("All configured chains exhausted their endpoints")]
    EndpointsExhausted,

    #[error("No RPC endpoints configured")]
    NoEndpoints,

    // Read errors (balance / fee / block / nonce queries)
    #[error("Balance read failed: {0}")]
    BalanceRead(String),

    #[error("Fee read failed: {0}")]
    FeeRead(String),

    #[error("Block read failed: {0}")]
    BlockRead(String),

    #[error("Nonce read failed: {0}")]
    NonceRead(String),

    // Dispatch errors
    #[error("Transaction submission failed: {0}")]
    Dispatch(String),

    #[error("Transaction confirmation failed: {0}")]
    Confirmation(String),

    #[error("Simulated network error injected before send")]
    SimulatedFailure,

    #[error("Transaction skipped after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    // Network / transport errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    // Generic errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Check if the error is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConsoleError::Network(_)
                | ConsoleError::Rpc(_)
                | ConsoleError::Dispatch(_)
                | ConsoleError::Confirmation(_)
                | ConsoleError::SimulatedFailure
                | ConsoleError::HealthCheck { .. }
        )
    }

    /// Check if the error must halt the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConsoleError::InvalidConfiguration(_)
                | ConsoleError::MissingConfiguration(_)
                | ConsoleError::EndpointsExhausted
        )
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            ConsoleError::InvalidConfiguration(_) | ConsoleError::MissingConfiguration(_) => {
                "configuration"
            }

            ConsoleError::WalletLoad(_)
            | ConsoleError::InvalidAddress(_)
            | ConsoleError::NoWallets => "wallet",

            ConsoleError::HealthCheck { .. }
            | ConsoleError::ChainUnavailable(_)
            | ConsoleError::EndpointsExhausted
            | ConsoleError::NoEndpoints => "endpoint",

            ConsoleError::BalanceRead(_)
            | ConsoleError::FeeRead(_)
            | ConsoleError::BlockRead(_)
            | ConsoleError::NonceRead(_) => "read",

            ConsoleError::Dispatch(_)
            | ConsoleError::Confirmation(_)
            | ConsoleError::SimulatedFailure
            | ConsoleError::RetriesExhausted { .. } => "dispatch",

            ConsoleError::Network(_) | ConsoleError::Rpc(_) => "network",

            _ => "system",
        }
    }
}

// Result type alias for convenience
pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ConsoleError::Rpc("timeout".into()).is_retryable());
        assert!(ConsoleError::SimulatedFailure.is_retryable());
        assert!(!ConsoleError::InvalidConfiguration("bad".into()).is_retryable());
        assert!(!ConsoleError::RetriesExhausted { attempts: 3 }.is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ConsoleError::EndpointsExhausted.is_fatal());
        assert!(ConsoleError::InvalidConfiguration("bad".into()).is_fatal());
        assert!(!ConsoleError::BalanceRead("oops".into()).is_fatal());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ConsoleError::FeeRead("x".into()).category(), "read");
        assert_eq!(
            ConsoleError::RetriesExhausted { attempts: 3 }.category(),
            "dispatch"
        );
        assert_eq!(ConsoleError::NoEndpoints.category(), "endpoint");
    }
}
