//! The flat bag of numeric/boolean/enum settings behind every
//! probabilistic decision, plus the canned stealth profiles.

use crate::error::{ConsoleError, ConsoleResult};
use crate::persona::PersonaMode;
use crate::probability::ActionProbabilities;
use crate::types::RecipientMode;
use serde::{Deserialize, Serialize};

/// Validated run configuration. Loaded once per run and re-validated
/// before each interaction start; invalid states block start instead of
/// being silently coerced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Upper bound on normal (non-burst) session action count
    pub max_txns_per_wallet: u32,
    /// Session idle chance in percent, carried by the `steady` persona
    pub wallet_idle_chance: u32,

    /// Transfer amount bounds in ETH (display/config units)
    pub min_amount_eth: f64,
    pub max_amount_eth: f64,

    /// Baseline inter-action/session pacing bounds
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,

    /// Randomized fee multiplier bounds
    pub min_gas_factor: f64,
    pub max_gas_factor: f64,
    /// Ceiling multiplier vs. the previous fee reading before skipping
    pub gas_multiplier: f64,

    /// Additional dispatch attempts after the first
    pub max_retries: u32,
    /// Blocks scanned for pool recipient mode
    pub block_lookback: u64,
    /// Probability (%) of an injected pre-send failure
    pub simulated_error_chance: u32,
    /// Upper bound (exclusive) for the random nonce offset
    pub nonce_jitter: u64,

    /// Base action distribution, must sum to 100
    pub probabilities: ActionProbabilities,
    /// Per-wallet randomization (%) of the base distribution
    pub prob_jitter_factor: u32,

    /// Extended-pause behavior
    pub think_time_chance: u32,
    pub min_think_time_ms: u64,
    pub max_think_time_ms: u64,

    /// Burst sessions and the lull that follows them
    pub activity_burst_chance: u32,
    pub min_burst_actions: u32,
    pub max_burst_actions: u32,
    pub min_lull_time_ms: u64,
    pub max_lull_time_ms: u64,

    /// Double delays (further scaled by persona) during night hours
    pub enable_time_of_day_bias: bool,

    /// Fixed pauses when changing endpoint/wallet
    pub rpc_switch_delay_ms: u64,
    pub wallet_switch_delay_ms: u64,
    /// Probability (%) of reusing the previous chain for the next session
    pub chain_stickiness: u32,

    pub recipient_mode: RecipientMode,
    /// Destination for `fixed` recipient mode, kept raw and re-parsed
    /// at resolve time so mid-run edits surface as skips
    pub fixed_address: Option<String>,

    pub persona_mode: PersonaMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl RunConfig {
    /// Everyday stealth defaults
    pub fn balanced() -> Self {
        Self {
            max_txns_per_wallet: 5,
            wallet_idle_chance: 30,
            min_amount_eth: 0.0001,
            max_amount_eth: 0.0002,
            min_delay_ms: 10_000,
            max_delay_ms: 30_000,
            min_gas_factor: 0.9,
            max_gas_factor: 1.1,
            gas_multiplier: 2.0,
            max_retries: 2,
            block_lookback: 300,
            simulated_error_chance: 2,
            nonce_jitter: 3,
            probabilities: ActionProbabilities {
                send: 60,
                idle: 20,
                balance_check: 20,
            },
            prob_jitter_factor: 5,
            think_time_chance: 10,
            min_think_time_ms: 60_000,
            max_think_time_ms: 120_000,
            activity_burst_chance: 50,
            min_burst_actions: 2,
            max_burst_actions: 5,
            min_lull_time_ms: 300_000,
            max_lull_time_ms: 900_000,
            enable_time_of_day_bias: true,
            rpc_switch_delay_ms: 5_000,
            wallet_switch_delay_ms: 5_000,
            chain_stickiness: 20,
            recipient_mode: RecipientMode::SelfInteract,
            fixed_address: None,
            persona_mode: PersonaMode::Random,
        }
    }

    /// Short delays, high send pressure, shallow lulls
    pub fn aggressive() -> Self {
        Self {
            max_txns_per_wallet: 8,
            wallet_idle_chance: 10,
            min_amount_eth: 0.0002,
            max_amount_eth: 0.0004,
            min_delay_ms: 5_000,
            max_delay_ms: 15_000,
            min_gas_factor: 1.0,
            max_gas_factor: 1.3,
            gas_multiplier: 3.0,
            max_retries: 1,
            block_lookback: 100,
            simulated_error_chance: 1,
            probabilities: ActionProbabilities {
                send: 80,
                idle: 10,
                balance_check: 10,
            },
            prob_jitter_factor: 2,
            think_time_chance: 2,
            min_think_time_ms: 10_000,
            max_think_time_ms: 20_000,
            activity_burst_chance: 80,
            min_burst_actions: 3,
            max_burst_actions: 8,
            min_lull_time_ms: 60_000,
            max_lull_time_ms: 180_000,
            enable_time_of_day_bias: false,
            rpc_switch_delay_ms: 2_000,
            wallet_switch_delay_ms: 2_000,
            persona_mode: PersonaMode::Speedy,
            ..Self::balanced()
        }
    }

    /// Long pauses, frequent idling, deep lulls
    pub fn ultra_slow() -> Self {
        Self {
            max_txns_per_wallet: 2,
            wallet_idle_chance: 50,
            min_amount_eth: 0.00005,
            max_amount_eth: 0.0001,
            min_delay_ms: 20_000,
            max_delay_ms: 90_000,
            min_gas_factor: 0.8,
            max_gas_factor: 1.0,
            gas_multiplier: 1.5,
            max_retries: 3,
            block_lookback: 500,
            simulated_error_chance: 5,
            probabilities: ActionProbabilities {
                send: 40,
                idle: 40,
                balance_check: 20,
            },
            prob_jitter_factor: 8,
            think_time_chance: 25,
            min_think_time_ms: 90_000,
            max_think_time_ms: 180_000,
            activity_burst_chance: 20,
            min_burst_actions: 1,
            max_burst_actions: 3,
            min_lull_time_ms: 900_000,
            max_lull_time_ms: 1_800_000,
            enable_time_of_day_bias: true,
            rpc_switch_delay_ms: 8_000,
            wallet_switch_delay_ms: 8_000,
            persona_mode: PersonaMode::Lazy,
            ..Self::balanced()
        }
    }

    /// Numeric validation. Rejects with a descriptive error instead of
    /// clamping; the run must not start on a bad configuration.
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.probabilities.sum() != 100 {
            return Err(ConsoleError::InvalidConfiguration(format!(
                "action probabilities must sum to 100, got {}",
                self.probabilities.sum()
            )));
        }
        if self.max_txns_per_wallet == 0 {
            return Err(ConsoleError::InvalidConfiguration(
                "max transactions per wallet must be at least 1".into(),
            ));
        }
        if self.max_burst_actions == 0 {
            return Err(ConsoleError::InvalidConfiguration(
                "maximum burst actions must be at least 1".into(),
            ));
        }
        if self.min_amount_eth > self.max_amount_eth {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum amount cannot be greater than maximum amount".into(),
            ));
        }
        if self.min_delay_ms == 0 {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum delay must be greater than zero".into(),
            ));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum delay cannot be greater than maximum delay".into(),
            ));
        }
        if self.min_gas_factor <= 0.0 {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum gas factor must be greater than 0".into(),
            ));
        }
        if self.min_gas_factor > self.max_gas_factor {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum gas factor cannot be greater than maximum gas factor".into(),
            ));
        }
        if self.min_think_time_ms > self.max_think_time_ms {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum think time cannot be greater than maximum think time".into(),
            ));
        }
        if self.min_burst_actions > self.max_burst_actions {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum burst actions cannot be greater than maximum burst actions".into(),
            ));
        }
        if self.min_lull_time_ms > self.max_lull_time_ms {
            return Err(ConsoleError::InvalidConfiguration(
                "minimum lull time cannot be greater than maximum lull time".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_are_valid() {
        RunConfig::balanced().validate().unwrap();
        RunConfig::aggressive().validate().unwrap();
        RunConfig::ultra_slow().validate().unwrap();
    }

    #[test]
    fn test_probability_sum_must_be_exact() {
        let mut config = RunConfig::balanced();
        config.probabilities.send = 61;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 100"));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let mut config = RunConfig::balanced();
        config.min_delay_ms = 50_000;
        assert!(config.validate().is_err());

        let mut config = RunConfig::balanced();
        config.min_amount_eth = 1.0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::balanced();
        config.min_lull_time_ms = config.max_lull_time_ms + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gas_factor_must_be_positive() {
        let mut config = RunConfig::balanced();
        config.min_gas_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_min_delay_is_rejected() {
        let mut config = RunConfig::balanced();
        config.min_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profile_round_trips_through_json() {
        let config = RunConfig::aggressive();
        let json = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_txns_per_wallet, 8);
        assert_eq!(back.persona_mode, PersonaMode::Speedy);
        assert_eq!(back.recipient_mode, config.recipient_mode);
    }
}
