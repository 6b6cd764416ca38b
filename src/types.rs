use crate::error::{ConsoleError, ConsoleResult};
use crate::persona::Persona;
use crate::probability::SessionProbabilities;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Raw private key material, redacted in debug output and wiped on drop.
/// Only the dispatcher turns this into a signer, and only at use time.
pub struct SecretKeyMaterial(String);

impl SecretKeyMaterial {
    pub fn new(hex_key: &str) -> ConsoleResult<Self> {
        let trimmed = hex_key.trim().trim_start_matches("0x");
        let bytes = hex::decode(trimmed)
            .map_err(|e| ConsoleError::WalletLoad(format!("not valid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(ConsoleError::WalletLoad(format!(
                "expected 32 key bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Materialize a signer from the stored key
    pub fn signer(&self) -> ConsoleResult<PrivateKeySigner> {
        let bytes = hex::decode(&self.0)
            .map_err(|e| ConsoleError::WalletLoad(format!("not valid hex: {}", e)))?;
        let key = B256::from_slice(&bytes);
        PrivateKeySigner::from_bytes(&key)
            .map_err(|e| ConsoleError::WalletLoad(format!("invalid secp256k1 key: {}", e)))
    }
}

impl fmt::Debug for SecretKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKeyMaterial(<redacted>)")
    }
}

impl Drop for SecretKeyMaterial {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A loaded wallet with its session behavior baked in at load time
#[derive(Debug)]
pub struct Wallet {
    pub address: Address,
    pub key: SecretKeyMaterial,
    pub balance_wei: U256,
    pub session_probabilities: SessionProbabilities,
    pub persona: Persona,
}

impl Wallet {
    /// Short display form used in log lines
    pub fn short_address(&self) -> String {
        let full = self.address.to_string();
        format!("...{}", &full[full.len() - 6..])
    }
}

/// Behavior chosen for a single action inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Send,
    Idle,
    BalanceCheck,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Send => f.write_str("send"),
            ActionKind::Idle => f.write_str("idle"),
            ActionKind::BalanceCheck => f.write_str("balance-check"),
        }
    }
}

/// How an action concluded, for stats and observer callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failed,
    Skipped,
}

/// Session sizing: a normal session or an activity burst followed by a lull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Normal,
    Burst,
}

/// How transfer destinations are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipientMode {
    Fixed,
    List,
    Predefined,
    SelfInteract,
    Pool,
}

impl FromStr for RecipientMode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(RecipientMode::Fixed),
            "list" => Ok(RecipientMode::List),
            "predefined" => Ok(RecipientMode::Predefined),
            "self-interact" => Ok(RecipientMode::SelfInteract),
            "pool" => Ok(RecipientMode::Pool),
            other => Err(ConsoleError::InvalidConfiguration(format!(
                "unknown recipient mode '{}'",
                other
            ))),
        }
    }
}

/// Running statistics for one interaction campaign.
/// Reset at run start, mutated exactly once per completed action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_actions: u64,
    pub successful_actions: u64,
    pub failed_actions: u64,
    pub counts: ActionCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionCounts {
    pub send: u64,
    pub idle: u64,
    pub balance_check: u64,
    pub skipped: u64,
}

impl RunStats {
    /// Count an action as started (before its outcome is known)
    pub fn begin_action(&mut self) {
        self.total_actions += 1;
    }

    pub fn record_success(&mut self, kind: ActionKind) {
        self.successful_actions += 1;
        match kind {
            ActionKind::Send => self.counts.send += 1,
            ActionKind::Idle => self.counts.idle += 1,
            ActionKind::BalanceCheck => self.counts.balance_check += 1,
        }
    }

    /// A hard failure. Never used for retry exhaustion or read errors,
    /// which are skips.
    pub fn record_failure(&mut self) {
        self.failed_actions += 1;
        self.counts.skipped += 1;
    }

    /// A skipped action: gas gate, resolver miss, read error, retry
    /// exhaustion. Does not touch the failure counter.
    pub fn record_skip(&mut self) {
        self.counts.skipped += 1;
    }

    /// Tally a session-level idle (not counted as an action)
    pub fn record_session_idle(&mut self) {
        self.counts.idle += 1;
    }

    /// Tally a session-level skip (not counted as an action)
    pub fn record_session_skip(&mut self) {
        self.counts.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_material_rejects_bad_input() {
        assert!(SecretKeyMaterial::new("nothex").is_err());
        assert!(SecretKeyMaterial::new("0xdeadbeef").is_err());
    }

    #[test]
    fn test_key_material_accepts_32_bytes() {
        let key = "0x".to_string() + &"11".repeat(32);
        let material = SecretKeyMaterial::new(&key).unwrap();
        let signer = material.signer().unwrap();
        assert_ne!(signer.address(), Address::ZERO);
    }

    #[test]
    fn test_key_material_debug_is_redacted() {
        let key = "22".repeat(32);
        let material = SecretKeyMaterial::new(&key).unwrap();
        assert!(!format!("{:?}", material).contains("22"));
    }

    #[test]
    fn test_recipient_mode_parsing() {
        assert_eq!(
            "self-interact".parse::<RecipientMode>().unwrap(),
            RecipientMode::SelfInteract
        );
        assert!("teleport".parse::<RecipientMode>().is_err());
    }

    #[test]
    fn test_skip_does_not_count_as_failure() {
        let mut stats = RunStats::default();
        stats.begin_action();
        stats.record_skip();
        assert_eq!(stats.total_actions, 1);
        assert_eq!(stats.failed_actions, 0);
        assert_eq!(stats.counts.skipped, 1);
    }

    #[test]
    fn test_success_accounting() {
        let mut stats = RunStats::default();
        stats.begin_action();
        stats.record_success(ActionKind::BalanceCheck);
        assert_eq!(stats.successful_actions, 1);
        assert_eq!(stats.counts.balance_check, 1);
        assert_eq!(stats.counts.skipped, 0);
    }
}
