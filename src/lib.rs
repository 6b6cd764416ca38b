// src/lib.rs
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logbook;
pub mod observer;
pub mod persona;
pub mod probability;
pub mod recipient;
pub mod rpc;
pub mod scanner;
pub mod scheduler;
pub mod stealth;
pub mod types;

pub use config::RunConfig;
pub use error::{ConsoleError, ConsoleResult};
pub use logbook::{LogBook, LogRecord, LogStatus};
pub use observer::{ConsoleObserver, NullObserver};
pub use persona::{Persona, PersonaManager, PersonaMode};
pub use rpc::ProbeReport;
pub use scheduler::{RunSummary, SessionContext, SessionScheduler, StopHandle};
pub use types::{ActionKind, ActionOutcome, RecipientMode, RunStats, Wallet};

use crate::probability::compute_session_probabilities;
use crate::types::SecretKeyMaterial;
use alloy_primitives::U256;
use std::sync::Arc;
use tracing::{info, warn};

/// Front door for one interaction campaign: load keys and endpoints,
/// tune the configuration, then drive the scheduler until stopped.
pub struct Console {
    ctx: SessionContext,
    personas: PersonaManager,
    observer: Arc<dyn ConsoleObserver>,
    stop: StopHandle,
}

impl Console {
    /// Create a console with a validated configuration
    pub fn new(config: RunConfig) -> ConsoleResult<Self> {
        config.validate()?;
        let personas = PersonaManager::new(config.wallet_idle_chance);
        Ok(Self {
            ctx: SessionContext::new(config),
            personas,
            observer: Arc::new(NullObserver),
            stop: StopHandle::new(),
        })
    }

    /// Attach a presentation-layer observer
    pub fn with_observer(mut self, observer: Arc<dyn ConsoleObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Swap in a new configuration between runs
    pub fn set_config(&mut self, config: RunConfig) -> ConsoleResult<()> {
        config.validate()?;
        self.personas = PersonaManager::new(config.wallet_idle_chance);
        self.ctx.config = config;
        Ok(())
    }

    pub fn config(&self) -> &RunConfig {
        &self.ctx.config
    }

    /// Load private keys, one hex key per line. Each wallet gets its
    /// jittered session distribution and a persona at load time. Bad
    /// keys are logged and skipped; returns the number loaded.
    pub fn load_wallets(&mut self, keys_text: &str) -> usize {
        let config = self.ctx.config.clone();
        let mut loaded = 0;
        for (index, line) in keys_text
            .lines()
            .map(str::trim)
            .enumerate()
            .filter(|(_, l)| !l.is_empty())
        {
            let key = match SecretKeyMaterial::new(line) {
                Ok(key) => key,
                Err(e) => {
                    warn!(key_index = index + 1, error = %e, "failed to load key");
                    continue;
                }
            };
            let address = match key.signer() {
                Ok(signer) => signer.address(),
                Err(e) => {
                    warn!(key_index = index + 1, error = %e, "failed to load key");
                    continue;
                }
            };

            let persona = self.personas.persona_by_mode(config.persona_mode);
            info!(
                wallet = %address,
                persona = %persona.name,
                delay_factor = persona.delay_factor,
                idle_pct = (persona.idle_chance * 100.0).round(),
                "assigned persona"
            );

            self.ctx.wallets.push(Wallet {
                address,
                key,
                balance_wei: U256::ZERO,
                session_probabilities: compute_session_probabilities(
                    &config.probabilities,
                    config.prob_jitter_factor,
                ),
                persona,
            });
            loaded += 1;
        }
        info!(loaded, "wallets loaded");
        loaded
    }

    /// Parse newline-separated `url,chainId` endpoint entries
    pub fn load_rpc_endpoints(&mut self, text: &str) -> usize {
        self.ctx.endpoints.load_lines(text)
    }

    /// Load the manual recipient list; returns (valid, invalid) counts
    pub fn load_recipient_list(&mut self, text: &str) -> (usize, usize) {
        let (valid, invalid) = recipient::parse_address_list(text);
        let count = valid.len();
        self.ctx.recipients.manual_list = valid;
        (count, invalid)
    }

    /// Load the predefined recipient list; returns (valid, invalid) counts
    pub fn load_predefined_list(&mut self, text: &str) -> (usize, usize) {
        let (valid, invalid) = recipient::parse_address_list(text);
        let count = valid.len();
        self.ctx.recipients.predefined_list = valid;
        (count, invalid)
    }

    /// Change persona mode: every loaded wallet gets a fresh persona
    /// and a freshly jittered session distribution, in place
    pub fn set_persona_mode(&mut self, mode: PersonaMode) {
        self.ctx.config.persona_mode = mode;
        let config = self.ctx.config.clone();
        for wallet in &mut self.ctx.wallets {
            wallet.persona = self.personas.persona_by_mode(mode);
            wallet.session_probabilities = compute_session_probabilities(
                &config.probabilities,
                config.prob_jitter_factor,
            );
            info!(
                wallet = %wallet.address,
                persona = %wallet.persona.name,
                "re-assigned persona"
            );
        }
    }

    /// Handle for requesting a cooperative stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Probe every configured endpoint without mutating anything
    pub async fn test_connections(&self) -> Vec<ProbeReport> {
        self.ctx.endpoints.probe_all().await
    }

    /// Run the campaign until stopped or fatally out of endpoints.
    /// Stats and the log book reset at start, as a fresh run.
    pub async fn run(&mut self) -> ConsoleResult<RunSummary> {
        self.stop.reset();
        self.ctx.logbook.clear();
        let mut scheduler =
            SessionScheduler::new(&mut self.ctx, self.observer.clone(), self.stop.clone());
        scheduler.run().await
    }

    pub fn wallet_count(&self) -> usize {
        self.ctx.wallets.len()
    }

    pub fn stats(&self) -> &RunStats {
        &self.ctx.stats
    }

    pub fn logbook(&self) -> &LogBook {
        &self.ctx.logbook
    }

    pub fn export_log_csv(&self) -> String {
        self.ctx.logbook.export_csv()
    }

    pub fn export_log_json(&self) -> ConsoleResult<String> {
        self.ctx.logbook.export_json()
    }

    /// Discard wallets, endpoints, recipient data, stats, and logs
    pub fn clear_all(&mut self) {
        self.stop.reset();
        self.ctx.wallets.clear();
        self.ctx.endpoints.clear();
        self.ctx.recipients.clear();
        self.ctx.stats = RunStats::default();
        self.ctx.logbook.clear();
        info!("cleared all loaded data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_line(byte: u8) -> String {
        format!("{:02x}", byte).repeat(32)
    }

    fn test_config() -> RunConfig {
        let mut config = RunConfig::balanced();
        config.rpc_switch_delay_ms = 1;
        config.wallet_switch_delay_ms = 1;
        config.min_delay_ms = 1;
        config.max_delay_ms = 2;
        config
    }

    #[test]
    fn test_load_wallets_skips_bad_keys() {
        let mut console = Console::new(test_config()).unwrap();
        let keys = format!("{}\nnot-a-key\n\n{}\n", key_line(1), key_line(2));
        assert_eq!(console.load_wallets(&keys), 2);
        assert_eq!(console.wallet_count(), 2);
    }

    #[test]
    fn test_loaded_wallets_have_normalized_probabilities() {
        let mut console = Console::new(test_config()).unwrap();
        console.load_wallets(&format!("{}\n{}", key_line(3), key_line(4)));
        for wallet in &console.ctx.wallets {
            let probs = &wallet.session_probabilities;
            let sum = probs.send + probs.idle + probs.balance_check;
            assert!((sum - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_persona_mode_change_reassigns_in_place() {
        let mut console = Console::new(test_config()).unwrap();
        console.load_wallets(&format!("{}\n{}\n{}", key_line(5), key_line(6), key_line(7)));
        console.set_persona_mode(PersonaMode::Lazy);
        assert!(console.ctx.wallets.iter().all(|w| w.persona.name == "lazy"));
        assert_eq!(console.config().persona_mode, PersonaMode::Lazy);
    }

    #[tokio::test]
    async fn test_run_requires_wallets() {
        let mut console = Console::new(test_config()).unwrap();
        console.load_rpc_endpoints("http://127.0.0.1:8545,31337\n");
        let err = console.run().await.unwrap_err();
        assert!(matches!(err, ConsoleError::NoWallets));
    }

    #[tokio::test]
    async fn test_run_requires_endpoints() {
        let mut console = Console::new(test_config()).unwrap();
        console.load_wallets(&format!("{}\n{}", key_line(8), key_line(9)));
        let err = console.run().await.unwrap_err();
        assert!(matches!(err, ConsoleError::NoEndpoints));
    }

    #[tokio::test]
    async fn test_run_halts_when_last_chain_is_exhausted() {
        // Port 9 (discard) refuses connections, so the only endpoint of
        // the only chain fails its health check, the chain is dropped,
        // and the run ends fatally.
        let mut console = Console::new(test_config()).unwrap();
        console.load_wallets(&format!("{}\n{}", key_line(10), key_line(11)));
        console.load_rpc_endpoints("http://127.0.0.1:9,31337\n");
        let err = console.run().await.unwrap_err();
        assert!(matches!(err, ConsoleError::EndpointsExhausted));
        assert!(!console.logbook().is_empty());
    }

    #[test]
    fn test_invalid_config_blocks_construction() {
        let mut config = RunConfig::balanced();
        config.probabilities.send = 99;
        assert!(Console::new(config).is_err());
    }

    #[test]
    fn test_clear_all_discards_everything() {
        let mut console = Console::new(test_config()).unwrap();
        console.load_wallets(&key_line(12));
        console.load_rpc_endpoints("http://127.0.0.1:8545,1\n");
        console.load_recipient_list("0x000000000000000000000000000000000000dEaD\n");
        console.clear_all();
        assert_eq!(console.wallet_count(), 0);
        assert!(console.ctx.endpoints.is_empty());
        assert!(console.logbook().is_empty());
    }
}
