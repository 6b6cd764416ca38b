//! The core session/action state machine. One cooperative async loop
//! owns every piece of mutable run state; suspension points are timed
//! delays and network calls, and the stop flag is honored between
//! actions and sessions, never inside one.

use crate::config::RunConfig;
use crate::dispatch::{self, FeePlan, FeeSnapshot, ProviderSubmitter, RetryPolicy};
use crate::error::{ConsoleError, ConsoleResult};
use crate::logbook::{LogBook, LogRecord, LogStatus};
use crate::observer::ConsoleObserver;
use crate::persona::Persona;
use crate::probability;
use crate::recipient::{self, RecipientBook, Resolution};
use crate::rpc::EndpointManager;
use crate::scanner;
use crate::stealth;
use crate::types::{ActionKind, ActionOutcome, RecipientMode, RunStats, SessionKind, Wallet};
use alloy::network::TransactionBuilder;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{Address, U256};
use chrono::Timelike;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Below this the session is skipped outright (0.001 ETH)
const CRITICAL_BALANCE_WEI: u128 = 1_000_000_000_000_000;
/// Below this the session proceeds with a warning (0.005 ETH)
const LOW_BALANCE_WARN_WEI: u128 = 5_000_000_000_000_000;

const DUMMY_BLOCK_CHANCE: f64 = 10.0;
const DUMMY_GAS_CHANCE: f64 = 10.0;
const DUMMY_BALANCE_CHANCE: f64 = 5.0;

/// Local-time window where the time-of-day bias stretches delays
const NIGHT_START_HOUR: u32 = 1;
const NIGHT_END_HOUR: u32 = 6;

/// Cooperative cancellation flag, checked between actions and sessions
#[derive(Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// All mutable state for one interaction campaign. Only the scheduler
/// loop touches it while a run is in flight, so nothing here needs a
/// lock.
pub struct SessionContext {
    pub config: RunConfig,
    pub wallets: Vec<Wallet>,
    pub endpoints: EndpointManager,
    pub recipients: RecipientBook,
    pub stats: RunStats,
    pub logbook: LogBook,
}

impl SessionContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            wallets: Vec::new(),
            endpoints: EndpointManager::new(),
            recipients: RecipientBook::new(),
            stats: RunStats::default(),
            logbook: LogBook::new(),
        }
    }
}

/// What a finished run looks like
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub log_entries: usize,
}

/// The orchestrator. Borrows the context for the duration of the run.
pub struct SessionScheduler<'a> {
    ctx: &'a mut SessionContext,
    observer: Arc<dyn ConsoleObserver>,
    stop: StopHandle,
    last_chain: Option<u64>,
    /// Previous-period fee reading per chain, the gas-gate baseline
    gas_reference: HashMap<u64, u128>,
}

impl<'a> SessionScheduler<'a> {
    pub fn new(
        ctx: &'a mut SessionContext,
        observer: Arc<dyn ConsoleObserver>,
        stop: StopHandle,
    ) -> Self {
        Self {
            ctx,
            observer,
            stop,
            last_chain: None,
            gas_reference: HashMap::new(),
        }
    }

    /// Drive sessions until stopped or until every chain is exhausted.
    /// Endpoint exhaustion is the only fatal outcome.
    pub async fn run(&mut self) -> ConsoleResult<RunSummary> {
        self.validate_start()?;
        self.ctx.stats = RunStats::default();

        self.log(LogRecord::new(
            LogStatus::Info,
            format!(
                "Starting interaction across {} chains and {} wallets",
                self.ctx.endpoints.chain_count(),
                self.ctx.wallets.len()
            ),
        ));

        if self.ctx.config.recipient_mode == RecipientMode::Pool {
            self.prescan_pools().await;
        }

        loop {
            if self.stop.is_stop_requested() {
                break;
            }

            let Some(chain_id) = self
                .ctx
                .endpoints
                .select_chain(self.last_chain, self.ctx.config.chain_stickiness)
            else {
                self.log(LogRecord::new(
                    LogStatus::Error,
                    "All configured chains exhausted their endpoints. Halting run.",
                ));
                return Err(ConsoleError::EndpointsExhausted);
            };
            self.last_chain = Some(chain_id);

            let Some(url) = self.ctx.endpoints.healthy_endpoint(chain_id).await else {
                self.log(LogRecord::new(
                    LogStatus::Error,
                    format!(
                        "All endpoints for chain {} failed health checks. Chain dropped.",
                        chain_id
                    ),
                ));
                sleep(Duration::from_millis(self.ctx.config.rpc_switch_delay_ms)).await;
                continue;
            };
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!("Using RPC {} for chain {}", url, chain_id),
                )
                .chain(chain_id),
            );

            if self.ctx.endpoints.chain_count() > 1 && self.ctx.config.rpc_switch_delay_ms > 0 {
                sleep(Duration::from_millis(self.ctx.config.rpc_switch_delay_ms)).await;
            }

            self.run_session(chain_id, &url).await;
        }

        self.log(LogRecord::new(
            LogStatus::Success,
            "Interaction process finished.",
        ));
        Ok(RunSummary {
            stats: self.ctx.stats.clone(),
            log_entries: self.ctx.logbook.len(),
        })
    }

    /// Re-check everything that must hold before a run may start.
    /// Invalid states block start; nothing is clamped.
    fn validate_start(&self) -> ConsoleResult<()> {
        self.ctx.config.validate()?;
        if self.ctx.wallets.is_empty() {
            return Err(ConsoleError::NoWallets);
        }
        if self.ctx.endpoints.is_empty() {
            return Err(ConsoleError::NoEndpoints);
        }
        match self.ctx.config.recipient_mode {
            RecipientMode::Fixed => {
                let raw = self.ctx.config.fixed_address.as_deref().unwrap_or("");
                if Address::from_str(raw.trim()).is_err() {
                    return Err(ConsoleError::InvalidConfiguration(
                        "fixed recipient address is missing or invalid".into(),
                    ));
                }
            }
            RecipientMode::List => {
                if self.ctx.recipients.manual_list.is_empty() {
                    return Err(ConsoleError::InvalidConfiguration(
                        "recipient list is empty".into(),
                    ));
                }
            }
            RecipientMode::Predefined => {
                if self.ctx.recipients.predefined_list.is_empty() {
                    return Err(ConsoleError::InvalidConfiguration(
                        "predefined recipient list is empty".into(),
                    ));
                }
            }
            RecipientMode::SelfInteract => {
                if self.ctx.wallets.len() < 2 {
                    return Err(ConsoleError::InvalidConfiguration(
                        "self-interact mode needs at least 2 loaded wallets".into(),
                    ));
                }
            }
            RecipientMode::Pool => {}
        }
        Ok(())
    }

    /// Harvest recipient pools for every chain before the loop starts.
    /// Scan failures are logged and leave the pools unchanged.
    async fn prescan_pools(&mut self) {
        self.log(LogRecord::new(
            LogStatus::Info,
            "Pre-scanning configured chains for recipient pool addresses...",
        ));
        for chain_id in self.ctx.endpoints.chain_ids() {
            let Some(url) = self.ctx.endpoints.healthy_endpoint(chain_id).await else {
                self.log(LogRecord::new(
                    LogStatus::Warning,
                    format!("No healthy endpoint to scan chain {}", chain_id),
                ));
                continue;
            };
            let provider = match EndpointManager::connect(&url) {
                Ok(provider) => provider,
                Err(e) => {
                    self.log(LogRecord::new(LogStatus::Warning, e.to_string()));
                    continue;
                }
            };
            let lookback = self.ctx.config.block_lookback;
            match scanner::scan_recent_blocks(&provider, chain_id, lookback, &mut self.ctx.recipients)
                .await
            {
                Ok(added) => self.log(
                    LogRecord::new(
                        LogStatus::Success,
                        format!(
                            "Found {} new addresses. Pool for chain {} holds {}.",
                            added,
                            chain_id,
                            self.ctx.recipients.pool_size(chain_id)
                        ),
                    )
                    .chain(chain_id),
                ),
                Err(e) => self.log(
                    LogRecord::new(
                        LogStatus::Error,
                        format!("Failed to scan blocks for chain {}: {}", chain_id, e),
                    )
                    .chain(chain_id),
                ),
            }
        }
        self.log(LogRecord::new(LogStatus::Info, "Pre-scanning complete."));
    }

    /// One wallet session on one chain: idle check, balance gate, burst
    /// sizing, then the per-action loop and the closing delay.
    async fn run_session(&mut self, chain_id: u64, url: &str) {
        let idx = rand::thread_rng().gen_range(0..self.ctx.wallets.len());
        let (address, persona, probs) = {
            let wallet = &self.ctx.wallets[idx];
            (
                wallet.address,
                wallet.persona.clone(),
                wallet.session_probabilities,
            )
        };

        self.log(
            LogRecord::new(
                LogStatus::Info,
                format!(
                    "Initiating session for wallet {} on chain {}. Persona: {}",
                    short(address),
                    chain_id,
                    persona.name
                ),
            )
            .chain(chain_id)
            .wallet(address)
            .persona(&persona.name, &persona.user_agent),
        );

        if self.ctx.wallets.len() > 1 && self.ctx.config.wallet_switch_delay_ms > 0 {
            sleep(Duration::from_millis(self.ctx.config.wallet_switch_delay_ms)).await;
        }

        // Fully idle session, decided by the persona
        if stealth::percent_roll(persona.idle_chance * 100.0) {
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!(
                        "Wallet {} is idling for this session on chain {} (persona idle)",
                        short(address),
                        chain_id
                    ),
                )
                .chain(chain_id)
                .wallet(address)
                .action(ActionKind::Idle),
            );
            self.ctx.stats.record_session_idle();
            self.observer.on_stats_changed(&self.ctx.stats);
            self.session_pace(persona.delay_factor).await;
            return;
        }

        // Key material leaves the wallet only here, for this session's
        // submitter, and is dropped with it.
        let signer = match self.ctx.wallets[idx].key.signer() {
            Ok(signer) => signer,
            Err(e) => {
                self.log(
                    LogRecord::new(
                        LogStatus::Error,
                        format!("Could not materialize signer for {}: {}", short(address), e),
                    )
                    .wallet(address),
                );
                self.ctx.stats.record_session_skip();
                self.session_pace(persona.delay_factor).await;
                return;
            }
        };
        let submitter = match ProviderSubmitter::connect(url, signer) {
            Ok(submitter) => submitter,
            Err(e) => {
                self.log(LogRecord::new(LogStatus::Error, e.to_string()).chain(chain_id));
                self.ctx.stats.record_session_skip();
                self.session_pace(persona.delay_factor).await;
                return;
            }
        };
        let provider = submitter.provider().clone();

        // Balance gate before anything that could move funds
        match provider.get_balance(address).await {
            Ok(balance) => {
                self.ctx.wallets[idx].balance_wei = balance;
                if balance < U256::from(CRITICAL_BALANCE_WEI) {
                    self.log(
                        LogRecord::new(
                            LogStatus::Warning,
                            format!(
                                "Skipping wallet {} on chain {} due to critically low balance ({} ETH)",
                                short(address),
                                chain_id,
                                format_eth(balance)
                            ),
                        )
                        .chain(chain_id)
                        .wallet(address),
                    );
                    self.ctx.stats.record_session_skip();
                    self.observer.on_stats_changed(&self.ctx.stats);
                    self.session_pace(persona.delay_factor).await;
                    return;
                } else if balance < U256::from(LOW_BALANCE_WARN_WEI) {
                    self.log(
                        LogRecord::new(
                            LogStatus::Warning,
                            format!(
                                "Wallet {} on chain {} has low balance ({} ETH)",
                                short(address),
                                chain_id,
                                format_eth(balance)
                            ),
                        )
                        .chain(chain_id)
                        .wallet(address),
                    );
                }
            }
            Err(e) => {
                self.log(
                    LogRecord::new(
                        LogStatus::Error,
                        format!(
                            "Failed to check balance for {} on chain {}: {}. Skipping session.",
                            short(address),
                            chain_id,
                            e
                        ),
                    )
                    .chain(chain_id)
                    .wallet(address),
                );
                self.ctx.stats.record_session_skip();
                self.observer.on_stats_changed(&self.ctx.stats);
                self.session_pace(persona.delay_factor).await;
                return;
            }
        }

        let (actions, session_kind) = session_length(&self.ctx.config);
        if session_kind == SessionKind::Burst {
            self.log(LogRecord::new(
                LogStatus::Info,
                format!(
                    "Wallet {} entered an activity burst, performing {} actions",
                    short(address),
                    actions
                ),
            ));
        }
        self.log(LogRecord::new(
            LogStatus::Info,
            format!(
                "Wallet {} will perform {} action(s) on chain {}",
                short(address),
                actions,
                chain_id
            ),
        ));

        for i in 1..=actions {
            if self.stop.is_stop_requested() {
                break;
            }
            self.ctx.stats.begin_action();

            // Gas-price ceiling gate against the previous fee reading
            let mut fee_snapshot = None;
            match dispatch::fetch_fee_snapshot(&provider).await {
                Ok(snapshot) => {
                    let fresh = snapshot.effective_price();
                    let reference = self.gas_reference.insert(chain_id, fresh);
                    if let Some(reference) = reference {
                        if gas_gate_trips(reference, fresh, self.ctx.config.gas_multiplier) {
                            self.log(
                                LogRecord::new(
                                    LogStatus::Warning,
                                    format!(
                                        "Gas price ({} gwei) is too high. Skipping remaining actions for {} on chain {}.",
                                        fresh / 1_000_000_000,
                                        short(address),
                                        chain_id
                                    ),
                                )
                                .chain(chain_id)
                                .wallet(address),
                            );
                            self.ctx.stats.record_skip();
                            self.observer.on_stats_changed(&self.ctx.stats);
                            break;
                        }
                    }
                    fee_snapshot = Some(snapshot);
                }
                Err(e) => {
                    self.log(
                        LogRecord::new(
                            LogStatus::Warning,
                            format!(
                                "Failed to read fees on chain {}: {}. Proceeding without high gas check.",
                                chain_id, e
                            ),
                        )
                        .chain(chain_id),
                    );
                }
            }

            self.maybe_dummy_call(&provider).await;
            if self.stop.is_stop_requested() {
                break;
            }

            let chosen = probability::choose_action(&probs);
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!(
                        "[Action {}/{}] Wallet {} chose to: {}",
                        i,
                        actions,
                        short(address),
                        chosen
                    ),
                )
                .chain(chain_id)
                .wallet(address)
                .action(chosen),
            );

            let outcome = match chosen {
                ActionKind::Send => {
                    self.perform_send(address, &persona, chain_id, &submitter, fee_snapshot)
                        .await
                }
                ActionKind::Idle => {
                    self.log(
                        LogRecord::new(
                            LogStatus::Info,
                            format!("Wallet {} is idling for this action", short(address)),
                        )
                        .chain(chain_id)
                        .wallet(address)
                        .action(ActionKind::Idle)
                        .persona(&persona.name, &persona.user_agent),
                    );
                    ActionOutcome::Success
                }
                ActionKind::BalanceCheck => match provider.get_balance(address).await {
                    Ok(balance) => {
                        self.ctx.wallets[idx].balance_wei = balance;
                        self.log(
                            LogRecord::new(
                                LogStatus::Info,
                                format!(
                                    "Wallet {} checked balance: {} ETH",
                                    short(address),
                                    format_eth(balance)
                                ),
                            )
                            .chain(chain_id)
                            .wallet(address)
                            .action(ActionKind::BalanceCheck)
                            .persona(&persona.name, &persona.user_agent),
                        );
                        ActionOutcome::Success
                    }
                    Err(e) => {
                        self.log(
                            LogRecord::new(
                                LogStatus::Error,
                                format!(
                                    "Failed to check balance for {}: {}",
                                    short(address),
                                    e
                                ),
                            )
                            .chain(chain_id)
                            .wallet(address)
                            .action(ActionKind::BalanceCheck),
                        );
                        ActionOutcome::Skipped
                    }
                },
            };

            match outcome {
                ActionOutcome::Success => self.ctx.stats.record_success(chosen),
                ActionOutcome::Failed => self.ctx.stats.record_failure(),
                ActionOutcome::Skipped => self.ctx.stats.record_skip(),
            }
            self.observer.on_action_recorded(chosen, outcome);
            self.observer.on_stats_changed(&self.ctx.stats);

            // Balance refresh after every action
            match provider.get_balance(address).await {
                Ok(balance) => self.ctx.wallets[idx].balance_wei = balance,
                Err(e) => {
                    self.log(LogRecord::new(
                        LogStatus::Warning,
                        format!("Failed to update balance for {}: {}", short(address), e),
                    ));
                }
            }

            if i < actions && !self.stop.is_stop_requested() {
                self.inter_action_delay(&persona).await;
            }
        }

        if self.stop.is_stop_requested() {
            return;
        }

        // Burst sessions cool off with a lull instead of the normal delay
        if session_kind == SessionKind::Burst && self.ctx.config.min_lull_time_ms > 0 {
            let delay = stealth::log_normal_delay(
                self.ctx.config.min_lull_time_ms,
                self.ctx.config.max_lull_time_ms,
                persona.delay_factor,
            );
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!(
                        "Activity burst completed. Entering lull period for {} seconds...",
                        delay.as_secs()
                    ),
                )
                .delay_ms(delay.as_millis() as u64),
            );
            sleep(delay).await;
        } else {
            let delay = stealth::log_normal_delay(
                self.ctx.config.min_delay_ms,
                self.ctx.config.max_delay_ms,
                persona.delay_factor,
            );
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!(
                        "Session for wallet {} on chain {} completed. Waiting {} seconds before next session...",
                        short(address),
                        chain_id,
                        delay.as_secs()
                    ),
                )
                .delay_ms(delay.as_millis() as u64),
            );
            sleep(delay).await;
        }
    }

    /// Resolve a destination, build the transfer, and dispatch it
    async fn perform_send(
        &mut self,
        sender: Address,
        persona: &Persona,
        chain_id: u64,
        submitter: &ProviderSubmitter,
        fee_snapshot: Option<FeeSnapshot>,
    ) -> ActionOutcome {
        let resolution = recipient::resolve(
            self.ctx.config.recipient_mode,
            self.ctx.config.fixed_address.as_deref(),
            sender,
            chain_id,
            &self.ctx.recipients,
            &self.ctx.wallets,
        );
        let destination = match resolution {
            Resolution::Recipient(address) => address,
            Resolution::Skip(reason) => {
                self.log(
                    LogRecord::new(
                        LogStatus::Warning,
                        format!("{}. Skipping send for wallet {}.", reason, short(sender)),
                    )
                    .chain(chain_id)
                    .wallet(sender)
                    .action(ActionKind::Send),
                );
                return ActionOutcome::Skipped;
            }
        };

        let amount_eth = stealth::uniform(
            self.ctx.config.min_amount_eth,
            self.ctx.config.max_amount_eth,
        );
        let gas_factor = stealth::uniform(
            self.ctx.config.min_gas_factor,
            self.ctx.config.max_gas_factor,
        );

        let mut tx = TransactionRequest::default()
            .with_to(destination)
            .with_value(dispatch::eth_to_wei(amount_eth));
        if let Some(snapshot) = fee_snapshot {
            tx = FeePlan::from_snapshot(snapshot, gas_factor).apply(tx);
        }
        self.log(LogRecord::new(
            LogStatus::Info,
            format!("Attempting to send with random gas factor: x{:.2}", gas_factor),
        ));

        if self.ctx.config.nonce_jitter > 0 {
            match submitter.provider().get_transaction_count(sender).await {
                Ok(count) => {
                    let offset = stealth::uniform(0.0, self.ctx.config.nonce_jitter as f64)
                        .floor() as u64;
                    tx = tx.with_nonce(count + offset);
                    self.log(LogRecord::new(
                        LogStatus::Info,
                        format!("Nonce jitter applied: using nonce {}", count + offset),
                    ));
                }
                Err(e) => {
                    self.log(LogRecord::new(
                        LogStatus::Warning,
                        format!(
                            "Failed to get nonce for {}: {}. Leaving it to the provider.",
                            short(sender),
                            e
                        ),
                    ));
                }
            }
        }

        let report = dispatch::send_with_retry(
            submitter,
            tx,
            RetryPolicy::new(self.ctx.config.max_retries),
            self.ctx.config.simulated_error_chance,
        )
        .await;

        if report.success {
            self.log(
                LogRecord::new(
                    LogStatus::Success,
                    format!(
                        "Transaction sent successfully to {} with {} ETH (hash {})",
                        short(destination),
                        amount_eth,
                        report.tx_hash.map(|h| h.to_string()).unwrap_or_default()
                    ),
                )
                .chain(chain_id)
                .wallet(sender)
                .action(ActionKind::Send)
                .gas_factor(gas_factor)
                .persona(&persona.name, &persona.user_agent),
            );
            ActionOutcome::Success
        } else if report.skipped_after_retries {
            self.log(
                LogRecord::new(
                    LogStatus::Skipped,
                    format!("Transaction skipped after max retries ({} attempts)", report.attempts),
                )
                .chain(chain_id)
                .wallet(sender)
                .action(ActionKind::Send)
                .gas_factor(gas_factor),
            );
            ActionOutcome::Skipped
        } else {
            self.log(
                LogRecord::new(LogStatus::Error, "Transaction failed.")
                    .chain(chain_id)
                    .wallet(sender)
                    .action(ActionKind::Send)
                    .gas_factor(gas_factor)
                    .persona(&persona.name, &persona.user_agent),
            );
            ActionOutcome::Failed
        }
    }

    /// Occasional harmless read calls, purely for traffic shape
    async fn maybe_dummy_call(&mut self, provider: &DynProvider) {
        if stealth::percent_roll(DUMMY_BLOCK_CHANCE) {
            match provider.get_block_number().await {
                Ok(number) => info!(number, "dummy block number check"),
                Err(e) => warn!(error = %e, "dummy block number check failed"),
            }
        }
        if stealth::percent_roll(DUMMY_GAS_CHANCE) {
            match provider.get_gas_price().await {
                Ok(price) => info!(price, "dummy gas price check"),
                Err(e) => warn!(error = %e, "dummy gas price check failed"),
            }
        }
        if stealth::percent_roll(DUMMY_BALANCE_CHANCE) && !self.ctx.wallets.is_empty() {
            let address = self
                .ctx
                .wallets
                .choose(&mut rand::thread_rng())
                .map(|w| w.address);
            if let Some(address) = address {
                match provider.get_balance(address).await {
                    Ok(balance) => {
                        info!(wallet = %short(address), balance = %format_eth(balance), "dummy balance check")
                    }
                    Err(e) => warn!(error = %e, "dummy balance check failed"),
                }
            }
        }
    }

    /// Delay between actions: optional think time, optional night bias,
    /// always scaled by the persona delay factor.
    async fn inter_action_delay(&mut self, persona: &Persona) {
        let mut min_ms = self.ctx.config.min_delay_ms as f64;
        let mut max_ms = self.ctx.config.max_delay_ms as f64;

        if self.ctx.config.enable_time_of_day_bias {
            let hour = chrono::Local::now().hour();
            if let Some((biased_min, biased_max)) =
                night_bias(min_ms, max_ms, hour, persona.idle_chance)
            {
                min_ms = biased_min;
                max_ms = biased_max;
                self.log(LogRecord::new(
                    LogStatus::Info,
                    "Applying time-of-day bias: increased delay for night hours.",
                ));
            }
        }

        if stealth::percent_roll(f64::from(self.ctx.config.think_time_chance)) {
            let delay = stealth::log_normal_delay(
                self.ctx.config.min_think_time_ms,
                self.ctx.config.max_think_time_ms,
                persona.delay_factor,
            );
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!(
                        "Waiting for a human-like think time of {} seconds...",
                        delay.as_secs()
                    ),
                )
                .delay_ms(delay.as_millis() as u64),
            );
            sleep(delay).await;
        } else {
            let delay_ms = stealth::log_normal_delay_ms(min_ms, max_ms, persona.delay_factor);
            let delay = Duration::from_millis(delay_ms.max(0.0) as u64);
            self.log(
                LogRecord::new(
                    LogStatus::Info,
                    format!("Waiting {} seconds before next action...", delay.as_secs()),
                )
                .delay_ms(delay.as_millis() as u64),
            );
            sleep(delay).await;
        }
    }

    /// Standard pacing after an idle or skipped session
    async fn session_pace(&mut self, delay_factor: f64) {
        let delay = stealth::log_normal_delay(
            self.ctx.config.min_delay_ms,
            self.ctx.config.max_delay_ms,
            delay_factor,
        );
        sleep(delay).await;
    }

    fn log(&mut self, record: LogRecord) {
        match record.status {
            LogStatus::Error => error!("{}", record.details),
            LogStatus::Warning | LogStatus::Skipped => warn!("{}", record.details),
            _ => info!("{}", record.details),
        }
        let stored = self.ctx.logbook.append(record);
        self.observer.on_log(stored);
    }
}

/// Decide how many actions the session runs and whether it is a burst
fn session_length(config: &RunConfig) -> (u32, SessionKind) {
    if stealth::percent_roll(f64::from(config.activity_burst_chance)) {
        let drawn = stealth::uniform(
            config.min_burst_actions as f64,
            (config.max_burst_actions + 1) as f64,
        )
        .floor() as u32;
        (drawn.clamp(1, config.max_burst_actions), SessionKind::Burst)
    } else {
        let drawn =
            stealth::uniform(1.0, (config.max_txns_per_wallet + 1) as f64).floor() as u32;
        (drawn.clamp(1, config.max_txns_per_wallet), SessionKind::Normal)
    }
}

/// True when the fresh fee reading exceeds the previous reading scaled
/// by the configured multiplier. Integer percent math, no floats on wei.
fn gas_gate_trips(reference: u128, fresh: u128, multiplier: f64) -> bool {
    let pct = (multiplier * 100.0).round() as u128;
    fresh > reference * pct / 100
}

/// Night hours stretch pacing by (2 + persona idle chance)
fn night_bias(min_ms: f64, max_ms: f64, hour: u32, idle_chance: f64) -> Option<(f64, f64)> {
    if (NIGHT_START_HOUR..NIGHT_END_HOUR).contains(&hour) {
        let factor = 2.0 + idle_chance;
        Some((min_ms * factor, max_ms * factor))
    } else {
        None
    }
}

fn short(address: Address) -> String {
    let full = address.to_string();
    format!("...{}", &full[full.len() - 6..])
}

fn format_eth(balance: U256) -> String {
    let wei: u128 = balance.try_into().unwrap_or(u128::MAX);
    format!("{:.6}", wei as f64 / 1e18)
}
