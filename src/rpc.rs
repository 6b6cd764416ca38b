//! RPC endpoint bookkeeping: chain-grouped fallback lists, raw JSON-RPC
//! health probes, strike-based removal, and provider construction.

use crate::error::{ConsoleError, ConsoleResult};
use crate::stealth;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Consecutive health-check failures before an endpoint is permanently
/// removed from its chain group.
pub const MAX_ENDPOINT_STRIKES: u32 = 3;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// One configured endpoint. First-listed per chain is primary; later
/// entries are fallbacks tried in order.
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub url: String,
    pub chain_id: u64,
    strikes: u32,
}

/// Result of a one-off connectivity probe
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub chain_id: u64,
    pub ok: bool,
    pub detail: String,
}

/// Chain-grouped endpoint set. An emptied group is dropped immediately,
/// so a chain is never left active with zero endpoints.
pub struct EndpointManager {
    groups: HashMap<u64, Vec<RpcEndpoint>>,
    client: reqwest::Client,
}

impl EndpointManager {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            client: reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Parse newline-separated `url,chainId` pairs. Malformed lines are
    /// logged and skipped. Returns the number of endpoints accepted.
    pub fn load_lines(&mut self, text: &str) -> usize {
        let mut accepted = 0;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut parts = line.splitn(2, ',');
            let url = parts.next().unwrap_or_default().trim();
            let chain = parts.next().unwrap_or_default().trim().parse::<u64>();
            match chain {
                Ok(chain_id) if !url.is_empty() => {
                    self.groups.entry(chain_id).or_default().push(RpcEndpoint {
                        url: url.to_string(),
                        chain_id,
                        strikes: 0,
                    });
                    accepted += 1;
                }
                _ => warn!(line, "ignoring RPC entry, expected 'url,chainId'"),
            }
        }
        accepted
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn chain_count(&self) -> usize {
        self.groups.len()
    }

    pub fn endpoint_count(&self, chain_id: u64) -> usize {
        self.groups.get(&chain_id).map(Vec::len).unwrap_or(0)
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.groups.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Pick the chain for the next session, with a stickiness chance of
    /// reusing the previous one instead of re-randomizing.
    pub fn select_chain(&self, last: Option<u64>, stickiness_pct: u32) -> Option<u64> {
        if let Some(chain_id) = last {
            if self.groups.contains_key(&chain_id)
                && stealth::percent_roll(f64::from(stickiness_pct))
            {
                return Some(chain_id);
            }
        }
        self.chain_ids().choose(&mut rand::thread_rng()).copied()
    }

    /// Record a failed health check. Removes the endpoint at the strike
    /// limit and drops the chain once its group empties. Returns true if
    /// the endpoint was removed.
    pub fn record_failure(&mut self, chain_id: u64, url: &str) -> bool {
        let Some(group) = self.groups.get_mut(&chain_id) else {
            return false;
        };
        let mut removed = false;
        if let Some(endpoint) = group.iter_mut().find(|e| e.url == url) {
            endpoint.strikes += 1;
            if endpoint.strikes >= MAX_ENDPOINT_STRIKES {
                warn!(url, chain_id, "endpoint removed after repeated failures");
                group.retain(|e| e.url != url);
                removed = true;
            }
        }
        if group.is_empty() {
            self.groups.remove(&chain_id);
            warn!(chain_id, "chain dropped, no endpoints left");
        }
        removed
    }

    /// Reset the strike count after a successful check
    pub fn record_success(&mut self, chain_id: u64, url: &str) {
        if let Some(group) = self.groups.get_mut(&chain_id) {
            if let Some(endpoint) = group.iter_mut().find(|e| e.url == url) {
                endpoint.strikes = 0;
            }
        }
    }

    /// Drop a chain for the remainder of the run
    pub fn drop_chain(&mut self, chain_id: u64) {
        if self.groups.remove(&chain_id).is_some() {
            warn!(chain_id, "chain dropped for the remainder of the run");
        }
    }

    /// Try the chain's endpoints in configured order and return the
    /// first healthy URL. Exhausting them all drops the chain.
    pub async fn healthy_endpoint(&mut self, chain_id: u64) -> Option<String> {
        let urls: Vec<String> = self
            .groups
            .get(&chain_id)?
            .iter()
            .map(|e| e.url.clone())
            .collect();

        for url in urls {
            match self.health_check(&url, chain_id).await {
                Ok(()) => {
                    self.record_success(chain_id, &url);
                    info!(%url, chain_id, "endpoint passed health check");
                    return Some(url);
                }
                Err(e) => {
                    warn!(%url, chain_id, error = %e, "health check failed, trying next");
                    self.record_failure(chain_id, &url);
                }
            }
        }
        self.drop_chain(chain_id);
        None
    }

    /// Raw `eth_chainId` probe with a bounded timeout. A reachable node
    /// reporting the wrong chain id counts as a failure.
    pub async fn health_check(&self, url: &str, expected_chain: u64) -> ConsoleResult<()> {
        let reported = self.fetch_chain_id(url).await?;
        if reported != expected_chain {
            return Err(ConsoleError::HealthCheck {
                url: url.to_string(),
                reason: format!(
                    "chain id mismatch: configured {}, node reports {}",
                    expected_chain, reported
                ),
            });
        }
        Ok(())
    }

    async fn fetch_chain_id(&self, url: &str) -> ConsoleResult<u64> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_chainId",
            "params": [],
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConsoleError::HealthCheck {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let payload: serde_json::Value =
            response.json().await.map_err(|e| ConsoleError::HealthCheck {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let hex = payload
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConsoleError::HealthCheck {
                url: url.to_string(),
                reason: format!("unexpected response: {}", payload),
            })?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16).map_err(|e| {
            ConsoleError::HealthCheck {
                url: url.to_string(),
                reason: format!("bad chain id '{}': {}", hex, e),
            }
        })
    }

    /// Probe every configured endpoint, reporting reachability and chain
    /// id mismatches. Useful before a run starts; mutates nothing.
    pub async fn probe_all(&self) -> Vec<ProbeReport> {
        let mut reports = Vec::new();
        for chain_id in self.chain_ids() {
            for endpoint in &self.groups[&chain_id] {
                let (ok, detail) = match self.health_check(&endpoint.url, chain_id).await {
                    Ok(()) => (true, "connected".to_string()),
                    Err(e) => (false, e.to_string()),
                };
                reports.push(ProbeReport {
                    url: endpoint.url.clone(),
                    chain_id,
                    ok,
                    detail,
                });
            }
        }
        reports
    }

    /// Build a read provider for a session
    pub fn connect(url: &str) -> ConsoleResult<DynProvider> {
        let parsed: reqwest::Url = url
            .parse()
            .map_err(|e| ConsoleError::Rpc(format!("invalid RPC URL '{}': {}", url, e)))?;
        Ok(ProviderBuilder::new().connect_http(parsed).erased())
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

impl Default for EndpointManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(lines: &str) -> EndpointManager {
        let mut manager = EndpointManager::new();
        manager.load_lines(lines);
        manager
    }

    #[test]
    fn test_load_lines_groups_by_chain() {
        let manager = manager_with(
            "https://rpc-a.example,1\nhttps://rpc-b.example,1\nhttps://rpc-c.example,5\nnot-a-line\n",
        );
        assert_eq!(manager.chain_count(), 2);
        assert_eq!(manager.endpoint_count(1), 2);
        assert_eq!(manager.endpoint_count(5), 1);
        assert_eq!(manager.chain_ids(), vec![1, 5]);
    }

    #[test]
    fn test_strikes_remove_endpoint_then_chain() {
        let mut manager = manager_with("https://rpc-a.example,1\nhttps://rpc-b.example,1\n");

        for _ in 0..MAX_ENDPOINT_STRIKES - 1 {
            assert!(!manager.record_failure(1, "https://rpc-a.example"));
        }
        assert!(manager.record_failure(1, "https://rpc-a.example"));
        assert_eq!(manager.endpoint_count(1), 1);

        for _ in 0..MAX_ENDPOINT_STRIKES {
            manager.record_failure(1, "https://rpc-b.example");
        }
        assert!(manager.is_empty());
    }

    #[test]
    fn test_success_resets_strikes() {
        let mut manager = manager_with("https://rpc-a.example,1\n");
        manager.record_failure(1, "https://rpc-a.example");
        manager.record_failure(1, "https://rpc-a.example");
        manager.record_success(1, "https://rpc-a.example");
        // Two more failures stay under the limit again.
        manager.record_failure(1, "https://rpc-a.example");
        assert!(!manager.record_failure(1, "https://rpc-a.example"));
        assert_eq!(manager.endpoint_count(1), 1);
    }

    #[test]
    fn test_sole_endpoint_failure_drops_chain() {
        // A session pass that finds no healthy endpoint drops the chain;
        // with a single chain configured, the run has nowhere left to go.
        let mut manager = manager_with("https://rpc-only.example,11155111\n");
        manager.record_failure(11155111, "https://rpc-only.example");
        manager.drop_chain(11155111);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_select_chain_honors_stickiness() {
        let manager = manager_with("https://rpc-a.example,1\nhttps://rpc-c.example,5\n");
        // Certain stickiness always reuses the previous chain.
        for _ in 0..50 {
            assert_eq!(manager.select_chain(Some(5), 100), Some(5));
        }
        // Zero stickiness still returns some configured chain.
        for _ in 0..50 {
            let chain = manager.select_chain(Some(5), 0).unwrap();
            assert!([1, 5].contains(&chain));
        }
        // A dropped chain can never be sticky.
        assert_ne!(manager.select_chain(Some(99), 100), Some(99));
    }

    #[test]
    fn test_select_chain_on_empty_manager() {
        let manager = EndpointManager::new();
        assert_eq!(manager.select_chain(None, 50), None);
    }
}
