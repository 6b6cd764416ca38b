//! Destination selection for transfer actions: fixed address, manual or
//! predefined lists, other loaded wallets, or the scanned per-chain pool.

use crate::types::{RecipientMode, Wallet};
use alloy_primitives::Address;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::warn;

/// All recipient sources for a run. Pools grow monotonically during
/// pre-scan and never shrink within a run; resolution never mutates
/// anything here.
#[derive(Debug, Default)]
pub struct RecipientBook {
    pub manual_list: Vec<Address>,
    pub predefined_list: Vec<Address>,
    pools: HashMap<u64, Vec<Address>>,
}

impl RecipientBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union freshly scanned addresses into a chain's pool, deduplicated
    pub fn extend_pool(&mut self, chain_id: u64, addresses: impl IntoIterator<Item = Address>) {
        let pool = self.pools.entry(chain_id).or_default();
        let mut seen: HashSet<Address> = pool.iter().copied().collect();
        for address in addresses {
            if seen.insert(address) {
                pool.push(address);
            }
        }
    }

    pub fn pool(&self, chain_id: u64) -> &[Address] {
        self.pools.get(&chain_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pool_size(&self, chain_id: u64) -> usize {
        self.pool(chain_id).len()
    }

    pub fn clear(&mut self) {
        self.manual_list.clear();
        self.predefined_list.clear();
        self.pools.clear();
    }
}

/// Parse newline-separated addresses, dropping (and counting) bad lines
pub fn parse_address_list(text: &str) -> (Vec<Address>, usize) {
    let mut valid = Vec::new();
    let mut invalid = 0;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match Address::from_str(line) {
            Ok(address) => valid.push(address),
            Err(_) => {
                invalid += 1;
                warn!(address = line, "ignoring invalid address in list");
            }
        }
    }
    (valid, invalid)
}

/// Outcome of a resolution attempt. A skip carries the reason so the
/// scheduler can log it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Recipient(Address),
    Skip(&'static str),
}

/// Pick the next destination for a send from `sender`, following the
/// configured mode and its fallback chain.
pub fn resolve(
    mode: RecipientMode,
    fixed_address: Option<&str>,
    sender: Address,
    chain_id: u64,
    book: &RecipientBook,
    wallets: &[Wallet],
) -> Resolution {
    let mut rng = rand::thread_rng();
    match mode {
        RecipientMode::Fixed => match fixed_address.map(str::trim) {
            Some(raw) if !raw.is_empty() => match Address::from_str(raw) {
                Ok(address) => Resolution::Recipient(address),
                Err(_) => Resolution::Skip("fixed recipient address is invalid"),
            },
            _ => Resolution::Skip("no fixed recipient address configured"),
        },

        RecipientMode::List => match book.manual_list.choose(&mut rng) {
            Some(address) => Resolution::Recipient(*address),
            None => Resolution::Skip("recipient list is empty"),
        },

        RecipientMode::Predefined => match book.predefined_list.choose(&mut rng) {
            Some(address) => Resolution::Recipient(*address),
            None => Resolution::Skip("predefined recipient list is empty"),
        },

        RecipientMode::SelfInteract => pick_other_wallet(sender, wallets)
            .map(Resolution::Recipient)
            .unwrap_or(Resolution::Skip("no other loaded wallets to interact with")),

        RecipientMode::Pool => {
            let pool = book.pool(chain_id);
            if let Some(address) = pool.choose(&mut rng) {
                Resolution::Recipient(*address)
            } else if let Some(address) = pick_other_wallet(sender, wallets) {
                Resolution::Recipient(address)
            } else {
                Resolution::Skip("pool empty and no other loaded wallets to fall back to")
            }
        }
    }
}

fn pick_other_wallet(sender: Address, wallets: &[Wallet]) -> Option<Address> {
    let others: Vec<Address> = wallets
        .iter()
        .map(|w| w.address)
        .filter(|a| *a != sender)
        .collect();
    others.choose(&mut rand::thread_rng()).copied()
}
