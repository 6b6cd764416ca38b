//! Harvests candidate destination addresses from recent blocks for the
//! `pool` recipient mode. Runs once per chain before the main loop.

use crate::error::{ConsoleError, ConsoleResult};
use crate::recipient::RecipientBook;
use alloy::consensus::Transaction as _;
use alloy::eips::BlockNumberOrTag;
use alloy::providers::{DynProvider, Provider};
use alloy_primitives::Address;
use std::collections::HashSet;
use tracing::{debug, info};

/// Walk `[height - lookback, height]` inclusive and union every
/// transaction destination into the chain's pool. An endpoint error
/// bubbles up to the caller, which logs it and leaves the pool as-is.
pub async fn scan_recent_blocks(
    provider: &DynProvider,
    chain_id: u64,
    lookback: u64,
    book: &mut RecipientBook,
) -> ConsoleResult<usize> {
    let height = provider
        .get_block_number()
        .await
        .map_err(|e| ConsoleError::BlockRead(e.to_string()))?;
    let start = height.saturating_sub(lookback);
    info!(chain_id, start, height, "scanning blocks for recipient pool");

    let mut harvested: HashSet<Address> = HashSet::new();
    for number in start..=height {
        let block = provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await
            .map_err(|e| ConsoleError::BlockRead(e.to_string()))?;
        let Some(block) = block else {
            debug!(chain_id, number, "block not available, skipping");
            continue;
        };
        for tx in block.transactions.txns() {
            if let Some(to) = tx.to() {
                harvested.insert(to);
            }
        }
    }

    let before = book.pool_size(chain_id);
    book.extend_pool(chain_id, harvested);
    let added = book.pool_size(chain_id) - before;
    info!(
        chain_id,
        added,
        total = book.pool_size(chain_id),
        "recipient pool updated"
    );
    Ok(added)
}
