// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction history rebuilt from token `Transfer` logs.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use alloy::primitives::{Address, B256};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::blockchain::amount::format_amount;
use crate::blockchain::types::{TransferLog, HISTORY_BLOCK_WINDOW};
use crate::blockchain::{ChainError, ContractBackend};

const TIMESTAMP_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFilter {
    #[default]
    All,
    Sent,
    Received,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        match self {
            HistoryFilter::All => true,
            HistoryFilter::Sent => entry.direction == Direction::Sent,
            HistoryFilter::Received => entry.direction == Direction::Received,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    /// Decimal string in token units.
    pub value: String,
    /// Block time in unix seconds, 0 if the block could not be fetched.
    pub timestamp: u64,
    pub direction: Direction,
    pub block_number: u64,
    #[serde(skip)]
    log_index: u64,
}

pub fn filter_entries(entries: &[HistoryEntry], filter: HistoryFilter) -> Vec<HistoryEntry> {
    entries.iter().filter(|e| filter.matches(e)).cloned().collect()
}

/// Loads an account's token transfers over the most recent blocks.
pub struct TransactionHistory {
    token: Address,
    decimals: u8,
    window: u64,
    timestamps: Mutex<LruCache<u64, u64>>,
}

impl TransactionHistory {
    pub fn new(token: Address, decimals: u8) -> Self {
        Self {
            token,
            decimals,
            window: HISTORY_BLOCK_WINDOW,
            timestamps: Mutex::new(LruCache::new(
                NonZeroUsize::new(TIMESTAMP_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn with_window(mut self, blocks: u64) -> Self {
        self.window = blocks;
        self
    }

    /// Number of block timestamps currently cached.
    pub fn cached_blocks(&self) -> usize {
        self.timestamps.lock().map(|c| c.len()).unwrap_or(0)
    }

    async fn block_time<B: ContractBackend>(&self, backend: &B, block: u64) -> Result<u64, ChainError> {
        let cached = self
            .timestamps
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(&block).copied());
        if let Some(timestamp) = cached {
            return Ok(timestamp);
        }

        match backend.block_timestamp(block).await? {
            Some(timestamp) => {
                if let Ok(mut cache) = self.timestamps.lock() {
                    cache.put(block, timestamp);
                }
                Ok(timestamp)
            }
            None => {
                tracing::warn!(block, "Block not found while loading history");
                Ok(0)
            }
        }
    }

    async fn entry<B: ContractBackend>(
        &self,
        backend: &B,
        log: TransferLog,
        direction: Direction,
    ) -> Result<HistoryEntry, ChainError> {
        Ok(HistoryEntry {
            hash: log.tx_hash,
            from: log.from,
            to: log.to,
            value: format_amount(log.value, self.decimals),
            timestamp: self.block_time(backend, log.block_number).await?,
            direction,
            block_number: log.block_number,
            log_index: log.log_index,
        })
    }

    /// Sent and received transfers of `account`, newest first.
    ///
    /// A transaction that appears among the sent logs is not listed again
    /// as received.
    pub async fn load<B: ContractBackend>(
        &self,
        backend: &B,
        account: Address,
    ) -> Result<Vec<HistoryEntry>, ChainError> {
        let current = backend.block_number().await?;
        let from_block = current.saturating_sub(self.window);

        let (sent, received) = tokio::try_join!(
            backend.transfer_logs(self.token, Some(account), None, from_block, current),
            backend.transfer_logs(self.token, None, Some(account), from_block, current),
        )?;

        let sent_hashes: HashSet<B256> = sent.iter().map(|log| log.tx_hash).collect();
        let mut entries = Vec::with_capacity(sent.len() + received.len());
        for log in sent {
            entries.push(self.entry(backend, log, Direction::Sent).await?);
        }
        for log in received {
            if sent_hashes.contains(&log.tx_hash) {
                continue;
            }
            entries.push(self.entry(backend, log, Direction::Received).await?);
        }

        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.block_number.cmp(&a.block_number))
                .then(b.log_index.cmp(&a.log_index))
        });

        tracing::debug!(
            account = %account,
            from_block,
            to_block = current,
            count = entries.len(),
            "Loaded transaction history"
        );
        Ok(entries)
    }
}
