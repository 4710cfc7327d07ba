// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance refresh coordinator.
//!
//! Publishes [`BalanceSnapshot`]s for one account through a `watch` channel
//! and follows each submitted write until it is confirmed:
//!
//! 1. refresh immediately after submission
//! 2. poll the receipt every `poll_interval` until it appears or
//!    `confirmation_timeout` elapses
//! 3. once confirmed, refresh until the snapshot has caught up with the
//!    confirmation block
//! 4. on timeout, fall back to fixed re-fetches (+1s, +3s)
//!
//! Every refresh takes a ticket when it starts. A result is published only
//! if no later-started refresh has been published yet, so a slow read can
//! never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::blockchain::facade::{ContractError, ContractFacade};
use crate::blockchain::signing::SignerSource;
use crate::blockchain::types::{BalanceSnapshot, PendingTransaction, TxReceipt};
use crate::blockchain::ContractBackend;

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    /// Reads attempted after confirmation before giving up on catching up.
    pub catch_up_attempts: usize,
    /// Re-fetch offsets after a confirmation timeout, measured from the timeout.
    pub fallback_offsets: Vec<Duration>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            confirmation_timeout: Duration::from_secs(60),
            catch_up_attempts: 5,
            fallback_offsets: vec![Duration::from_secs(1), Duration::from_secs(3)],
        }
    }
}

/// Where a tracked write currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    Submitted,
    Pending,
    Confirmed { block: u64 },
    Reverted { block: u64 },
    TimedOut,
    Cancelled,
}

impl TrackPhase {
    pub fn is_final(&self) -> bool {
        !matches!(self, TrackPhase::Submitted | TrackPhase::Pending)
    }
}

/// Handle to one tracked transaction. Tracking stops when it is dropped.
#[derive(Debug)]
pub struct TrackHandle {
    hash: B256,
    phase: watch::Receiver<TrackPhase>,
    token: CancellationToken,
    task: Option<JoinHandle<TrackPhase>>,
}

impl TrackHandle {
    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn phase(&self) -> TrackPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackPhase> {
        self.phase.clone()
    }

    /// Stop tracking. The transaction itself is not affected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for tracking to finish and return the final phase.
    pub async fn wait(mut self) -> TrackPhase {
        let Some(task) = self.task.take() else {
            return *self.phase.borrow();
        };
        match task.await {
            Ok(phase) => phase,
            Err(e) => {
                tracing::warn!(tx_hash = %self.hash, error = %e, "Tracking task failed");
                TrackPhase::Cancelled
            }
        }
    }
}

impl Drop for TrackHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Inner<B, S> {
    facade: Arc<ContractFacade<B, S>>,
    account: Address,
    config: RefreshConfig,
    snapshots: watch::Sender<Option<BalanceSnapshot>>,
    next_ticket: AtomicU64,
    applied_ticket: Mutex<u64>,
    shutdown: CancellationToken,
}

impl<B: ContractBackend, S: SignerSource> Inner<B, S> {
    fn begin(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `snapshot` unless a later-started refresh already did.
    fn apply(&self, ticket: u64, snapshot: BalanceSnapshot) -> Option<BalanceSnapshot> {
        let mut applied = self
            .applied_ticket
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if ticket <= *applied {
            tracing::debug!(ticket, applied = *applied, "Discarding superseded snapshot");
            return None;
        }
        *applied = ticket;
        self.snapshots.send_replace(Some(snapshot.clone()));
        Some(snapshot)
    }

    async fn refresh(&self) -> Result<Option<BalanceSnapshot>, ContractError> {
        let ticket = self.begin();
        let snapshot = self.facade.snapshot(self.account).await?;
        Ok(self.apply(ticket, snapshot))
    }

    async fn refresh_logged(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(account = %self.account, error = %e, "Balance refresh failed");
        }
    }

    fn latest_block(&self) -> Option<u64> {
        self.snapshots.borrow().as_ref().and_then(|s| s.block)
    }

    async fn wait_for_receipt(&self, hash: B256) -> TxReceipt {
        loop {
            match self.facade.receipt(hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => tracing::debug!(tx_hash = %hash, error = %e, "Receipt poll failed"),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Refresh until the published snapshot reflects `block`.
    async fn catch_up(&self, block: u64) {
        for attempt in 0..self.config.catch_up_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.poll_interval).await;
            }
            self.refresh_logged().await;
            if self.latest_block().is_some_and(|seen| seen >= block) {
                return;
            }
        }
        tracing::warn!(block, "Snapshot did not catch up with confirmation block");
    }

    async fn track(
        &self,
        pending: PendingTransaction,
        phase: &watch::Sender<TrackPhase>,
        token: &CancellationToken,
    ) -> TrackPhase {
        let hash = pending.hash;

        self.refresh_logged().await;
        phase.send_replace(TrackPhase::Pending);

        let receipt = tokio::select! {
            _ = token.cancelled() => return TrackPhase::Cancelled,
            waited = tokio::time::timeout(
                self.config.confirmation_timeout,
                self.wait_for_receipt(hash),
            ) => waited,
        };

        match receipt {
            Ok(receipt) => {
                let block = receipt.block_number;
                let outcome = match self.facade.settle(&pending, receipt) {
                    Ok(_) => TrackPhase::Confirmed { block },
                    Err(_) => TrackPhase::Reverted { block },
                };
                tokio::select! {
                    _ = token.cancelled() => TrackPhase::Cancelled,
                    _ = self.catch_up(block) => outcome,
                }
            }
            Err(_) => {
                tracing::warn!(
                    tx_hash = %hash,
                    timeout = ?self.config.confirmation_timeout,
                    "No receipt in time, falling back to timed refreshes"
                );
                let mut elapsed = Duration::ZERO;
                for offset in &self.config.fallback_offsets {
                    let delay = offset.saturating_sub(elapsed);
                    elapsed = *offset;
                    tokio::select! {
                        _ = token.cancelled() => return TrackPhase::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    self.refresh_logged().await;
                }
                TrackPhase::TimedOut
            }
        }
    }
}

/// Keeps one account's balance snapshot fresh.
pub struct RefreshCoordinator<B, S> {
    inner: Arc<Inner<B, S>>,
}

impl<B, S> Clone for RefreshCoordinator<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ContractBackend, S: SignerSource> RefreshCoordinator<B, S> {
    pub fn new(facade: Arc<ContractFacade<B, S>>, account: Address, config: RefreshConfig) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                facade,
                account,
                config,
                snapshots,
                next_ticket: AtomicU64::new(0),
                applied_ticket: Mutex::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn account(&self) -> Address {
        self.inner.account
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    pub fn latest(&self) -> Option<BalanceSnapshot> {
        self.inner.snapshots.borrow().clone()
    }

    /// Read a fresh snapshot. `Ok(None)` when a newer refresh won the race.
    pub async fn refresh(&self) -> Result<Option<BalanceSnapshot>, ContractError> {
        self.inner.refresh().await
    }

    /// Follow a submitted write until it settles, refreshing along the way.
    pub fn track(&self, pending: PendingTransaction) -> TrackHandle {
        let hash = pending.hash;
        let (phase_tx, phase_rx) = watch::channel(TrackPhase::Submitted);
        let token = self.inner.shutdown.child_token();

        let inner = Arc::clone(&self.inner);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let outcome = inner.track(pending, &phase_tx, &task_token).await;
            phase_tx.send_replace(outcome);
            outcome
        });

        TrackHandle {
            hash,
            phase: phase_rx,
            token,
            task: Some(task),
        }
    }

    /// Cancel every tracking task started by this coordinator.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}
