// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract read/write facade.
//!
//! The facade is the only place that talks to the SenteToken and SenteVault
//! contracts. It is an explicit value scoped to one session and one network:
//! when the wallet switches chains the caller builds a new one.
//!
//! Reads go through the backend's passive connection. Every write asks the
//! [`SignerSource`] for a fresh [`SigningHandle`](super::signing::SigningHandle)
//! and lets it go once the transaction is broadcast.
//!
//! The plain read methods (`get_balance`, `get_unlock_time`, ...) never fail:
//! they log the problem and fall back to zero values so a dashboard can keep
//! rendering. Their `try_*` twins return the error instead.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;

use super::amount::{format_amount, parse_positive_amount, AmountError};
use super::backend::{ChainError, ContractBackend};
use super::contracts::{ContractAddresses, ContractCall};
use super::deployment::{DeploymentManifest, ManifestError};
use super::signing::{SignerSource, SigningHandle};
use super::types::{
    parse_address, BalanceSnapshot, NetworkConfig, PendingTransaction, TxKind, TxReceipt,
    SECONDS_PER_DAY, TOKEN_DECIMALS,
};
use crate::wallet::provider::ProviderError;

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("{contract} contract is not deployed at {address}")]
    ContractUnavailable {
        contract: &'static str,
        address: Address,
    },

    #[error("RPC endpoint serves chain {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Contract call failed: {0}")]
    CallFailed(#[from] ChainError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("Lock period must be at least 1 day")]
    InvalidLockPeriod,

    #[error("Savings are locked until {unlock_time}")]
    StillLocked { unlock_time: u64 },

    #[error("Faucet already claimed, try again later")]
    FaucetUnavailable,

    #[error("Signer unavailable: {0}")]
    Signer(#[from] ProviderError),

    #[error("Transaction {hash} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { hash: B256, timeout: Duration },

    #[error("Transaction {hash} reverted in block {block}")]
    Reverted { hash: B256, block: u64 },
}

/// Expected unlock time of a lock this facade submitted.
#[derive(Debug, Clone, Copy)]
struct LocalLock {
    tx_hash: B256,
    unlock_time: u64,
}

pub struct ContractFacade<B, S> {
    backend: Arc<B>,
    signer: S,
    contracts: ContractAddresses,
    network: NetworkConfig,
    decimals: u8,
    poll_interval: Duration,
    chain_verified: AtomicBool,
    verified: Mutex<HashSet<Address>>,
    local_locks: Mutex<HashMap<Address, Vec<LocalLock>>>,
}

impl<B: ContractBackend, S: SignerSource> ContractFacade<B, S> {
    pub fn new(
        backend: Arc<B>,
        signer: S,
        contracts: ContractAddresses,
        network: NetworkConfig,
    ) -> Self {
        Self {
            backend,
            signer,
            contracts,
            network,
            decimals: TOKEN_DECIMALS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            chain_verified: AtomicBool::new(false),
            verified: Mutex::new(HashSet::new()),
            local_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Build a facade for the contracts and network named in a deployment manifest.
    pub fn from_manifest(
        backend: Arc<B>,
        signer: S,
        manifest: &DeploymentManifest,
    ) -> Result<Self, ManifestError> {
        let network = manifest.network()?;
        Ok(Self::new(backend, signer, manifest.contracts, network))
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Account the signer currently signs for.
    pub async fn account(&self) -> Result<Address, ContractError> {
        Ok(self.signer.signer().await?.account)
    }

    fn contract_name(&self, address: Address) -> &'static str {
        if address == self.contracts.vault {
            "SenteVault"
        } else if address == self.contracts.token {
            "SenteToken"
        } else {
            "contract"
        }
    }

    /// Fail with `WrongNetwork` when the backend serves another chain than
    /// the one this facade is bound to.
    pub async fn ensure_network(&self) -> Result<(), ContractError> {
        if self.chain_verified.load(Ordering::Acquire) {
            return Ok(());
        }
        let actual = self.backend.chain_id().await?;
        if actual != self.network.chain_id {
            tracing::error!(expected = self.network.chain_id, actual, "RPC endpoint is on the wrong chain");
            return Err(ContractError::WrongNetwork {
                expected: self.network.chain_id,
                actual,
            });
        }
        self.chain_verified.store(true, Ordering::Release);
        Ok(())
    }

    /// Fail with `ContractUnavailable` when no code is deployed at `address`.
    ///
    /// Positive results are cached for the lifetime of the facade.
    pub async fn ensure_deployed(&self, address: Address) -> Result<(), ContractError> {
        if self.verified_contains(address) {
            return Ok(());
        }
        self.ensure_network().await?;
        if !self.backend.has_code(address).await? {
            return Err(ContractError::ContractUnavailable {
                contract: self.contract_name(address),
                address,
            });
        }
        if let Ok(mut verified) = self.verified.lock() {
            verified.insert(address);
        }
        Ok(())
    }

    fn verified_contains(&self, address: Address) -> bool {
        self.verified
            .lock()
            .map(|v| v.contains(&address))
            .unwrap_or(false)
    }

    fn parse_account(raw: &str) -> Result<Address, ContractError> {
        parse_address(raw).ok_or_else(|| ContractError::InvalidAddress(raw.to_string()))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn try_get_balance(&self, account: &str) -> Result<String, ContractError> {
        let account = Self::parse_account(account)?;
        let vault = self.contracts.vault;
        self.ensure_deployed(vault).await?;
        let units = self.backend.vault_balance(vault, account).await?;
        Ok(format_amount(units, self.decimals))
    }

    /// Spendable vault balance; `"0"` on any failure.
    pub async fn get_balance(&self, account: &str) -> String {
        self.try_get_balance(account).await.unwrap_or_else(|e| {
            tracing::warn!(account = %account, error = %e, "Failed to read vault balance");
            "0".to_string()
        })
    }

    pub async fn try_get_savings_balance(&self, account: &str) -> Result<String, ContractError> {
        let account = Self::parse_account(account)?;
        let vault = self.contracts.vault;
        self.ensure_deployed(vault).await?;
        let units = self.backend.savings_balance(vault, account).await?;
        Ok(format_amount(units, self.decimals))
    }

    /// Locked savings balance; `"0"` on any failure.
    pub async fn get_savings_balance(&self, account: &str) -> String {
        self.try_get_savings_balance(account)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(account = %account, error = %e, "Failed to read savings balance");
                "0".to_string()
            })
    }

    pub async fn try_get_unlock_time(&self, account: &str) -> Result<u64, ContractError> {
        let account = Self::parse_account(account)?;
        self.unlock_time_of(account).await
    }

    /// Savings unlock time in unix seconds; 0 if never locked or on failure.
    pub async fn get_unlock_time(&self, account: &str) -> u64 {
        self.try_get_unlock_time(account).await.unwrap_or_else(|e| {
            tracing::warn!(account = %account, error = %e, "Failed to read unlock time");
            0
        })
    }

    pub async fn try_is_unlocked(&self, account: &str) -> Result<bool, ContractError> {
        let account = Self::parse_account(account)?;
        let vault = self.contracts.vault;
        self.ensure_deployed(vault).await?;
        Ok(self.backend.savings_unlocked(vault, account).await?)
    }

    pub async fn is_unlocked(&self, account: &str) -> bool {
        self.try_is_unlocked(account).await.unwrap_or_else(|e| {
            tracing::warn!(account = %account, error = %e, "Failed to read savings lock state");
            false
        })
    }

    pub async fn try_can_claim_faucet(&self, account: &str) -> Result<bool, ContractError> {
        let account = Self::parse_account(account)?;
        let token = self.contracts.token;
        self.ensure_deployed(token).await?;
        Ok(self.backend.can_claim_faucet(token, account).await?)
    }

    pub async fn can_claim_faucet(&self, account: &str) -> bool {
        self.try_can_claim_faucet(account).await.unwrap_or_else(|e| {
            tracing::warn!(account = %account, error = %e, "Failed to read faucet eligibility");
            false
        })
    }

    async fn unlock_time_of(&self, account: Address) -> Result<u64, ContractError> {
        let vault = self.contracts.vault;
        self.ensure_deployed(vault).await?;
        let raw = self.backend.unlock_time(vault, account).await?;
        Ok(u64::try_from(raw).unwrap_or(u64::MAX))
    }

    /// Read balance, savings and unlock time in one go.
    ///
    /// The block number is read first, so the snapshot reflects state at
    /// least as new as `block`.
    pub async fn snapshot(&self, account: Address) -> Result<BalanceSnapshot, ContractError> {
        let vault = self.contracts.vault;
        self.ensure_deployed(vault).await?;

        let block = self.backend.block_number().await?;
        let available = self.backend.vault_balance(vault, account).await?;
        let savings = self.backend.savings_balance(vault, account).await?;
        let unlock_time = self.unlock_time_of(account).await?;

        Ok(BalanceSnapshot {
            available: format_amount(available, self.decimals),
            savings: format_amount(savings, self.decimals),
            unlock_time,
            block: Some(block),
            fetched_at: Utc::now(),
        })
    }

    pub async fn receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ContractError> {
        Ok(self.backend.receipt(hash).await?)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    async fn submit_with(
        &self,
        handle: &SigningHandle,
        call: ContractCall,
    ) -> Result<PendingTransaction, ContractError> {
        let kind = call.kind();
        let (target, input) = call.encode(&self.contracts);
        self.ensure_deployed(target).await?;

        let hash = self.backend.submit(handle, target, input).await?;

        tracing::info!(
            tx_hash = %hash,
            kind = ?kind,
            account = %handle.account,
            network = self.network.name,
            "Contract write submitted"
        );

        Ok(PendingTransaction {
            hash,
            kind,
            account: handle.account,
            submitted_at: Utc::now(),
        })
    }

    async fn submit(&self, call: ContractCall) -> Result<PendingTransaction, ContractError> {
        let handle = self.signer.signer().await?;
        self.submit_with(&handle, call).await
    }

    fn amount(&self, raw: &str) -> Result<U256, ContractError> {
        Ok(parse_positive_amount(raw, self.decimals)?)
    }

    /// Vault-internal transfer to another account.
    pub async fn transfer(&self, to: &str, amount: &str) -> Result<PendingTransaction, ContractError> {
        let to = Self::parse_account(to)?;
        let amount = self.amount(amount)?;
        self.submit(ContractCall::Transfer { to, amount }).await
    }

    /// Approve the vault to pull `amount` tokens from the wallet.
    pub async fn approve(&self, amount: &str) -> Result<PendingTransaction, ContractError> {
        let amount = self.amount(amount)?;
        self.submit(ContractCall::Approve { amount }).await
    }

    /// Move previously approved tokens into the vault.
    pub async fn deposit(&self, amount: &str) -> Result<PendingTransaction, ContractError> {
        let amount = self.amount(amount)?;
        self.submit(ContractCall::Deposit { amount }).await
    }

    /// Approve, wait for the approval to confirm, then deposit.
    ///
    /// The deposit is never submitted if the approval reverts or does not
    /// confirm within `timeout`.
    pub async fn approve_and_deposit(
        &self,
        amount: &str,
        timeout: Duration,
    ) -> Result<(PendingTransaction, PendingTransaction), ContractError> {
        let units = self.amount(amount)?;
        let handle = self.signer.signer().await?;

        let approval = self
            .submit_with(&handle, ContractCall::Approve { amount: units })
            .await?;
        self.confirm(&approval, timeout).await?;

        let deposit = self
            .submit_with(&handle, ContractCall::Deposit { amount: units })
            .await?;
        Ok((approval, deposit))
    }

    /// Lock `amount` of the vault balance as savings for `days` days.
    pub async fn lock_savings(
        &self,
        amount: &str,
        days: u64,
    ) -> Result<PendingTransaction, ContractError> {
        if days < 1 {
            return Err(ContractError::InvalidLockPeriod);
        }
        let duration = days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or(ContractError::InvalidLockPeriod)?;
        let amount = self.amount(amount)?;

        let pending = self
            .submit(ContractCall::SaveToVault {
                amount,
                lock_duration: U256::from(duration),
            })
            .await?;

        let unlock_time = now_unix().saturating_add(duration);
        if let Ok(mut locks) = self.local_locks.lock() {
            locks.entry(pending.account).or_default().push(LocalLock {
                tx_hash: pending.hash,
                unlock_time,
            });
        }
        Ok(pending)
    }

    /// Latest unlock time recorded locally for `account` that is still in the future.
    pub fn local_unlock_time(&self, account: Address) -> Option<u64> {
        let now = now_unix();
        let locks = self.local_locks.lock().ok()?;
        locks
            .get(&account)?
            .iter()
            .map(|lock| lock.unlock_time)
            .filter(|unlock| *unlock > now)
            .max()
    }

    /// Release unlocked savings back to the vault balance.
    ///
    /// Fails with `StillLocked` before submitting when either a lock this
    /// facade submitted or the chain says the savings are still locked.
    pub async fn withdraw_savings(&self, amount: &str) -> Result<PendingTransaction, ContractError> {
        let amount = self.amount(amount)?;
        let handle = self.signer.signer().await?;

        if let Some(unlock_time) = self.local_unlock_time(handle.account) {
            return Err(ContractError::StillLocked { unlock_time });
        }

        let vault = self.contracts.vault;
        self.ensure_deployed(vault).await?;
        if !self.backend.savings_unlocked(vault, handle.account).await? {
            let unlock_time = self.unlock_time_of(handle.account).await?;
            return Err(ContractError::StillLocked { unlock_time });
        }

        self.submit_with(&handle, ContractCall::WithdrawFromVault { amount })
            .await
    }

    /// Move vault balance back to the wallet.
    pub async fn withdraw(&self, amount: &str) -> Result<PendingTransaction, ContractError> {
        let amount = self.amount(amount)?;
        self.submit(ContractCall::Withdraw { amount }).await
    }

    /// Claim the daily faucet allowance.
    pub async fn claim_faucet(&self) -> Result<PendingTransaction, ContractError> {
        let handle = self.signer.signer().await?;
        let token = self.contracts.token;
        self.ensure_deployed(token).await?;
        if !self.backend.can_claim_faucet(token, handle.account).await? {
            return Err(ContractError::FaucetUnavailable);
        }
        self.submit_with(&handle, ContractCall::ClaimFaucet).await
    }

    /// Poll for the receipt of `pending` until it is included or `timeout` elapses.
    pub async fn confirm(
        &self,
        pending: &PendingTransaction,
        timeout: Duration,
    ) -> Result<TxReceipt, ContractError> {
        let hash = pending.hash;
        let wait = async {
            loop {
                match self.backend.receipt(hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => tracing::debug!(tx_hash = %hash, error = %e, "Receipt poll failed"),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ContractError::ConfirmationTimeout { hash, timeout })?;
        self.settle(pending, receipt)
    }

    /// Apply the outcome of a mined `pending` transaction.
    ///
    /// A reverted lock no longer blocks savings withdrawals.
    pub fn settle(
        &self,
        pending: &PendingTransaction,
        receipt: TxReceipt,
    ) -> Result<TxReceipt, ContractError> {
        let hash = pending.hash;
        let block = receipt.block_number;
        if receipt.success {
            tracing::info!(tx_hash = %hash, kind = ?pending.kind, block, "Transaction confirmed");
            return Ok(receipt);
        }
        if pending.kind == TxKind::Lock {
            self.forget_lock(pending.account, hash);
        }
        tracing::warn!(tx_hash = %hash, kind = ?pending.kind, block, "Transaction reverted");
        Err(ContractError::Reverted { hash, block })
    }

    fn forget_lock(&self, account: Address, hash: B256) {
        if let Ok(mut locks) = self.local_locks.lock() {
            if let Some(entries) = locks.get_mut(&account) {
                entries.retain(|lock| lock.tx_hash != hash);
            }
        }
    }
}

fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
