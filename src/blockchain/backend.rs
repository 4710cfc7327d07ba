// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain access port used by the contract facade.
//!
//! [`SenteChainClient`](super::client::SenteChainClient) implements it over
//! JSON-RPC; tests use an in-memory chain.

use std::future::Future;

use alloy::primitives::{Address, Bytes, B256, U256};

use super::signing::SigningHandle;
use super::types::{TransferLog, TxReceipt};

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// Reads, writes and log queries against the SenteChain contracts.
///
/// Writes take a [`SigningHandle`] per call; implementations must not keep it.
pub trait ContractBackend: Send + Sync + 'static {
    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Whether any bytecode is deployed at `address`.
    fn has_code(&self, address: Address) -> impl Future<Output = Result<bool, ChainError>> + Send;

    fn vault_balance(
        &self,
        vault: Address,
        account: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn savings_balance(
        &self,
        vault: Address,
        account: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn unlock_time(
        &self,
        vault: Address,
        account: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn savings_unlocked(
        &self,
        vault: Address,
        account: Address,
    ) -> impl Future<Output = Result<bool, ChainError>> + Send;

    fn can_claim_faucet(
        &self,
        token: Address,
        account: Address,
    ) -> impl Future<Output = Result<bool, ChainError>> + Send;

    /// Sign and broadcast a call, returning the transaction hash.
    fn submit(
        &self,
        signer: &SigningHandle,
        to: Address,
        input: Bytes,
    ) -> impl Future<Output = Result<B256, ChainError>> + Send;

    /// `None` while the transaction is not yet included.
    fn receipt(&self, hash: B256) -> impl Future<Output = Result<Option<TxReceipt>, ChainError>> + Send;

    /// Token `Transfer` logs in `[from_block, to_block]`, optionally filtered
    /// on the indexed sender and recipient.
    fn transfer_logs(
        &self,
        token: Address,
        from: Option<Address>,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = Result<Vec<TransferLog>, ChainError>> + Send;

    /// Block timestamp in unix seconds, `None` for unknown blocks.
    fn block_timestamp(&self, block: u64) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send;
}
