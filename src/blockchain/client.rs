// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC client for the SenteChain contracts.

use alloy::{
    eips::BlockNumberOrTag,
    network::Ethereum,
    primitives::{Address, Bytes, B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{Filter, TransactionRequest},
    sol_types::SolEvent,
};
use url::Url;

use super::backend::{ChainError, ContractBackend};
use super::contracts::{ISenteToken, ISenteVault};
use super::signing::SigningHandle;
use super::types::{NetworkConfig, TransferLog, TxReceipt};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Passive connection to a SenteChain network.
///
/// Reads share one provider. Every write builds its own signing provider
/// from the handle it is given and drops it afterwards.
pub struct SenteChainClient {
    network: NetworkConfig,
    rpc_url: Url,
    provider: HttpProvider,
}

impl SenteChainClient {
    /// Create a client for the network's public RPC endpoint.
    pub fn new(network: NetworkConfig) -> Result<Self, ChainError> {
        let rpc_url = network.rpc_url;
        Self::with_rpc_url(network, rpc_url)
    }

    /// Create a client that talks to `rpc_url` instead of the default endpoint.
    pub fn with_rpc_url(network: NetworkConfig, rpc_url: &str) -> Result<Self, ChainError> {
        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(rpc_url.clone());

        Ok(Self {
            network,
            rpc_url,
            provider,
        })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }
}

fn rpc_error(e: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc(e.to_string())
}

fn contract_error(e: impl std::fmt::Display) -> ChainError {
    ChainError::Contract(e.to_string())
}

impl ContractBackend for SenteChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(rpc_error)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider.get_block_number().await.map_err(rpc_error)
    }

    async fn has_code(&self, address: Address) -> Result<bool, ChainError> {
        let code = self.provider.get_code_at(address).await.map_err(rpc_error)?;
        Ok(!code.is_empty())
    }

    async fn vault_balance(&self, vault: Address, account: Address) -> Result<U256, ChainError> {
        ISenteVault::new(vault, self.provider.clone())
            .getBalance(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn savings_balance(&self, vault: Address, account: Address) -> Result<U256, ChainError> {
        ISenteVault::new(vault, self.provider.clone())
            .getSavingsBalance(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn unlock_time(&self, vault: Address, account: Address) -> Result<U256, ChainError> {
        ISenteVault::new(vault, self.provider.clone())
            .getUnlockTime(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn savings_unlocked(&self, vault: Address, account: Address) -> Result<bool, ChainError> {
        ISenteVault::new(vault, self.provider.clone())
            .isSavingsUnlocked(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn can_claim_faucet(&self, token: Address, account: Address) -> Result<bool, ChainError> {
        ISenteToken::new(token, self.provider.clone())
            .canClaimFaucet(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn submit(
        &self,
        signer: &SigningHandle,
        to: Address,
        input: Bytes,
    ) -> Result<B256, ChainError> {
        let provider = ProviderBuilder::new()
            .wallet(signer.wallet.clone())
            .connect_http(self.rpc_url.clone());

        let tx = TransactionRequest::default()
            .from(signer.account)
            .to(to)
            .input(input.into());

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::Transaction(format!("Failed to send transaction: {e}")))?;

        let hash = *pending.tx_hash();
        tracing::info!(tx_hash = %hash, to = %to, "Transaction submitted");
        Ok(hash)
    }

    async fn receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get receipt: {e}")))?;

        Ok(receipt.and_then(|r| {
            // Pending receipts without a block are treated as not included.
            let block_number = r.block_number?;
            Some(TxReceipt {
                tx_hash: r.transaction_hash,
                block_number,
                gas_used: r.gas_used,
                success: r.status(),
            })
        }))
    }

    async fn transfer_logs(
        &self,
        token: Address,
        from: Option<Address>,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, ChainError> {
        let mut filter = Filter::new()
            .address(token)
            .event_signature(ISenteToken::Transfer::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);
        if let Some(from) = from {
            filter = filter.topic1(from.into_word());
        }
        if let Some(to) = to {
            filter = filter.topic2(to.into_word());
        }

        let logs = self.provider.get_logs(&filter).await.map_err(rpc_error)?;

        let mut decoded = Vec::with_capacity(logs.len());
        for log in logs {
            let (Some(tx_hash), Some(block_number)) = (log.transaction_hash, log.block_number)
            else {
                continue;
            };
            let log_index = log.log_index.unwrap_or_default();
            let event = log
                .log_decode::<ISenteToken::Transfer>()
                .map_err(contract_error)?;
            let transfer = event.inner.data;
            decoded.push(TransferLog {
                tx_hash,
                block_number,
                log_index,
                from: transfer.from,
                to: transfer.to,
                value: transfer.value,
            });
        }
        Ok(decoded)
    }

    async fn block_timestamp(&self, block: u64) -> Result<Option<u64>, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block))
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get block: {e}")))?;
        Ok(block.map(|b| b.header.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::{BASE_SEPOLIA, HARDHAT_LOCAL};

    #[test]
    fn builds_client_for_known_networks() {
        let client = SenteChainClient::new(BASE_SEPOLIA).unwrap();
        assert_eq!(client.network().chain_id, 84532);
        assert_eq!(client.rpc_url().as_str(), "https://sepolia.base.org/");

        let local = SenteChainClient::new(HARDHAT_LOCAL).unwrap();
        assert_eq!(local.rpc_url().host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn rpc_override_must_be_a_url() {
        let err = SenteChainClient::with_rpc_url(HARDHAT_LOCAL, "not a url")
            .err()
            .unwrap();
        assert!(matches!(err, ChainError::InvalidRpcUrl(_)));

        let client = SenteChainClient::with_rpc_url(HARDHAT_LOCAL, "http://localhost:9545").unwrap();
        assert_eq!(client.rpc_url().port(), Some(9545));
        assert_eq!(client.network().name, "Hardhat Local");
    }
}
