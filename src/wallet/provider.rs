// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet provider adapter.
//!
//! An injected wallet is anything speaking EIP-1193: a JSON-RPC style
//! `request` plus `accountsChanged` / `chainChanged` events. [`WalletAdapter`]
//! wraps an optional provider (absent when no wallet is installed) and turns
//! its error codes into [`ProviderError`].

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::blockchain::types::{parse_chain_id_hex, NetworkConfig};

/// EIP-1193 `User Rejected Request`.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 `Unsupported Method`.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// The requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// A request of the same kind is already waiting for the user.
pub const REQUEST_PENDING: i64 = -32002;
/// JSON-RPC `Invalid params`.
pub const INVALID_PARAMS: i64 = -32602;

/// Error object returned by a provider `request`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// An EIP-1193 provider.
pub trait Eip1193: Send + Sync + 'static {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ProviderRpcError>> + Send;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

impl<T: Eip1193> Eip1193 for Arc<T> {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ProviderRpcError>> + Send {
        self.as_ref().request(method, params)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.as_ref().subscribe()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("No wallet provider is installed")]
    ProviderUnavailable,

    #[error("User rejected the request")]
    UserRejected,

    #[error("No accounts found")]
    NoAccounts,

    #[error("User rejected the network switch")]
    SwitchRejected,

    #[error("User rejected adding the network")]
    AddRejected,

    #[error("Provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderRpcError> for ProviderError {
    fn from(e: ProviderRpcError) -> Self {
        ProviderError::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

/// Outcome of [`WalletAdapter::ensure_network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSwitch {
    /// The wallet was already on the target chain; nothing was requested.
    AlreadyActive,
    Switched,
    /// The chain was unknown to the wallet and has been added.
    Added,
    /// The wallet already shows a prompt for this; treated as success.
    RequestPending,
}

/// Stops an event listener when cancelled or dropped.
#[derive(Debug)]
pub struct ListenerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the listener task to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn spawn_listener<F>(mut events: broadcast::Receiver<ProviderEvent>, mut on_event: F) -> ListenerHandle
where
    F: FnMut(ProviderEvent) + Send + 'static,
{
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => on_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Provider event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    ListenerHandle {
        token,
        task: Some(task),
    }
}

fn parse_accounts(value: Value) -> Result<Vec<Address>, ProviderError> {
    let Value::Array(items) = value else {
        return Err(ProviderError::InvalidResponse(format!(
            "expected account list, got {value}"
        )));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| Address::from_str(s).ok())
                .ok_or_else(|| ProviderError::InvalidResponse(format!("invalid account {item}")))
        })
        .collect()
}

/// Adapter over an optional injected provider.
pub struct WalletAdapter<P> {
    provider: Option<P>,
}

impl<P: Eip1193> WalletAdapter<P> {
    pub fn new(provider: Option<P>) -> Self {
        Self { provider }
    }

    pub fn is_installed(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Result<&P, ProviderError> {
        self.provider.as_ref().ok_or(ProviderError::ProviderUnavailable)
    }

    /// Ask the wallet for access and return the first account.
    pub async fn connect(&self) -> Result<Address, ProviderError> {
        let provider = self.provider()?;
        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|e| match e.code {
                USER_REJECTED => ProviderError::UserRejected,
                _ => e.into(),
            })?;

        let account = parse_accounts(accounts)?
            .into_iter()
            .next()
            .ok_or(ProviderError::NoAccounts)?;
        tracing::info!(account = %account, "Wallet connected");
        Ok(account)
    }

    /// Currently exposed account, without prompting.
    pub async fn current_account(&self) -> Result<Option<Address>, ProviderError> {
        let Some(provider) = self.provider.as_ref() else {
            return Ok(None);
        };
        let accounts = provider.request("eth_accounts", json!([])).await?;
        Ok(parse_accounts(accounts)?.into_iter().next())
    }

    pub async fn chain_id(&self) -> Result<u64, ProviderError> {
        let provider = self.provider()?;
        let raw = provider.request("eth_chainId", json!([])).await?;
        raw.as_str()
            .and_then(parse_chain_id_hex)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("invalid chain id {raw}")))
    }

    /// Make sure the wallet is on `network`, switching or adding it if needed.
    ///
    /// Calling this while already on the target chain sends no prompt.
    pub async fn ensure_network(&self, network: &NetworkConfig) -> Result<NetworkSwitch, ProviderError> {
        let provider = self.provider()?;
        if self.chain_id().await? == network.chain_id {
            return Ok(NetworkSwitch::AlreadyActive);
        }

        let switch = provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": network.chain_id_hex() }]),
            )
            .await;

        match switch {
            Ok(_) => {
                tracing::info!(network = network.name, "Switched wallet network");
                Ok(NetworkSwitch::Switched)
            }
            Err(e) if e.code == UNRECOGNIZED_CHAIN => self.add_network(provider, network).await,
            Err(e) if e.code == USER_REJECTED => Err(ProviderError::SwitchRejected),
            Err(e) if e.code == REQUEST_PENDING => {
                tracing::info!(network = network.name, "Network switch already pending in wallet");
                Ok(NetworkSwitch::RequestPending)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_network(&self, provider: &P, network: &NetworkConfig) -> Result<NetworkSwitch, ProviderError> {
        let added = provider
            .request("wallet_addEthereumChain", json!([network.add_chain_params()]))
            .await;

        match added {
            Ok(_) => {
                tracing::info!(network = network.name, "Added network to wallet");
                Ok(NetworkSwitch::Added)
            }
            Err(e) if e.code == USER_REJECTED => Err(ProviderError::AddRejected),
            Err(e) if e.code == REQUEST_PENDING => Ok(NetworkSwitch::RequestPending),
            Err(e) => Err(e.into()),
        }
    }

    /// Call `callback` with the first account whenever the account list
    /// changes, or `None` once it is empty.
    pub fn on_account_changed<F>(&self, callback: F) -> Result<ListenerHandle, ProviderError>
    where
        F: Fn(Option<Address>) + Send + 'static,
    {
        let events = self.provider()?.subscribe();
        Ok(spawn_listener(events, move |event| {
            if let ProviderEvent::AccountsChanged(accounts) = event {
                callback(accounts.first().copied());
            }
        }))
    }

    /// Call `callback` with the new chain id on every network change.
    ///
    /// A chain change invalidates any facade bound to the old network.
    pub fn on_network_changed<F>(&self, callback: F) -> Result<ListenerHandle, ProviderError>
    where
        F: Fn(u64) + Send + 'static,
    {
        let events = self.provider()?.subscribe();
        Ok(spawn_listener(events, move |event| {
            if let ProviderEvent::ChainChanged(chain_id) = event {
                callback(chain_id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::blockchain::types::{BASE_SEPOLIA, HARDHAT_LOCAL};

    type Scripted = Result<Value, ProviderRpcError>;

    /// Provider that answers from per-method queues and records every call.
    struct ScriptedProvider {
        responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
        calls: Mutex<Vec<(String, Value)>>,
        events: broadcast::Sender<ProviderEvent>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                events: broadcast::channel(16).0,
            }
        }

        fn respond(self, method: &str, response: Scripted) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(method.to_string())
                .or_default()
                .push_back(response);
            self
        }

        fn methods(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }

        fn params_of(&self, method: &str) -> Option<Value> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
        }
    }

    impl Eip1193 for ScriptedProvider {
        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            self.responses
                .lock()
                .unwrap()
                .get_mut(method)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Err(ProviderRpcError::new(UNSUPPORTED_METHOD, "unscripted")))
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }

    const ALICE: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn rejected() -> Scripted {
        Err(ProviderRpcError::new(USER_REJECTED, "User rejected the request."))
    }

    #[tokio::test]
    async fn missing_provider_is_reported() {
        let adapter: WalletAdapter<ScriptedProvider> = WalletAdapter::new(None);
        assert!(!adapter.is_installed());
        assert_eq!(adapter.connect().await, Err(ProviderError::ProviderUnavailable));
        assert_eq!(adapter.current_account().await, Ok(None));
        assert_eq!(
            adapter.ensure_network(&BASE_SEPOLIA).await,
            Err(ProviderError::ProviderUnavailable)
        );
        assert!(adapter.on_account_changed(|_| {}).is_err());
    }

    #[tokio::test]
    async fn connect_returns_first_account() {
        let provider = ScriptedProvider::new()
            .respond("eth_requestAccounts", Ok(json!([ALICE, "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"])));
        let adapter = WalletAdapter::new(Some(provider));
        let account = adapter.connect().await.unwrap();
        assert_eq!(account, Address::from_str(ALICE).unwrap());
    }

    #[tokio::test]
    async fn connect_maps_rejection_and_empty_lists() {
        let adapter = WalletAdapter::new(Some(
            ScriptedProvider::new().respond("eth_requestAccounts", rejected()),
        ));
        assert_eq!(adapter.connect().await, Err(ProviderError::UserRejected));

        let adapter = WalletAdapter::new(Some(
            ScriptedProvider::new().respond("eth_requestAccounts", Ok(json!([]))),
        ));
        assert_eq!(adapter.connect().await, Err(ProviderError::NoAccounts));
    }

    #[tokio::test]
    async fn ensure_network_is_idempotent_on_target_chain() {
        let provider = ScriptedProvider::new()
            .respond("eth_chainId", Ok(json!("0x14a34")))
            .respond("eth_chainId", Ok(json!("0x14a34")));
        let adapter = WalletAdapter::new(Some(provider));

        assert_eq!(
            adapter.ensure_network(&BASE_SEPOLIA).await,
            Ok(NetworkSwitch::AlreadyActive)
        );
        assert_eq!(
            adapter.ensure_network(&BASE_SEPOLIA).await,
            Ok(NetworkSwitch::AlreadyActive)
        );
        let methods = adapter.provider().unwrap().methods();
        assert_eq!(methods, vec!["eth_chainId", "eth_chainId"]);
    }

    #[tokio::test]
    async fn unknown_chain_is_added_with_full_metadata() {
        let provider = ScriptedProvider::new()
            .respond("eth_chainId", Ok(json!("0x1")))
            .respond(
                "wallet_switchEthereumChain",
                Err(ProviderRpcError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
            )
            .respond("wallet_addEthereumChain", Ok(Value::Null));
        let adapter = WalletAdapter::new(Some(provider));

        assert_eq!(
            adapter.ensure_network(&BASE_SEPOLIA).await,
            Ok(NetworkSwitch::Added)
        );
        let provider = adapter.provider().unwrap();
        let switch = provider.params_of("wallet_switchEthereumChain").unwrap();
        assert_eq!(switch[0]["chainId"], "0x14a34");
        let params = provider.params_of("wallet_addEthereumChain").unwrap();
        assert_eq!(params[0]["chainName"], "Base Sepolia");
        assert_eq!(params[0]["rpcUrls"][0], "https://sepolia.base.org");
        assert_eq!(params[0]["blockExplorerUrls"][0], "https://sepolia.basescan.org");
    }

    #[tokio::test]
    async fn switch_and_add_rejections_are_distinct() {
        let adapter = WalletAdapter::new(Some(
            ScriptedProvider::new()
                .respond("eth_chainId", Ok(json!("0x1")))
                .respond("wallet_switchEthereumChain", rejected()),
        ));
        assert_eq!(
            adapter.ensure_network(&HARDHAT_LOCAL).await,
            Err(ProviderError::SwitchRejected)
        );

        let adapter = WalletAdapter::new(Some(
            ScriptedProvider::new()
                .respond("eth_chainId", Ok(json!("0x1")))
                .respond(
                    "wallet_switchEthereumChain",
                    Err(ProviderRpcError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
                )
                .respond("wallet_addEthereumChain", rejected()),
        ));
        assert_eq!(
            adapter.ensure_network(&HARDHAT_LOCAL).await,
            Err(ProviderError::AddRejected)
        );
    }

    #[tokio::test]
    async fn pending_request_is_benign() {
        let adapter = WalletAdapter::new(Some(
            ScriptedProvider::new()
                .respond("eth_chainId", Ok(json!("0x1")))
                .respond(
                    "wallet_switchEthereumChain",
                    Err(ProviderRpcError::new(REQUEST_PENDING, "Request already pending")),
                ),
        ));
        assert_eq!(
            adapter.ensure_network(&BASE_SEPOLIA).await,
            Ok(NetworkSwitch::RequestPending)
        );
    }

    #[tokio::test]
    async fn other_provider_errors_pass_through() {
        let adapter = WalletAdapter::new(Some(
            ScriptedProvider::new()
                .respond("eth_chainId", Ok(json!("0x1")))
                .respond(
                    "wallet_switchEthereumChain",
                    Err(ProviderRpcError::new(-32603, "Internal error")),
                ),
        ));
        assert_eq!(
            adapter.ensure_network(&BASE_SEPOLIA).await,
            Err(ProviderError::Rpc {
                code: -32603,
                message: "Internal error".to_string()
            })
        );
    }

    #[tokio::test]
    async fn listeners_report_changes_until_cancelled() {
        let adapter = WalletAdapter::new(Some(ScriptedProvider::new()));
        let events = adapter.provider().unwrap().events.clone();

        let (account_tx, mut account_rx) = tokio::sync::mpsc::unbounded_channel();
        let accounts = adapter
            .on_account_changed(move |account| {
                let _ = account_tx.send(account);
            })
            .unwrap();
        let (chain_tx, mut chain_rx) = tokio::sync::mpsc::unbounded_channel();
        let chains = adapter
            .on_network_changed(move |chain_id| {
                let _ = chain_tx.send(chain_id);
            })
            .unwrap();

        let alice = Address::from_str(ALICE).unwrap();
        events.send(ProviderEvent::AccountsChanged(vec![alice])).unwrap();
        events.send(ProviderEvent::ChainChanged(1337)).unwrap();
        events.send(ProviderEvent::AccountsChanged(vec![])).unwrap();

        assert_eq!(account_rx.recv().await, Some(Some(alice)));
        assert_eq!(account_rx.recv().await, Some(None));
        assert_eq!(chain_rx.recv().await, Some(1337));

        accounts.stop().await;
        drop(chains);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let _ = events.send(ProviderEvent::ChainChanged(84532));
        assert_eq!(account_rx.recv().await, None);
        assert_eq!(chain_rx.recv().await, None);
    }
}
