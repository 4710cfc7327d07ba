// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process EIP-1193 provider backed by a local key.
//!
//! Used for the custodial flow, where the derived key signs on the user's
//! behalf, and for driving the adapter without a browser wallet.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::provider::{
    Eip1193, ProviderError, ProviderEvent, ProviderRpcError, INVALID_PARAMS, UNRECOGNIZED_CHAIN,
    UNSUPPORTED_METHOD, USER_REJECTED,
};
use crate::blockchain::signing::{SignerSource, SigningHandle};
use crate::blockchain::types::{parse_chain_id_hex, NetworkConfig};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug)]
struct LocalState {
    chain_id: u64,
    known_chains: HashSet<u64>,
    connected: bool,
    deny_requests: bool,
}

pub struct LocalWalletProvider {
    signer: PrivateKeySigner,
    state: Mutex<LocalState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWalletProvider {
    /// Start on `network`, which is also the only chain known initially.
    pub fn new(signer: PrivateKeySigner, network: &NetworkConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            signer,
            state: Mutex::new(LocalState {
                chain_id: network.chain_id,
                known_chains: HashSet::from([network.chain_id]),
                connected: false,
                deny_requests: false,
            }),
            events,
        }
    }

    /// Also accept switches to `network` without an add request.
    pub fn with_known_network(self, network: &NetworkConfig) -> Self {
        self.state().known_chains.insert(network.chain_id);
        self
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    /// Reject every permission, switch, add and signing request with 4001.
    pub fn set_deny_requests(&self, deny: bool) {
        self.state().deny_requests = deny;
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Revoke account access and notify listeners with an empty account list.
    pub fn disconnect(&self) {
        let was_connected = std::mem::replace(&mut self.state().connected, false);
        if was_connected {
            self.emit(ProviderEvent::AccountsChanged(Vec::new()));
        }
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn account_hex(&self) -> String {
        format!("{:#x}", self.signer.address())
    }

    fn requested_chain(params: &Value) -> Result<u64, ProviderRpcError> {
        params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .and_then(parse_chain_id_hex)
            .ok_or_else(|| ProviderRpcError::new(INVALID_PARAMS, "Expected a hex chainId"))
    }

    fn rejected() -> ProviderRpcError {
        ProviderRpcError::new(USER_REJECTED, "User rejected the request.")
    }

    fn switch_to(&self, chain_id: u64) {
        let changed = {
            let mut state = self.state();
            let changed = state.chain_id != chain_id;
            state.chain_id = chain_id;
            changed
        };
        if changed {
            tracing::debug!(chain_id, "Local provider switched chain");
            self.emit(ProviderEvent::ChainChanged(chain_id));
        }
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, ProviderRpcError> {
        match method {
            "eth_requestAccounts" => {
                let newly_connected = {
                    let mut state = self.state();
                    if state.deny_requests {
                        return Err(Self::rejected());
                    }
                    !std::mem::replace(&mut state.connected, true)
                };
                if newly_connected {
                    self.emit(ProviderEvent::AccountsChanged(vec![self.account()]));
                }
                Ok(json!([self.account_hex()]))
            }
            "eth_accounts" => {
                if self.state().connected {
                    Ok(json!([self.account_hex()]))
                } else {
                    Ok(json!([]))
                }
            }
            "eth_chainId" => Ok(json!(format!("{:#x}", self.state().chain_id))),
            "wallet_switchEthereumChain" => {
                let chain_id = Self::requested_chain(params)?;
                {
                    let state = self.state();
                    if state.deny_requests {
                        return Err(Self::rejected());
                    }
                    if !state.known_chains.contains(&chain_id) {
                        return Err(ProviderRpcError::new(
                            UNRECOGNIZED_CHAIN,
                            format!("Unrecognized chain ID {chain_id:#x}"),
                        ));
                    }
                }
                self.switch_to(chain_id);
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = Self::requested_chain(params)?;
                {
                    let mut state = self.state();
                    if state.deny_requests {
                        return Err(Self::rejected());
                    }
                    state.known_chains.insert(chain_id);
                }
                self.switch_to(chain_id);
                Ok(Value::Null)
            }
            other => Err(ProviderRpcError::new(
                UNSUPPORTED_METHOD,
                format!("Method {other} is not supported"),
            )),
        }
    }
}

impl Eip1193 for LocalWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        self.handle(method, &params)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

impl SignerSource for LocalWalletProvider {
    async fn signer(&self) -> Result<SigningHandle, ProviderError> {
        {
            let state = self.state();
            if state.deny_requests {
                return Err(ProviderError::UserRejected);
            }
            if !state.connected {
                return Err(ProviderError::NoAccounts);
            }
        }
        Ok(SigningHandle::from_signer(self.signer.clone()))
    }
}
