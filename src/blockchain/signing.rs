// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing handles.
//!
//! The facade asks a [`SignerSource`] for a fresh [`SigningHandle`] on every
//! write and drops it once the transaction is broadcast.

use std::future::Future;
use std::sync::Arc;

use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};

use crate::wallet::provider::ProviderError;

/// An account plus the wallet able to sign for it.
#[derive(Clone)]
pub struct SigningHandle {
    pub account: Address,
    pub wallet: EthereumWallet,
}

impl std::fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningHandle")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl SigningHandle {
    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        Self {
            account: signer.address(),
            wallet: EthereumWallet::from(signer),
        }
    }
}

/// Anything that can hand out a signing connection on demand.
pub trait SignerSource: Send + Sync + 'static {
    fn signer(&self) -> impl Future<Output = Result<SigningHandle, ProviderError>> + Send;
}

impl<T: SignerSource> SignerSource for Arc<T> {
    fn signer(&self) -> impl Future<Output = Result<SigningHandle, ProviderError>> + Send {
        self.as_ref().signer()
    }
}

/// Signer source backed by a single private key, such as the custodial
/// key rebuilt by the address deriver.
#[derive(Clone)]
pub struct KeySigner {
    signer: PrivateKeySigner,
}

impl KeySigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl SignerSource for KeySigner {
    async fn signer(&self) -> Result<SigningHandle, ProviderError> {
        Ok(SigningHandle::from_signer(self.signer.clone()))
    }
}

/// Create a signer from a hex private key (with or without `0x`).
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ProviderError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid private key: {e}")))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid private key: {e}")))
}
