// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SenteChain contract integration.
//!
//! This module provides functionality for:
//! - Reading vault balances, savings and lock state
//! - Submitting transfers, deposits, savings locks and faucet claims
//! - Loading the deployment manifest written by the deploy script

pub mod amount;
pub mod backend;
pub mod client;
pub mod contracts;
pub mod deployment;
pub mod facade;
pub mod signing;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ChainError, ContractBackend};
pub use client::SenteChainClient;
pub use contracts::{ContractAddresses, ContractCall};
pub use deployment::{DeploymentManifest, ManifestError};
pub use facade::{ContractError, ContractFacade};
pub use signing::{KeySigner, SignerSource, SigningHandle};
pub use types::*;
