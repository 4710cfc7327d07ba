// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deployment manifest (`contracts.json`) written by the deploy script.

use std::path::Path;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::contracts::ContractAddresses;
use super::types::NetworkConfig;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read deployment manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid deployment manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Unsupported chain id: {0}")]
    UnsupportedChain(u64),
}

/// The deploy script writes the chain id as a string; hand-edited manifests
/// sometimes carry a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainIdValue {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    pub network: String,
    pub chain_id: ChainIdValue,
    #[serde(default)]
    pub deployer: Option<Address>,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
}

impl DeploymentManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn chain_id(&self) -> Result<u64, ManifestError> {
        match &self.chain_id {
            ChainIdValue::Number(id) => Ok(*id),
            ChainIdValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ManifestError::InvalidChainId(text.clone())),
        }
    }

    /// Resolve the network the contracts were deployed to.
    pub fn network(&self) -> Result<NetworkConfig, ManifestError> {
        let chain_id = self.chain_id()?;
        NetworkConfig::by_chain_id(chain_id).ok_or(ManifestError::UnsupportedChain(chain_id))
    }
}
