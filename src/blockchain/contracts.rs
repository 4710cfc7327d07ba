// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SenteToken / SenteVault bindings and write-call encoding.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};
use serde::{Deserialize, Serialize};

use super::types::TxKind;

sol! {
    /// ERC-20 token with a once-per-day faucet.
    #[sol(rpc)]
    interface ISenteToken {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function claimFaucet() external;
        function canClaimFaucet(address user) external view returns (bool);
    }
}

sol! {
    /// Internal ledger with time-locked savings.
    #[sol(rpc)]
    interface ISenteVault {
        function getBalance(address user) external view returns (uint256);
        function getSavingsBalance(address user) external view returns (uint256);
        function getUnlockTime(address user) external view returns (uint256);
        function isSavingsUnlocked(address user) external view returns (bool);
        function transfer(address to, uint256 amount) external;
        function deposit(uint256 amount) external;
        function withdraw(uint256 amount) external;
        function saveToVault(uint256 amount, uint256 lockDuration) external;
        function withdrawFromVault(uint256 amount) external;
    }
}

/// Deployed contract addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    #[serde(rename = "SenteToken")]
    pub token: Address,
    #[serde(rename = "SenteVault")]
    pub vault: Address,
}

/// A state-changing contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    /// Vault-internal transfer to another account.
    Transfer { to: Address, amount: U256 },
    /// Token approval for the vault to pull `amount`.
    Approve { amount: U256 },
    /// Move approved tokens from the wallet into the vault.
    Deposit { amount: U256 },
    /// Move vault balance back to the wallet.
    Withdraw { amount: U256 },
    /// Lock vault balance as savings for `lock_duration` seconds.
    SaveToVault { amount: U256, lock_duration: U256 },
    /// Release unlocked savings back to the vault balance.
    WithdrawFromVault { amount: U256 },
    ClaimFaucet,
}

impl ContractCall {
    pub fn kind(&self) -> TxKind {
        match self {
            ContractCall::Transfer { .. } => TxKind::Transfer,
            ContractCall::Approve { .. } => TxKind::Approve,
            ContractCall::Deposit { .. } => TxKind::Deposit,
            ContractCall::Withdraw { .. } => TxKind::Withdraw,
            ContractCall::SaveToVault { .. } => TxKind::Lock,
            ContractCall::WithdrawFromVault { .. } => TxKind::WithdrawSavings,
            ContractCall::ClaimFaucet => TxKind::Faucet,
        }
    }

    /// Target contract and ABI-encoded calldata.
    pub fn encode(&self, contracts: &ContractAddresses) -> (Address, Bytes) {
        match self {
            ContractCall::Transfer { to, amount } => (
                contracts.vault,
                ISenteVault::transferCall {
                    to: *to,
                    amount: *amount,
                }
                .abi_encode()
                .into(),
            ),
            ContractCall::Approve { amount } => (
                contracts.token,
                ISenteToken::approveCall {
                    spender: contracts.vault,
                    amount: *amount,
                }
                .abi_encode()
                .into(),
            ),
            ContractCall::Deposit { amount } => (
                contracts.vault,
                ISenteVault::depositCall { amount: *amount }.abi_encode().into(),
            ),
            ContractCall::Withdraw { amount } => (
                contracts.vault,
                ISenteVault::withdrawCall { amount: *amount }.abi_encode().into(),
            ),
            ContractCall::SaveToVault {
                amount,
                lock_duration,
            } => (
                contracts.vault,
                ISenteVault::saveToVaultCall {
                    amount: *amount,
                    lockDuration: *lock_duration,
                }
                .abi_encode()
                .into(),
            ),
            ContractCall::WithdrawFromVault { amount } => (
                contracts.vault,
                ISenteVault::withdrawFromVaultCall { amount: *amount }
                    .abi_encode()
                    .into(),
            ),
            ContractCall::ClaimFaucet => (
                contracts.token,
                ISenteToken::claimFaucetCall {}.abi_encode().into(),
            ),
        }
    }
}
