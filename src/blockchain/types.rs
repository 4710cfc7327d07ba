// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// sUSDT uses 6 decimals, like USDT.
pub const TOKEN_DECIMALS: u8 = 6;

pub const TOKEN_SYMBOL: &str = "sUSDT";

pub const SECONDS_PER_DAY: u64 = 86_400;

/// How far back transaction history scans for Transfer logs.
pub const HISTORY_BLOCK_WINDOW: u64 = 10_000;

/// Native currency metadata advertised when adding a chain to a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// EVM network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: Option<&'static str>,
    pub currency: NativeCurrency,
}

/// Base Sepolia testnet configuration.
pub const BASE_SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Base Sepolia",
    chain_id: 84532,
    rpc_url: "https://sepolia.base.org",
    explorer_url: Some("https://sepolia.basescan.org"),
    currency: NativeCurrency {
        name: "Ethereum",
        symbol: "ETH",
        decimals: 18,
    },
};

/// Local Hardhat node configuration.
pub const HARDHAT_LOCAL: NetworkConfig = NetworkConfig {
    name: "Hardhat Local",
    chain_id: 1337,
    rpc_url: "http://127.0.0.1:8545",
    explorer_url: None,
    currency: NativeCurrency {
        name: "Ethereum",
        symbol: "ETH",
        decimals: 18,
    },
};

impl NetworkConfig {
    /// Look up a supported network by chain id.
    pub fn by_chain_id(chain_id: u64) -> Option<NetworkConfig> {
        [BASE_SEPOLIA, HARDHAT_LOCAL]
            .into_iter()
            .find(|n| n.chain_id == chain_id)
    }

    /// Chain id in the `0x`-prefixed lowercase hex form used by EIP-1193.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Parameters for `wallet_addEthereumChain` (EIP-3085).
    pub fn add_chain_params(&self) -> serde_json::Value {
        let explorers: Vec<&str> = self.explorer_url.into_iter().collect();
        serde_json::json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.name,
            "nativeCurrency": {
                "name": self.currency.name,
                "symbol": self.currency.symbol,
                "decimals": self.currency.decimals,
            },
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": explorers,
        })
    }

    /// Explorer link for a transaction, if the network has an explorer.
    pub fn tx_url(&self, hash: &B256) -> Option<String> {
        self.explorer_url.map(|base| format!("{base}/tx/{hash}"))
    }
}

/// Parse a `0x` hex chain id such as `0x14a34`.
pub fn parse_chain_id_hex(raw: &str) -> Option<u64> {
    let digits = raw.trim().strip_prefix("0x").or_else(|| raw.trim().strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

/// Parse a user-supplied account address.
///
/// All-lowercase and all-uppercase hex are accepted as-is; mixed case must
/// carry a valid EIP-55 checksum.
pub fn parse_address(raw: &str) -> Option<Address> {
    let value = raw.trim();
    if !crate::models::is_wallet_address(value) {
        return None;
    }
    let hex = &value[2..];
    let single_case = hex == hex.to_ascii_lowercase() || hex == hex.to_ascii_uppercase();
    if single_case {
        Address::from_str(value).ok()
    } else {
        Address::parse_checksummed(value, None).ok()
    }
}

/// Shorten an address or hash for display: `0x1234...abcd`.
pub fn shorten_hex(value: &str) -> String {
    if value.len() <= 10 {
        return value.to_string();
    }
    format!("{}...{}", &value[..6], &value[value.len() - 4..])
}

/// Kind of write submitted through the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    Transfer,
    Approve,
    Deposit,
    Lock,
    Withdraw,
    WithdrawSavings,
    Faucet,
}

/// A submitted write that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub hash: B256,
    pub kind: TxKind,
    /// Account that signed the transaction.
    pub account: Address,
    pub submitted_at: DateTime<Utc>,
}

/// Transaction receipt after inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Read-only projection of an account's vault state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    /// Spendable vault balance, as a decimal string.
    pub available: String,
    /// Time-locked savings, as a decimal string.
    pub savings: String,
    /// Unix seconds; 0 if never locked.
    pub unlock_time: u64,
    /// Block observed before the reads were issued.
    pub block: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn is_locked(&self, now_unix: u64) -> bool {
        self.unlock_time > now_unix
    }
}

/// A decoded `Transfer(from, to, value)` token event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLog {
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_hex_matches_wallet_format() {
        assert_eq!(BASE_SEPOLIA.chain_id_hex(), "0x14a34");
        assert_eq!(HARDHAT_LOCAL.chain_id_hex(), "0x539");
        assert_eq!(parse_chain_id_hex("0x14A34"), Some(84532));
        assert_eq!(parse_chain_id_hex("84532"), None);
    }

    #[test]
    fn add_chain_params_carry_full_metadata() {
        let params = BASE_SEPOLIA.add_chain_params();
        assert_eq!(params["chainId"], "0x14a34");
        assert_eq!(params["chainName"], "Base Sepolia");
        assert_eq!(params["nativeCurrency"]["symbol"], "ETH");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["rpcUrls"][0], "https://sepolia.base.org");
        assert_eq!(params["blockExplorerUrls"][0], "https://sepolia.basescan.org");

        let local = HARDHAT_LOCAL.add_chain_params();
        assert_eq!(local["blockExplorerUrls"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn looks_up_supported_networks() {
        assert_eq!(NetworkConfig::by_chain_id(84532), Some(BASE_SEPOLIA));
        assert_eq!(NetworkConfig::by_chain_id(1337), Some(HARDHAT_LOCAL));
        assert_eq!(NetworkConfig::by_chain_id(1), None);
    }

    #[test]
    fn explorer_links() {
        let hash = B256::repeat_byte(0xab);
        let url = BASE_SEPOLIA.tx_url(&hash).unwrap();
        assert!(url.starts_with("https://sepolia.basescan.org/tx/0xabab"));
        assert_eq!(HARDHAT_LOCAL.tx_url(&hash), None);
    }

    #[test]
    fn address_parsing_checks_checksum_for_mixed_case() {
        let checksummed = "0x52908400098527886E0F7030069857D2E4169EE7";
        assert!(parse_address(checksummed).is_some());
        assert!(parse_address(&checksummed.to_lowercase()).is_some());
        assert!(parse_address("0x52908400098527886e0F7030069857D2E4169EE7").is_none());
        assert!(parse_address("").is_none());
        assert!(parse_address("0x1234").is_none());
    }

    #[test]
    fn shortens_hex_values() {
        assert_eq!(
            shorten_hex("0x52908400098527886E0F7030069857D2E4169EE7"),
            "0x5290...9EE7"
        );
        assert_eq!(shorten_hex("0x1234"), "0x1234");
    }
}
