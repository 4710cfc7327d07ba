// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory chain that executes SenteToken / SenteVault calls.
//!
//! Transactions are mined immediately unless receipts are held, in which
//! case they sit in a pending queue until [`SimulatedChain::mine_pending`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    sol_types::SolInterface,
};

use super::backend::{ChainError, ContractBackend};
use super::contracts::{ContractAddresses, ISenteToken, ISenteVault};
use super::signing::SigningHandle;
use super::types::{TransferLog, TxReceipt, SECONDS_PER_DAY};

pub(crate) const GENESIS_TIME: u64 = 1_700_000_000;
pub(crate) const BLOCK_TIME: u64 = 2;
/// 100 sUSDT.
pub(crate) const FAUCET_AMOUNT: u64 = 100_000_000;

pub(crate) fn test_contracts() -> ContractAddresses {
    ContractAddresses {
        token: Address::repeat_byte(0x70),
        vault: Address::repeat_byte(0x71),
    }
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    token: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    vault: HashMap<Address, U256>,
    savings: HashMap<Address, U256>,
    unlock: HashMap<Address, u64>,
    last_claim: HashMap<Address, u64>,
}

impl Ledger {
    fn debit(map: &mut HashMap<Address, U256>, account: Address, amount: U256) -> Result<(), String> {
        let balance = map.entry(account).or_default();
        if *balance < amount {
            return Err("insufficient balance".to_string());
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(map: &mut HashMap<Address, U256>, account: Address, amount: U256) {
        *map.entry(account).or_default() += amount;
    }

    fn faucet_ready(&self, account: Address, now: u64) -> bool {
        self.last_claim
            .get(&account)
            .is_none_or(|last| now >= last + SECONDS_PER_DAY)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Submission {
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
    pub hash: B256,
}

#[derive(Debug)]
struct ChainState {
    chain_id: u64,
    block: u64,
    clock: u64,
    timestamps: HashMap<u64, u64>,
    code: HashSet<Address>,
    contracts: ContractAddresses,
    ledger: Ledger,
    receipts: HashMap<B256, TxReceipt>,
    pending: Vec<Submission>,
    logs: Vec<TransferLog>,
    submissions: Vec<Submission>,
    nonce: u64,
    fail_reads: bool,
    fail_submits: bool,
    hold_receipts: bool,
    stale_block_reads: usize,
    block_number_calls: usize,
}

type Transfers = Vec<(Address, Address, U256)>;

impl ChainState {
    fn execute(&self, ledger: &mut Ledger, call: &Submission) -> Result<Transfers, String> {
        let vault = self.contracts.vault;
        let from = call.from;
        let now = self.clock;

        if call.to == vault {
            use ISenteVault::ISenteVaultCalls as Vault;
            match Vault::abi_decode(&call.input).map_err(|e| e.to_string())? {
                Vault::transfer(c) => {
                    Ledger::debit(&mut ledger.vault, from, c.amount)?;
                    Ledger::credit(&mut ledger.vault, c.to, c.amount);
                    Ok(vec![])
                }
                Vault::deposit(c) => {
                    let allowance = ledger.allowances.entry((from, vault)).or_default();
                    if *allowance < c.amount {
                        return Err("insufficient allowance".to_string());
                    }
                    *allowance -= c.amount;
                    Ledger::debit(&mut ledger.token, from, c.amount)?;
                    Ledger::credit(&mut ledger.token, vault, c.amount);
                    Ledger::credit(&mut ledger.vault, from, c.amount);
                    Ok(vec![(from, vault, c.amount)])
                }
                Vault::withdraw(c) => {
                    Ledger::debit(&mut ledger.vault, from, c.amount)?;
                    Ledger::debit(&mut ledger.token, vault, c.amount)?;
                    Ledger::credit(&mut ledger.token, from, c.amount);
                    Ok(vec![(vault, from, c.amount)])
                }
                Vault::saveToVault(c) => {
                    let duration = u64::try_from(c.lockDuration).map_err(|e| e.to_string())?;
                    Ledger::debit(&mut ledger.vault, from, c.amount)?;
                    Ledger::credit(&mut ledger.savings, from, c.amount);
                    let unlock = ledger.unlock.entry(from).or_default();
                    *unlock = (*unlock).max(now + duration);
                    Ok(vec![])
                }
                Vault::withdrawFromVault(c) => {
                    if ledger.unlock.get(&from).is_some_and(|t| now < *t) {
                        return Err("savings still locked".to_string());
                    }
                    Ledger::debit(&mut ledger.savings, from, c.amount)?;
                    Ledger::credit(&mut ledger.vault, from, c.amount);
                    Ok(vec![])
                }
                _ => Err("view function called as transaction".to_string()),
            }
        } else if call.to == self.contracts.token {
            use ISenteToken::ISenteTokenCalls as Token;
            match Token::abi_decode(&call.input).map_err(|e| e.to_string())? {
                Token::approve(c) => {
                    ledger.allowances.insert((from, c.spender), c.amount);
                    Ok(vec![])
                }
                Token::claimFaucet(_) => {
                    if !ledger.faucet_ready(from, now) {
                        return Err("faucet cooldown".to_string());
                    }
                    let amount = U256::from(FAUCET_AMOUNT);
                    ledger.last_claim.insert(from, now);
                    Ledger::credit(&mut ledger.token, from, amount);
                    Ok(vec![(Address::ZERO, from, amount)])
                }
                _ => Err("view function called as transaction".to_string()),
            }
        } else {
            Err("no contract at target".to_string())
        }
    }

    /// Include `call` in a fresh block.
    fn mine(&mut self, call: Submission) -> TxReceipt {
        self.block += 1;
        self.clock += BLOCK_TIME;
        self.timestamps.insert(self.block, self.clock);

        let mut ledger = self.ledger.clone();
        let outcome = self.execute(&mut ledger, &call);
        let success = match outcome {
            Ok(transfers) => {
                self.ledger = ledger;
                for (index, (from, to, value)) in transfers.into_iter().enumerate() {
                    self.logs.push(TransferLog {
                        tx_hash: call.hash,
                        block_number: self.block,
                        log_index: index as u64,
                        from,
                        to,
                        value,
                    });
                }
                true
            }
            Err(_) => false,
        };

        let receipt = TxReceipt {
            tx_hash: call.hash,
            block_number: self.block,
            gas_used: 50_000,
            success,
        };
        self.receipts.insert(call.hash, receipt.clone());
        receipt
    }

    fn read_guard(&self, contract: Address) -> Result<(), ChainError> {
        if self.fail_reads {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        if !self.code.contains(&contract) {
            return Err(ChainError::Contract("call returned no data".to_string()));
        }
        Ok(())
    }
}

pub(crate) struct SimulatedChain {
    state: Mutex<ChainState>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(84532)
    }
}

impl SimulatedChain {
    pub fn new(chain_id: u64) -> Self {
        let contracts = test_contracts();
        let mut timestamps = HashMap::new();
        timestamps.insert(1, GENESIS_TIME);
        Self {
            state: Mutex::new(ChainState {
                chain_id,
                block: 1,
                clock: GENESIS_TIME,
                timestamps,
                code: HashSet::from([contracts.token, contracts.vault]),
                contracts,
                ledger: Ledger::default(),
                receipts: HashMap::new(),
                pending: Vec::new(),
                logs: Vec::new(),
                submissions: Vec::new(),
                nonce: 0,
                fail_reads: false,
                fail_submits: false,
                hold_receipts: false,
                stale_block_reads: 0,
                block_number_calls: 0,
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ChainState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn contracts(&self) -> ContractAddresses {
        self.with_state(|s| s.contracts)
    }

    pub fn fund_wallet(&self, account: Address, amount: U256) {
        self.with_state(|s| Ledger::credit(&mut s.ledger.token, account, amount));
    }

    pub fn credit_vault(&self, account: Address, amount: U256) {
        self.with_state(|s| {
            Ledger::credit(&mut s.ledger.vault, account, amount);
            let vault = s.contracts.vault;
            Ledger::credit(&mut s.ledger.token, vault, amount);
        });
    }

    pub fn vault_of(&self, account: Address) -> U256 {
        self.with_state(|s| s.ledger.vault.get(&account).copied().unwrap_or_default())
    }

    pub fn wallet_of(&self, account: Address) -> U256 {
        self.with_state(|s| s.ledger.token.get(&account).copied().unwrap_or_default())
    }

    pub fn set_code(&self, address: Address, present: bool) {
        self.with_state(|s| {
            if present {
                s.code.insert(address);
            } else {
                s.code.remove(&address);
            }
        });
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.with_state(|s| s.fail_reads = fail);
    }

    pub fn set_fail_submits(&self, fail: bool) {
        self.with_state(|s| s.fail_submits = fail);
    }

    pub fn hold_receipts(&self, hold: bool) {
        self.with_state(|s| s.hold_receipts = hold);
    }

    /// Mine every held transaction, one block each.
    pub fn mine_pending(&self) -> Vec<TxReceipt> {
        self.with_state(|s| {
            let pending = std::mem::take(&mut s.pending);
            pending.into_iter().map(|call| s.mine(call)).collect()
        })
    }

    pub fn pending_count(&self) -> usize {
        self.with_state(|s| s.pending.len())
    }

    pub fn mine_empty_blocks(&self, count: u64) {
        self.with_state(|s| {
            for _ in 0..count {
                s.block += 1;
                s.clock += BLOCK_TIME;
                let (block, clock) = (s.block, s.clock);
                s.timestamps.insert(block, clock);
            }
        });
    }

    /// Mine a block carrying a bare token `Transfer` log.
    pub fn record_transfer(&self, from: Address, to: Address, value: U256) -> B256 {
        self.with_state(|s| {
            s.nonce += 1;
            s.block += 1;
            s.clock += BLOCK_TIME;
            let (block, clock) = (s.block, s.clock);
            s.timestamps.insert(block, clock);
            let tx_hash = keccak256(s.nonce.to_be_bytes());
            s.logs.push(TransferLog {
                tx_hash,
                block_number: block,
                log_index: 0,
                from,
                to,
                value,
            });
            tx_hash
        })
    }

    pub fn advance_time(&self, seconds: u64) {
        self.with_state(|s| s.clock += seconds);
    }

    pub fn now(&self) -> u64 {
        self.with_state(|s| s.clock)
    }

    /// The next `count` block number reads report one block behind.
    pub fn serve_stale_blocks(&self, count: usize) {
        self.with_state(|s| s.stale_block_reads = count);
    }

    pub fn block_number_calls(&self) -> usize {
        self.with_state(|s| s.block_number_calls)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.with_state(|s| s.submissions.clone())
    }
}

impl ContractBackend for SimulatedChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.with_state(|s| {
            if s.fail_reads {
                return Err(ChainError::Rpc("connection refused".to_string()));
            }
            Ok(s.chain_id)
        })
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.with_state(|s| {
            if s.fail_reads {
                return Err(ChainError::Rpc("connection refused".to_string()));
            }
            s.block_number_calls += 1;
            if s.stale_block_reads > 0 {
                s.stale_block_reads -= 1;
                return Ok(s.block.saturating_sub(1));
            }
            Ok(s.block)
        })
    }

    async fn has_code(&self, address: Address) -> Result<bool, ChainError> {
        self.with_state(|s| {
            if s.fail_reads {
                return Err(ChainError::Rpc("connection refused".to_string()));
            }
            Ok(s.code.contains(&address))
        })
    }

    async fn vault_balance(&self, vault: Address, account: Address) -> Result<U256, ChainError> {
        self.with_state(|s| {
            s.read_guard(vault)?;
            Ok(s.ledger.vault.get(&account).copied().unwrap_or_default())
        })
    }

    async fn savings_balance(&self, vault: Address, account: Address) -> Result<U256, ChainError> {
        self.with_state(|s| {
            s.read_guard(vault)?;
            Ok(s.ledger.savings.get(&account).copied().unwrap_or_default())
        })
    }

    async fn unlock_time(&self, vault: Address, account: Address) -> Result<U256, ChainError> {
        self.with_state(|s| {
            s.read_guard(vault)?;
            Ok(U256::from(s.ledger.unlock.get(&account).copied().unwrap_or_default()))
        })
    }

    async fn savings_unlocked(&self, vault: Address, account: Address) -> Result<bool, ChainError> {
        self.with_state(|s| {
            s.read_guard(vault)?;
            Ok(s.ledger.unlock.get(&account).is_none_or(|t| s.clock >= *t))
        })
    }

    async fn can_claim_faucet(&self, token: Address, account: Address) -> Result<bool, ChainError> {
        self.with_state(|s| {
            s.read_guard(token)?;
            Ok(s.ledger.faucet_ready(account, s.clock))
        })
    }

    async fn submit(
        &self,
        signer: &SigningHandle,
        to: Address,
        input: Bytes,
    ) -> Result<B256, ChainError> {
        self.with_state(|s| {
            if s.fail_submits {
                return Err(ChainError::Transaction("insufficient funds for gas".to_string()));
            }
            s.nonce += 1;
            let mut seed = signer.account.to_vec();
            seed.extend_from_slice(&s.nonce.to_be_bytes());
            let submission = Submission {
                from: signer.account,
                to,
                input,
                hash: keccak256(&seed),
            };
            let hash = submission.hash;
            s.submissions.push(submission.clone());
            if s.hold_receipts {
                s.pending.push(submission);
            } else {
                s.mine(submission);
            }
            Ok(hash)
        })
    }

    async fn receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ChainError> {
        self.with_state(|s| {
            if s.fail_reads {
                return Err(ChainError::Rpc("connection refused".to_string()));
            }
            Ok(s.receipts.get(&hash).cloned())
        })
    }

    async fn transfer_logs(
        &self,
        token: Address,
        from: Option<Address>,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, ChainError> {
        self.with_state(|s| {
            s.read_guard(token)?;
            Ok(s.logs
                .iter()
                .filter(|log| (from_block..=to_block).contains(&log.block_number))
                .filter(|log| from.is_none_or(|f| log.from == f))
                .filter(|log| to.is_none_or(|t| log.to == t))
                .cloned()
                .collect())
        })
    }

    async fn block_timestamp(&self, block: u64) -> Result<Option<u64>, ChainError> {
        self.with_state(|s| {
            if s.fail_reads {
                return Err(ChainError::Rpc("connection refused".to_string()));
            }
            Ok(s.timestamps.get(&block).copied())
        })
    }
}
