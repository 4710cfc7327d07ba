// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Environment self-check run before the dashboard loads.

use serde::Serialize;

use super::provider::{Eip1193, WalletAdapter};
use crate::blockchain::facade::ContractFacade;
use crate::blockchain::signing::SignerSource;
use crate::blockchain::types::TOKEN_SYMBOL;
use crate::blockchain::ContractBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupStep {
    ProviderInstalled,
    AccountConnected,
    NetworkMatches,
    TokenDeployed,
    VaultDeployed,
    VaultReadable,
}

impl SetupStep {
    /// All steps, in the order they run.
    pub const ALL: [SetupStep; 6] = [
        SetupStep::ProviderInstalled,
        SetupStep::AccountConnected,
        SetupStep::NetworkMatches,
        SetupStep::TokenDeployed,
        SetupStep::VaultDeployed,
        SetupStep::VaultReadable,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum StepStatus {
    Passed(String),
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub step: SetupStep,
    #[serde(flatten)]
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupReport {
    pub steps: Vec<StepResult>,
}

impl SetupReport {
    pub fn is_ok(&self) -> bool {
        self.steps.len() == SetupStep::ALL.len()
            && self
                .steps
                .iter()
                .all(|s| matches!(s.status, StepStatus::Passed(_)))
    }

    pub fn first_failure(&self) -> Option<&StepResult> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    fn pass(&mut self, step: SetupStep, detail: impl Into<String>) {
        self.steps.push(StepResult {
            step,
            status: StepStatus::Passed(detail.into()),
        });
    }

    fn fail(&mut self, step: SetupStep, reason: String) {
        self.steps.push(StepResult {
            step,
            status: StepStatus::Failed(reason),
        });
        for skipped in SetupStep::ALL.iter().skip_while(|s| **s != step).skip(1) {
            self.steps.push(StepResult {
                step: *skipped,
                status: StepStatus::Skipped,
            });
        }
    }
}

type StepFailure = (SetupStep, String);

async fn run_checks<P, B, S>(
    adapter: &WalletAdapter<P>,
    facade: &ContractFacade<B, S>,
    report: &mut SetupReport,
) -> Result<(), StepFailure>
where
    P: Eip1193,
    B: ContractBackend,
    S: SignerSource,
{
    if !adapter.is_installed() {
        return Err((
            SetupStep::ProviderInstalled,
            "No wallet provider installed".to_string(),
        ));
    }
    report.pass(SetupStep::ProviderInstalled, "Wallet provider is installed");

    let account = adapter
        .connect()
        .await
        .map_err(|e| (SetupStep::AccountConnected, e.to_string()))?;
    report.pass(
        SetupStep::AccountConnected,
        format!("Wallet connected: {}", account.to_checksum(None)),
    );

    let network = facade.network();
    let chain_id = adapter
        .chain_id()
        .await
        .map_err(|e| (SetupStep::NetworkMatches, e.to_string()))?;
    if chain_id != network.chain_id {
        return Err((
            SetupStep::NetworkMatches,
            format!(
                "Wrong network. Please switch to {} (Chain ID: {}). Current chain: {chain_id}",
                network.name, network.chain_id
            ),
        ));
    }
    report.pass(SetupStep::NetworkMatches, format!("Connected to {}", network.name));

    let contracts = *facade.contracts();
    for (step, name, address) in [
        (SetupStep::TokenDeployed, "SenteToken", contracts.token),
        (SetupStep::VaultDeployed, "SenteVault", contracts.vault),
    ] {
        let deployed = facade
            .backend()
            .has_code(address)
            .await
            .map_err(|e| (step, e.to_string()))?;
        if !deployed {
            return Err((step, format!("{name} contract not deployed at {address}")));
        }
        report.pass(step, format!("{name} contract deployed at {address}"));
    }

    let balance = facade
        .try_get_balance(&account.to_checksum(None))
        .await
        .map_err(|e| (SetupStep::VaultReadable, e.to_string()))?;
    report.pass(
        SetupStep::VaultReadable,
        format!("Contract read successful. Your balance: {balance} {TOKEN_SYMBOL}"),
    );
    Ok(())
}

/// Run every check in order, stopping at the first failure.
pub async fn check_setup<P, B, S>(adapter: &WalletAdapter<P>, facade: &ContractFacade<B, S>) -> SetupReport
where
    P: Eip1193,
    B: ContractBackend,
    S: SignerSource,
{
    let mut report = SetupReport::default();
    match run_checks(adapter, facade, &mut report).await {
        Ok(()) => tracing::info!("Setup check completed successfully"),
        Err((step, reason)) => {
            tracing::warn!(step = ?step, reason = %reason, "Setup check failed");
            report.fail(step, reason);
        }
    }
    report
}
