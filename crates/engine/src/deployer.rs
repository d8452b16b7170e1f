// EDP - EVM Deployment Pipeline
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Contract deployment.

use std::{sync::Arc, time::Duration};

use alloy_network::TransactionBuilder;
use alloy_primitives::{hex, Address, Bytes, TxHash};
use alloy_rpc_types::TransactionRequest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{DeploymentError, LedgerClient, SelectedContract};

/// Where a contract ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Address of the created contract
    pub address: Address,
    /// Hash of the creation transaction
    pub transaction_hash: TxHash,
}

/// Submits contract creation transactions and waits for them to be mined.
pub struct Deployer {
    ledger: Arc<dyn LedgerClient>,
    receipt_timeout: Duration,
}

impl Deployer {
    /// Create a deployer on top of `ledger`.
    pub fn new(ledger: Arc<dyn LedgerClient>, receipt_timeout: Duration) -> Self {
        Self { ledger, receipt_timeout }
    }

    /// Deploy `contract` from `from`.
    ///
    /// Exactly one transaction is submitted and it is never retried. The
    /// address is returned only once the receipt confirms the creation.
    pub async fn deploy(
        &self,
        contract: &SelectedContract,
        from: Address,
    ) -> Result<DeploymentResult, DeploymentError> {
        let code = creation_code(contract)?;

        info!(contract = %contract.name, %from, code_len = code.len(), "deploying contract");
        let tx = TransactionRequest::default().from(from).with_deploy_code(code);
        let hash = self.ledger.submit(tx).await?;

        let receipt = self.ledger.wait_for_receipt(hash, self.receipt_timeout).await?;
        if !receipt.success {
            warn!(%hash, "deployment reverted");
            return Err(DeploymentError::Reverted(hash));
        }
        let address = receipt.contract_address.ok_or(DeploymentError::MissingAddress(hash))?;

        info!(contract = %contract.name, %address, %hash, "contract deployed");
        Ok(DeploymentResult { address, transaction_hash: hash })
    }
}

/// Check the constructor and decode the creation bytecode.
fn creation_code(contract: &SelectedContract) -> Result<Bytes, DeploymentError> {
    if let Some(constructor) = &contract.abi.constructor {
        if !constructor.inputs.is_empty() {
            return Err(DeploymentError::ConstructorArguments {
                contract: contract.name.clone(),
                expected: constructor.inputs.len(),
            });
        }
    }

    hex::decode(&contract.bytecode_hex).map(Bytes::from).map_err(|e| {
        let reason = if contract.bytecode_hex.contains("__") {
            format!("bytecode has unlinked library placeholders ({e})")
        } else {
            e.to_string()
        };
        DeploymentError::MalformedBytecode { contract: contract.name.clone(), reason }
    })
}

#[cfg(test)]
mod tests {
    use alloy_json_abi::JsonAbi;

    use super::*;
    use crate::{test_utils::MockLedger, LedgerError};

    fn selected(abi: JsonAbi, bytecode_hex: &str) -> SelectedContract {
        SelectedContract {
            name: "Pokemon".into(),
            source_path: "contracts/Pokemon.sol".into(),
            abi,
            bytecode_hex: bytecode_hex.into(),
        }
    }

    #[tokio::test]
    async fn test_deploy_returns_receipt_address() {
        let ledger = Arc::new(MockLedger::new());
        let deployer = Deployer::new(ledger.clone(), Duration::from_secs(1));
        let from = ledger.accounts().await.unwrap()[0];

        let result = deployer.deploy(&selected(JsonAbi::new(), "6080604052"), from).await.unwrap();

        let submitted = ledger.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].from, Some(from));
        assert_eq!(result.address, MockLedger::contract_address_for(0));
        assert_eq!(result.transaction_hash, MockLedger::hash_for(0));
    }

    #[tokio::test]
    async fn test_constructor_with_arguments_is_rejected_before_submission() {
        let abi = JsonAbi::parse(["constructor(string name)"]).unwrap();
        let ledger = Arc::new(MockLedger::new());
        let deployer = Deployer::new(ledger.clone(), Duration::from_secs(1));

        let err = deployer.deploy(&selected(abi, "6080"), Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DeploymentError::ConstructorArguments { expected: 1, .. }));
        assert!(ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_unlinked_bytecode_is_malformed() {
        let ledger = Arc::new(MockLedger::new());
        let deployer = Deployer::new(ledger.clone(), Duration::from_secs(1));
        let unlinked = "6080__$1234567890abcdef1234567890abcdef12$__6040";

        let err = deployer.deploy(&selected(JsonAbi::new(), unlinked), Address::ZERO).await.unwrap_err();
        match err {
            DeploymentError::MalformedBytecode { reason, .. } => assert!(reason.contains("unlinked")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_receipt_failures() {
        let ledger = Arc::new(MockLedger::new().revert_at(0));
        let deployer = Deployer::new(ledger, Duration::from_secs(1));
        let err = deployer.deploy(&selected(JsonAbi::new(), "6080"), Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DeploymentError::Reverted(hash) if hash == MockLedger::hash_for(0)));

        let ledger = Arc::new(MockLedger::new().without_contract_addresses());
        let deployer = Deployer::new(ledger, Duration::from_secs(1));
        let err = deployer.deploy(&selected(JsonAbi::new(), "6080"), Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DeploymentError::MissingAddress(_)));

        let ledger = Arc::new(MockLedger::new().time_out_at(0));
        let deployer = Deployer::new(ledger, Duration::from_millis(10));
        let err = deployer.deploy(&selected(JsonAbi::new(), "6080"), Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DeploymentError::Ledger(LedgerError::Timeout { .. })));

        let ledger = Arc::new(MockLedger::new().reject_at(0, "insufficient funds"));
        let deployer = Deployer::new(ledger, Duration::from_secs(1));
        let err = deployer.deploy(&selected(JsonAbi::new(), "6080"), Address::ZERO).await.unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
    }
}
