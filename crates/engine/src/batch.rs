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

//! Per-asset method calls against the deployed contract.
//!
//! Items are submitted one after the other, in input order, each waiting for
//! its receipt before the next one is sent. A failing item is recorded and the
//! batch goes on; the caller always gets one [`CallResult`] per asset.

use std::{sync::Arc, time::Duration};

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_rpc_types::TransactionRequest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{CallError, ExternalAsset, LedgerClient};

/// Parameter types the batch method must take, in order
pub const BATCH_METHOD_SIGNATURE: [&str; 3] = ["string", "address", "string"];

/// A deployed contract the batch talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractHandle {
    /// Deployed address
    pub address: Address,
    /// Interface used to encode calls
    pub abi: JsonAbi,
}

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    /// Name of the asset the call was made for
    pub asset_name: String,
    /// Whether the call was mined without reverting
    pub success: bool,
    /// Hash of the call transaction, when one reached the ledger
    pub transaction_hash: Option<TxHash>,
    /// Failure description
    pub error: Option<String>,
}

impl CallResult {
    /// A mined, successful call.
    pub fn succeeded(asset_name: impl Into<String>, transaction_hash: TxHash) -> Self {
        Self {
            asset_name: asset_name.into(),
            success: true,
            transaction_hash: Some(transaction_hash),
            error: None,
        }
    }

    /// A failed call.
    pub fn failed(asset_name: impl Into<String>, error: &CallError) -> Self {
        Self {
            asset_name: asset_name.into(),
            success: false,
            transaction_hash: error.transaction_hash(),
            error: Some(error.to_string()),
        }
    }
}

/// Encode `method(asset.name, owner, asset.image_uri)` against `abi`.
pub fn encode_call(
    abi: &JsonAbi,
    method: &str,
    asset: &ExternalAsset,
    owner: Address,
) -> Result<Bytes, CallError> {
    let function = find_batch_function(abi, method)?;
    let args = [
        DynSolValue::String(asset.name.clone()),
        DynSolValue::Address(owner),
        DynSolValue::String(asset.image_uri.clone()),
    ];
    function
        .abi_encode_input(&args)
        .map(Bytes::from)
        .map_err(|e| CallError::Encoding(e.to_string()))
}

fn find_batch_function<'a>(abi: &'a JsonAbi, method: &str) -> Result<&'a Function, CallError> {
    let overloads = abi.function(method).ok_or_else(|| CallError::UnknownMethod(method.into()))?;
    overloads
        .iter()
        .find(|f| f.inputs.iter().map(|p| p.ty.as_str()).eq(BATCH_METHOD_SIGNATURE))
        .ok_or_else(|| CallError::NoMatchingOverload(method.into()))
}

/// Submits the batch method once per asset.
pub struct BatchCallSubmitter {
    ledger: Arc<dyn LedgerClient>,
    method: String,
    receipt_timeout: Duration,
}

impl BatchCallSubmitter {
    /// Create a submitter calling `method` through `ledger`.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        method: impl Into<String>,
        receipt_timeout: Duration,
    ) -> Self {
        Self { ledger, method: method.into(), receipt_timeout }
    }

    /// Call the batch method for every asset, in order, sending from `from`.
    ///
    /// `from` is also passed as the owner argument. Returns exactly one result
    /// per asset, in the same order.
    pub async fn submit(
        &self,
        contract: &ContractHandle,
        assets: &[ExternalAsset],
        from: Address,
    ) -> Vec<CallResult> {
        info!(
            contract = %contract.address,
            method = %self.method,
            items = assets.len(),
            "submitting batch"
        );

        let mut results = Vec::with_capacity(assets.len());
        for (index, asset) in assets.iter().enumerate() {
            let result = match self.call(contract, asset, from).await {
                Ok(hash) => {
                    info!(index, asset = %asset.name, %hash, "batch item succeeded");
                    CallResult::succeeded(&asset.name, hash)
                }
                Err(err) => {
                    warn!(index, asset = %asset.name, error = %err, "batch item failed");
                    CallResult::failed(&asset.name, &err)
                }
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        info!(total = results.len(), failed, "batch finished");
        results
    }

    async fn call(
        &self,
        contract: &ContractHandle,
        asset: &ExternalAsset,
        from: Address,
    ) -> Result<TxHash, CallError> {
        let input = encode_call(&contract.abi, &self.method, asset, from)?;
        let tx = TransactionRequest::default().from(from).with_to(contract.address).with_input(input);

        let hash = self.ledger.submit(tx).await?;
        let receipt = self.ledger.wait_for_receipt(hash, self.receipt_timeout).await?;
        if !receipt.success {
            return Err(CallError::Reverted(hash));
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::hex;

    use super::*;
    use crate::test_utils::{pokemon_abi, MockLedger};

    fn assets(names: &[&str]) -> Vec<ExternalAsset> {
        names.iter().map(|n| ExternalAsset::new(*n, format!("https://gw/Qm{n}"))).collect()
    }

    fn handle(abi: JsonAbi) -> ContractHandle {
        ContractHandle { address: Address::repeat_byte(0xcc), abi }
    }

    #[test]
    fn test_encode_call_uses_selector_and_arguments() {
        let abi = pokemon_abi();
        let owner = Address::repeat_byte(0x11);
        let asset = ExternalAsset::new("pikachu", "https://ipfs.io/ipfs/QmPika");

        let data = encode_call(&abi, "createNewPokemon", &asset, owner).unwrap();

        let function = &abi.function("createNewPokemon").unwrap()[0];
        assert_eq!(data[..4], function.selector()[..]);
        let decoded = function.abi_decode_input(&data[4..]).unwrap();
        assert_eq!(decoded[0], DynSolValue::String("pikachu".into()));
        assert_eq!(decoded[1], DynSolValue::Address(owner));
        assert_eq!(decoded[2], DynSolValue::String("https://ipfs.io/ipfs/QmPika".into()));
    }

    #[test]
    fn test_encode_call_method_lookup() {
        let asset = ExternalAsset::new("a", "b");
        let err = encode_call(&pokemon_abi(), "mint", &asset, Address::ZERO).unwrap_err();
        assert!(matches!(err, CallError::UnknownMethod(m) if m == "mint"));

        let abi = JsonAbi::parse(["function createNewPokemon(string name)"]).unwrap();
        let err = encode_call(&abi, "createNewPokemon", &asset, Address::ZERO).unwrap_err();
        assert!(matches!(err, CallError::NoMatchingOverload(_)));

        // The right overload is picked among several
        let abi = JsonAbi::parse([
            "function createNewPokemon(string name)",
            "function createNewPokemon(string name, address owner, string img)",
        ])
        .unwrap();
        assert!(encode_call(&abi, "createNewPokemon", &asset, Address::ZERO).is_ok());
    }

    #[tokio::test]
    async fn test_second_item_rejected_batch_continues() {
        let ledger = Arc::new(MockLedger::new().reject_at(1, "nonce too low"));
        let submitter =
            BatchCallSubmitter::new(ledger.clone(), "createNewPokemon", Duration::from_secs(1));
        let from = Address::repeat_byte(0x11);

        let results =
            submitter.submit(&handle(pokemon_abi()), &assets(&["a", "b", "c"]), from).await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().map(|r| (r.asset_name.as_str(), r.success)).collect::<Vec<_>>(),
            [("a", true), ("b", false), ("c", true)]
        );
        assert!(results[1].error.as_deref().unwrap().contains("nonce too low"));
        assert_eq!(results[1].transaction_hash, None);
        assert_eq!(results[0].transaction_hash, Some(MockLedger::hash_for(0)));
        assert_eq!(results[2].transaction_hash, Some(MockLedger::hash_for(2)));

        // All three reached the node, in order, aimed at the contract
        let submitted = ledger.submitted();
        assert_eq!(submitted.len(), 3);
        for (tx, asset) in submitted.iter().zip(assets(&["a", "b", "c"])) {
            assert_eq!(tx.from, Some(from));
            let input = tx.input.input().unwrap();
            let expected = encode_call(&pokemon_abi(), "createNewPokemon", &asset, from).unwrap();
            assert_eq!(input, &expected, "{}", hex::encode(input));
        }
    }

    #[tokio::test]
    async fn test_revert_and_timeout_keep_the_hash() {
        let ledger = Arc::new(MockLedger::new().revert_at(0).time_out_at(1));
        let submitter = BatchCallSubmitter::new(ledger, "createNewPokemon", Duration::from_millis(5));

        let results = submitter
            .submit(&handle(pokemon_abi()), &assets(&["a", "b"]), Address::ZERO)
            .await;

        assert!(!results[0].success);
        assert_eq!(results[0].transaction_hash, Some(MockLedger::hash_for(0)));
        assert!(results[0].error.as_deref().unwrap().contains("reverted"));
        assert!(!results[1].success);
        assert_eq!(results[1].transaction_hash, Some(MockLedger::hash_for(1)));
        assert!(results[1].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_method_fails_every_item_without_submitting() {
        let ledger = Arc::new(MockLedger::new());
        let submitter = BatchCallSubmitter::new(ledger.clone(), "levelUp", Duration::from_secs(1));

        let results =
            submitter.submit(&handle(pokemon_abi()), &assets(&["a", "b"]), Address::ZERO).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success && r.transaction_hash.is_none()));
        assert!(ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let submitter =
            BatchCallSubmitter::new(Arc::new(MockLedger::new()), "createNewPokemon", Duration::ZERO);
        assert!(submitter.submit(&handle(pokemon_abi()), &[], Address::ZERO).await.is_empty());
    }
}
