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

//! In-memory stand-ins for the pipeline's external systems.
//!
//! Used by the unit tests of this crate, the integration tests in `tests/`
//! and the `edp` binary tests. Nothing here talks to a network or a compiler.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;

use crate::{
    AssetDirectory, AssetDirectoryError, CompilationError, CompiledArtifactSet, ContractArtifact,
    ExternalAsset, LedgerClient, LedgerError, NormalizedSources, Receipt, SourceCompiler,
};

/// ABI with the default batch method, `createNewPokemon(string,address,string)`.
pub fn pokemon_abi() -> JsonAbi {
    JsonAbi::parse([
        "function createNewPokemon(string name, address owner, string img)",
        "function getPokemonCount() view returns (uint256)",
    ])
    .expect("valid ABI")
}

/// A concrete contract: batch-method ABI and the given bytecode.
pub fn concrete_artifact(name: &str, bytecode_hex: &str) -> ContractArtifact {
    ContractArtifact {
        name: name.into(),
        abi: Some(pokemon_abi()),
        bytecode_hex: bytecode_hex.into(),
        metadata: None,
    }
}

/// An interface: ABI present, bytecode empty.
pub fn interface_artifact(name: &str) -> ContractArtifact {
    ContractArtifact {
        name: name.into(),
        abi: Some(pokemon_abi()),
        bytecode_hex: String::new(),
        metadata: None,
    }
}

/// Scripted ledger.
///
/// The n-th submitted transaction (0-based) gets hash [`MockLedger::hash_for`]`(n)`
/// and, when it succeeds, creates [`MockLedger::contract_address_for`]`(n)`.
/// Failures are scripted per submission index.
#[derive(Debug)]
pub struct MockLedger {
    accounts: Vec<Address>,
    rejected: HashMap<usize, String>,
    reverted: HashSet<usize>,
    timed_out: HashSet<usize>,
    contract_addresses: bool,
    submitted: Mutex<Vec<TransactionRequest>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Ledger with three dev accounts where every transaction succeeds.
    pub fn new() -> Self {
        Self::with_accounts((1..=3).map(Self::account).collect())
    }

    /// Ledger exposing exactly `accounts`.
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            rejected: HashMap::new(),
            reverted: HashSet::new(),
            timed_out: HashSet::new(),
            contract_addresses: true,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// The n-th (1-based) default account.
    pub fn account(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    /// Hash given to the `index`-th submission.
    pub fn hash_for(index: usize) -> TxHash {
        TxHash::from(U256::from(index + 1))
    }

    /// Address created by the `index`-th submission.
    pub fn contract_address_for(index: usize) -> Address {
        Address::from_word(TxHash::from(U256::from(0xc0de_0000 + index)))
    }

    /// The node refuses the `index`-th submission with `message`.
    pub fn reject_at(mut self, index: usize, message: &str) -> Self {
        self.rejected.insert(index, message.to_string());
        self
    }

    /// The `index`-th submission is mined but reverts.
    pub fn revert_at(mut self, index: usize) -> Self {
        self.reverted.insert(index);
        self
    }

    /// The receipt of the `index`-th submission never arrives.
    pub fn time_out_at(mut self, index: usize) -> Self {
        self.timed_out.insert(index);
        self
    }

    /// Receipts never carry a contract address.
    pub fn without_contract_addresses(mut self) -> Self {
        self.contract_addresses = false;
        self
    }

    /// Every transaction that reached [`LedgerClient::submit`], rejected ones included.
    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().expect("lock poisoned").clone()
    }

    fn index_of(hash: TxHash) -> Option<usize> {
        usize::try_from(U256::from_be_bytes(hash.0)).ok()?.checked_sub(1)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.accounts.clone())
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, LedgerError> {
        let index = {
            let mut submitted = self.submitted.lock().expect("lock poisoned");
            submitted.push(tx);
            submitted.len() - 1
        };
        match self.rejected.get(&index) {
            Some(message) => Err(LedgerError::Rejected(message.clone())),
            None => Ok(Self::hash_for(index)),
        }
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, LedgerError> {
        let index = Self::index_of(hash)
            .ok_or_else(|| LedgerError::Transport(format!("unknown transaction {hash}")))?;
        if self.timed_out.contains(&index) {
            return Err(LedgerError::Timeout { hash, timeout });
        }

        let success = !self.reverted.contains(&index);
        Ok(Receipt {
            transaction_hash: hash,
            contract_address: (success && self.contract_addresses)
                .then(|| Self::contract_address_for(index)),
            success,
        })
    }
}

/// Compiler returning a fixed artifact set, or a fixed error.
#[derive(Debug)]
pub struct StaticCompiler {
    artifacts: Option<CompiledArtifactSet>,
    calls: AtomicUsize,
}

impl StaticCompiler {
    /// Compiler that always yields `artifacts`.
    pub fn new(artifacts: CompiledArtifactSet) -> Self {
        Self { artifacts: Some(artifacts), calls: AtomicUsize::new(0) }
    }

    /// Compiler that fails with [`CompilationError::NoContracts`] on non-empty input.
    pub fn empty() -> Self {
        Self { artifacts: None, calls: AtomicUsize::new(0) }
    }

    /// How many times [`SourceCompiler::compile`] ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceCompiler for StaticCompiler {
    fn compile(
        &self,
        sources: &NormalizedSources,
    ) -> Result<CompiledArtifactSet, CompilationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if sources.is_empty() {
            return Err(CompilationError::NoSources);
        }
        self.artifacts.clone().ok_or(CompilationError::NoContracts)
    }
}

/// Asset directory with a fixed listing per directory id.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    listings: HashMap<String, Vec<ExternalAsset>>,
}

impl StaticDirectory {
    /// Empty directory set; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `assets` for `directory`.
    pub fn with_listing(mut self, directory: &str, assets: Vec<ExternalAsset>) -> Self {
        self.listings.insert(directory.to_string(), assets);
        self
    }
}

#[async_trait]
impl AssetDirectory for StaticDirectory {
    async fn list(&self, directory: &str) -> Result<Vec<ExternalAsset>, AssetDirectoryError> {
        self.listings
            .get(directory)
            .cloned()
            .ok_or_else(|| AssetDirectoryError::Http(format!("404 Not Found: {directory}")))
    }
}
