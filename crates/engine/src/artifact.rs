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

//! Compiled artifacts and deployable contract selection.

use std::{collections::BTreeMap, fmt};

use alloy_json_abi::JsonAbi;
use alloy_primitives::hex;
use foundry_compilers::artifacts::{BytecodeObject, CompilerOutput, Contract};
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use tracing::{debug, info};

use crate::NoDeployableContractError;

/// Compiler output for one declared contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
    /// Contract name as declared in the source; serialized as the map key
    #[serde(skip)]
    pub name: String,
    /// Interface description, absent when not emitted
    pub abi: Option<JsonAbi>,
    /// Creation bytecode as a hex string without `0x`; empty for interfaces
    /// and abstract contracts, and may contain unlinked library placeholders
    #[serde(rename = "bytecode")]
    pub bytecode_hex: String,
    /// Compiler metadata JSON
    pub metadata: Option<serde_json::Value>,
}

impl ContractArtifact {
    /// Convert a solc contract entry.
    pub fn from_solc(name: &str, contract: &Contract) -> Self {
        let bytecode_hex = contract
            .evm
            .as_ref()
            .and_then(|evm| evm.bytecode.as_ref())
            .map(|bytecode| match &bytecode.object {
                BytecodeObject::Bytecode(bytes) => hex::encode(bytes),
                BytecodeObject::Unlinked(raw) => raw.trim_start_matches("0x").to_string(),
            })
            .unwrap_or_default();

        // solc ships metadata as a JSON document encoded in a string
        let metadata = contract.metadata.as_ref().and_then(|m| serde_json::to_value(m).ok()).map(
            |value| match value {
                serde_json::Value::String(raw) => {
                    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
                }
                other => other,
            },
        );

        Self { name: name.to_string(), abi: contract.abi.clone(), bytecode_hex, metadata }
    }

    /// Whether this artifact can be deployed: it has an ABI and non-empty bytecode.
    pub fn is_deployable(&self) -> bool {
        self.abi.is_some() && !self.bytecode_hex.is_empty()
    }
}

/// All artifacts of one compilation: file path to contracts in reported order.
///
/// File paths iterate in sorted order; contracts within a file keep the order
/// in which they were inserted, i.e. the order the compiler reported them.
/// Serializes as `{path: {name: {abi, bytecode, metadata}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompiledArtifactSet {
    files: BTreeMap<String, FileArtifacts>,
}

/// Contracts of one source file, keyed by name on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
struct FileArtifacts(Vec<ContractArtifact>);

impl Serialize for FileArtifacts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|artifact| (&artifact.name, artifact)))
    }
}

impl<'de> Deserialize<'de> for FileArtifacts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FileVisitor;

        impl<'de> Visitor<'de> for FileVisitor {
            type Value = FileArtifacts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from contract name to artifact")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut artifacts = Vec::with_capacity(map.size_hint().unwrap_or_default());
                while let Some((name, mut artifact)) = map.next_entry::<String, ContractArtifact>()?
                {
                    artifact.name = name;
                    artifacts.push(artifact);
                }
                Ok(FileArtifacts(artifacts))
            }
        }

        deserializer.deserialize_map(FileVisitor)
    }
}

impl CompiledArtifactSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an artifact to `path`.
    pub fn insert(&mut self, path: impl Into<String>, artifact: ContractArtifact) {
        self.files.entry(path.into()).or_default().0.push(artifact);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<String>, artifact: ContractArtifact) -> Self {
        self.insert(path, artifact);
        self
    }

    /// Total number of contracts.
    pub fn len(&self) -> usize {
        self.files.values().map(|file| file.0.len()).sum()
    }

    /// Whether no contract was produced.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source paths that produced contracts.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Look up a contract by file and name.
    pub fn get(&self, path: &str, name: &str) -> Option<&ContractArtifact> {
        self.files.get(path)?.0.iter().find(|artifact| artifact.name == name)
    }

    /// Every artifact with its file path, in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContractArtifact)> {
        self.files
            .iter()
            .flat_map(|(path, file)| file.0.iter().map(move |a| (path.as_str(), a)))
    }

    /// Pick the artifact to deploy.
    ///
    /// Returns the **first** deployable artifact in file order, then reported
    /// order within the file. Interfaces and abstract contracts have empty
    /// bytecode and are skipped, even when they come first. The order is part
    /// of the contract of this function: it must not be replaced by a "best
    /// match" heuristic.
    pub fn select_deployable(&self) -> Result<SelectedContract, NoDeployableContractError> {
        for (path, artifact) in self.iter() {
            if artifact.bytecode_hex.is_empty() {
                debug!(contract = %artifact.name, path, "skipping contract without bytecode");
                continue;
            }
            let Some(abi) = &artifact.abi else {
                debug!(contract = %artifact.name, path, "skipping contract without ABI");
                continue;
            };

            info!(
                contract = %artifact.name,
                path,
                bytecode_len = artifact.bytecode_hex.len(),
                "selected contract for deployment"
            );
            return Ok(SelectedContract {
                name: artifact.name.clone(),
                source_path: path.to_string(),
                abi: abi.clone(),
                bytecode_hex: artifact.bytecode_hex.clone(),
            });
        }

        Err(NoDeployableContractError { inspected: self.len() })
    }
}

impl From<&CompilerOutput> for CompiledArtifactSet {
    fn from(output: &CompilerOutput) -> Self {
        let mut set = Self::new();
        for (path, contracts) in &output.contracts {
            let path = path.to_string_lossy().replace('\\', "/");
            for (name, contract) in contracts {
                set.insert(path.clone(), ContractArtifact::from_solc(name, contract));
            }
        }
        set
    }
}

/// The artifact chosen for deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedContract {
    /// Contract name
    pub name: String,
    /// Source unit that declares it
    pub source_path: String,
    /// Interface description
    pub abi: JsonAbi,
    /// Non-empty creation bytecode, hex without `0x`
    pub bytecode_hex: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{concrete_artifact, interface_artifact};

    #[test]
    fn test_selects_concrete_contract_over_interface() {
        let set = CompiledArtifactSet::new()
            .with("contracts/IPokemon.sol", interface_artifact("IPokemon"))
            .with("contracts/Pokemon.sol", concrete_artifact("Pokemon", "60806040aabb"));

        let selected = set.select_deployable().unwrap();
        assert_eq!(selected.name, "Pokemon");
        assert_eq!(selected.source_path, "contracts/Pokemon.sol");
        assert_eq!(selected.bytecode_hex, "60806040aabb");
    }

    #[test]
    fn test_first_deployable_wins_not_the_largest() {
        let set = CompiledArtifactSet::new()
            .with("b/Second.sol", concrete_artifact("Huge", &"60".repeat(512)))
            .with("a/First.sol", interface_artifact("IFirst"))
            .with("a/First.sol", concrete_artifact("Small", "6080"));

        // "a/First.sol" sorts before "b/Second.sol"; within the file the
        // interface comes first but has no bytecode
        let selected = set.select_deployable().unwrap();
        assert_eq!(selected.name, "Small");
    }

    #[test]
    fn test_declaration_order_within_file_is_kept() {
        let set = CompiledArtifactSet::new()
            .with("Pokemon.sol", concrete_artifact("Zeta", "6080"))
            .with("Pokemon.sol", concrete_artifact("Alpha", "6081"));

        assert_eq!(set.select_deployable().unwrap().name, "Zeta");
    }

    #[test]
    fn test_artifact_without_abi_is_skipped() {
        let mut no_abi = concrete_artifact("NoAbi", "6080");
        no_abi.abi = None;
        let set = CompiledArtifactSet::new()
            .with("A.sol", no_abi)
            .with("B.sol", concrete_artifact("WithAbi", "6081"));

        assert_eq!(set.select_deployable().unwrap().name, "WithAbi");
    }

    #[test]
    fn test_no_deployable_contract() {
        let set = CompiledArtifactSet::new()
            .with("IPokemon.sol", interface_artifact("IPokemon"))
            .with("Base.sol", interface_artifact("AbstractBase"));

        let err = set.select_deployable().unwrap_err();
        assert_eq!(err.inspected, 2);

        let err = CompiledArtifactSet::new().select_deployable().unwrap_err();
        assert_eq!(err.inspected, 0);
    }

    #[test]
    fn test_json_is_keyed_by_path_then_name() {
        let set = CompiledArtifactSet::new()
            .with("contracts/Pokemon.sol", concrete_artifact("Zeta", "6080"))
            .with("contracts/Pokemon.sol", concrete_artifact("Alpha", "6081"));

        let json = serde_json::to_value(&set).unwrap();
        let file = &json["contracts/Pokemon.sol"];
        assert_eq!(file["Zeta"]["bytecode"], "6080");
        assert_eq!(file["Alpha"]["bytecode"], "6081");
        assert!(file["Zeta"]["abi"].is_array());
        assert!(file["Zeta"].get("name").is_none());

        // Declaration order survives the text form
        let text = serde_json::to_string(&set).unwrap();
        assert!(text.find("\"Zeta\"").unwrap() < text.find("\"Alpha\"").unwrap());
        let parsed: CompiledArtifactSet = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, set);
        assert_eq!(parsed.select_deployable().unwrap().name, "Zeta");
    }

    #[test]
    fn test_from_solc_output() {
        // Trimmed standard JSON output of a two-file compilation
        let output: CompilerOutput = serde_json::from_value(serde_json::json!({
            "contracts": {
                "contracts/IPokemon.sol": {
                    "IPokemon": {
                        "abi": [],
                        "evm": { "bytecode": { "object": "", "linkReferences": {} } }
                    }
                },
                "contracts/Pokemon.sol": {
                    "Pokemon": {
                        "abi": [{
                            "type": "function",
                            "name": "createNewPokemon",
                            "inputs": [
                                { "name": "name", "type": "string", "internalType": "string" },
                                { "name": "owner", "type": "address", "internalType": "address" },
                                { "name": "img", "type": "string", "internalType": "string" }
                            ],
                            "outputs": [],
                            "stateMutability": "nonpayable"
                        }],
                        "evm": { "bytecode": { "object": "6080604052", "linkReferences": {} } }
                    }
                }
            },
            "sources": {}
        }))
        .unwrap();

        let set = CompiledArtifactSet::from(&output);
        assert_eq!(set.len(), 2);
        assert_eq!(set.files().collect::<Vec<_>>(), ["contracts/IPokemon.sol", "contracts/Pokemon.sol"]);

        let interface = set.get("contracts/IPokemon.sol", "IPokemon").unwrap();
        assert!(interface.bytecode_hex.is_empty());
        assert!(!interface.is_deployable());

        let selected = set.select_deployable().unwrap();
        assert_eq!(selected.name, "Pokemon");
        assert_eq!(selected.bytecode_hex, "6080604052");
        assert!(selected.abi.function("createNewPokemon").is_some());
    }
}
