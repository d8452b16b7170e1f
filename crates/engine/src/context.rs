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

//! Per-run state.

use alloy_json_abi::JsonAbi;
use serde::{Deserialize, Serialize};

use crate::{
    CallResult, CompiledArtifactSet, ContractHandle, DeploymentError, DeploymentResult,
    SelectedContract,
};

/// Everything a pipeline run produced so far.
///
/// Stages fill the context in order and it is handed from one stage to the
/// next; nothing is kept in globals. Once set, the deployment is never
/// replaced, so every read returns the same address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    artifacts: Option<CompiledArtifactSet>,
    selected: Option<SelectedContract>,
    deployment: Option<DeploymentResult>,
    /// Interface of the deployed contract, fixed at deployment time
    deployed_abi: Option<JsonAbi>,
    batch_results: Vec<CallResult>,
}

impl RunContext {
    /// Fresh, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts of the last successful compilation
    pub fn artifacts(&self) -> Option<&CompiledArtifactSet> {
        self.artifacts.as_ref()
    }

    /// Contract picked for deployment
    pub fn selected(&self) -> Option<&SelectedContract> {
        self.selected.as_ref()
    }

    /// Deployment of this run
    pub fn deployment(&self) -> Option<&DeploymentResult> {
        self.deployment.as_ref()
    }

    /// Results of every batch item submitted in this run, in submission order
    pub fn batch_results(&self) -> &[CallResult] {
        &self.batch_results
    }

    /// Handle to the deployed contract, if there is one.
    pub fn contract_handle(&self) -> Option<ContractHandle> {
        let deployment = self.deployment.as_ref()?;
        let abi = self.deployed_abi.clone()?;
        Some(ContractHandle { address: deployment.address, abi })
    }

    /// Fails if this context already holds a deployment.
    pub fn ensure_not_deployed(&self) -> Result<(), DeploymentError> {
        match &self.deployment {
            Some(existing) => Err(DeploymentError::AlreadyDeployed(existing.address)),
            None => Ok(()),
        }
    }

    /// Store new artifacts, dropping the previous selection.
    pub(crate) fn record_compilation(
        &mut self,
        artifacts: CompiledArtifactSet,
    ) -> &CompiledArtifactSet {
        self.selected = None;
        self.artifacts.insert(artifacts)
    }

    pub(crate) fn record_selection(&mut self, selected: SelectedContract) {
        self.selected = Some(selected);
    }

    /// Store the deployment of `abi`. Fails if this context already has one.
    pub(crate) fn record_deployment(
        &mut self,
        deployment: DeploymentResult,
        abi: JsonAbi,
    ) -> Result<(), DeploymentError> {
        self.ensure_not_deployed()?;
        self.deployment = Some(deployment);
        self.deployed_abi = Some(abi);
        Ok(())
    }

    pub(crate) fn record_batch(&mut self, results: impl IntoIterator<Item = CallResult>) {
        self.batch_results.extend(results);
    }
}
