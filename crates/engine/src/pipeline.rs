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

//! The deployment pipeline.
//!
//! # Workflow Overview
//!
//! 1. **Normalize**: decode the uploaded files and normalize their paths
//! 2. **Compile**: run solc over the normalized sources
//! 3. **Select**: pick the first concrete contract
//! 4. **Account**: choose the sending account among the node's accounts
//! 5. **Deploy**: create the contract and wait for its receipt
//! 6. **Assets**: list the external assets to mint
//! 7. **Batch**: call the batch method once per asset, in order
//!
//! Every stage reads and writes a [`RunContext`] passed in by the caller.
//! Stages run strictly one after the other; a fatal error stops the run and
//! names the stage, while per-asset failures are recorded in the context.

use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::{
    normalize_sources, AccountError, AlloyLedger, AssetDirectory, BatchCallSubmitter, CallResult,
    CompilationError, CompiledArtifactSet, Deployer, DeploymentResult, ExternalAsset,
    IpfsDirectory, LedgerClient, LedgerError, PipelineConfig, PipelineError, RunContext,
    SelectedContract, SolcCompiler, SourceCompiler, Stage,
};

/// Drives the pipeline stages against a compiler, a ledger and an asset directory.
pub struct Pipeline {
    config: PipelineConfig,
    compiler: Arc<dyn SourceCompiler>,
    ledger: Arc<dyn LedgerClient>,
    directory: Arc<dyn AssetDirectory>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline from its parts.
    pub fn new(
        config: PipelineConfig,
        compiler: Arc<dyn SourceCompiler>,
        ledger: Arc<dyn LedgerClient>,
        directory: Arc<dyn AssetDirectory>,
    ) -> Self {
        Self { config, compiler, ledger, directory }
    }

    /// Pipeline using solc, a JSON-RPC node and the IPFS HTTP API as configured.
    ///
    /// Does not contact the node or IPFS yet.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let compiler = SolcCompiler::from_config(&config);
        let ledger = AlloyLedger::connect(&config.rpc_url, config.private_key.as_deref())
            .map_err(|e| match e {
                // A bad key is a bad sending account
                LedgerError::InvalidSigner(_) => PipelineError::from(AccountError::from(e)),
                e => PipelineError::Setup(e),
            })?;
        let directory = IpfsDirectory::new(&config.ipfs_api_url, &config.ipfs_gateway_url);

        Ok(Self::new(config, Arc::new(compiler), Arc::new(ledger), Arc::new(directory)))
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Accounts available for sending.
    pub async fn accounts(&self) -> Result<Vec<Address>, PipelineError> {
        Ok(self.ledger.accounts().await.map_err(AccountError::from)?)
    }

    /// Pick the sending account.
    ///
    /// An explicit account must be one of the available accounts. Without one,
    /// the first available account is used.
    pub async fn resolve_account(
        &self,
        requested: Option<Address>,
    ) -> Result<Address, PipelineError> {
        let accounts = self.accounts().await?;
        let account = match requested {
            Some(account) if accounts.contains(&account) => account,
            Some(account) => return Err(AccountError::Unavailable(account).into()),
            None => *accounts.first().ok_or(AccountError::NoAccounts)?,
        };
        info!(%account, "using account");
        Ok(account)
    }

    /// Normalize and compile `files`, storing the artifacts in `ctx`.
    pub async fn compile<'a, I, P, B>(
        &self,
        ctx: &'a mut RunContext,
        files: I,
    ) -> Result<&'a CompiledArtifactSet, PipelineError>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        let sources = normalize_sources(files)?;
        if sources.is_empty() {
            return Err(CompilationError::NoSources.into());
        }
        info!(files = sources.len(), "compiling sources");

        let compiler = Arc::clone(&self.compiler);
        let artifacts = tokio::task::spawn_blocking(move || compiler.compile(&sources))
            .await
            .map_err(|e| CompilationError::Task(e.to_string()))??;

        Ok(ctx.record_compilation(artifacts))
    }

    /// Select the contract to deploy among the compiled artifacts.
    pub fn select(&self, ctx: &mut RunContext) -> Result<SelectedContract, PipelineError> {
        let artifacts = ctx
            .artifacts()
            .ok_or(PipelineError::MissingStage { stage: Stage::Select, requires: Stage::Compile })?;

        let selected = artifacts.select_deployable()?;
        ctx.record_selection(selected.clone());
        Ok(selected)
    }

    /// Deploy the selected contract from `from`.
    ///
    /// Selects first if that has not happened yet. A context deploys at most
    /// once; a second call fails without submitting anything.
    pub async fn deploy(
        &self,
        ctx: &mut RunContext,
        from: Address,
    ) -> Result<DeploymentResult, PipelineError> {
        ctx.ensure_not_deployed()?;
        let selected = match ctx.selected().cloned() {
            Some(selected) => selected,
            None => self.select(ctx)?,
        };

        let deployer = Deployer::new(Arc::clone(&self.ledger), self.config.receipt_timeout);
        let deployment = deployer.deploy(&selected, from).await?;
        ctx.record_deployment(deployment, selected.abi)?;
        Ok(deployment)
    }

    /// List the assets of `directory`.
    pub async fn fetch_assets(&self, directory: &str) -> Result<Vec<ExternalAsset>, PipelineError> {
        Ok(self.directory.list(directory).await?)
    }

    /// Call the batch method for every asset against the deployed contract.
    ///
    /// Item failures do not fail the stage; they are part of the returned
    /// results, which are also appended to `ctx`.
    pub async fn submit_batch(
        &self,
        ctx: &mut RunContext,
        from: Address,
        assets: &[ExternalAsset],
    ) -> Result<Vec<CallResult>, PipelineError> {
        let contract = ctx
            .contract_handle()
            .ok_or(PipelineError::MissingStage { stage: Stage::Batch, requires: Stage::Deploy })?;

        let submitter = BatchCallSubmitter::new(
            Arc::clone(&self.ledger),
            &self.config.batch_method,
            self.config.receipt_timeout,
        );
        let results = submitter.submit(&contract, assets, from).await;
        ctx.record_batch(results.iter().cloned());
        Ok(results)
    }

    /// Run every stage: compile `files`, deploy from `account` (or the first
    /// available one), then mint one item per asset of `directory`.
    ///
    /// On failure `ctx` still holds whatever earlier stages produced, e.g. the
    /// deployment when only the asset listing failed.
    pub async fn run<I, P, B>(
        &self,
        ctx: &mut RunContext,
        files: I,
        account: Option<Address>,
        directory: &str,
    ) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        info!("Compiling sources");
        self.compile(ctx, files).await?;

        info!("Selecting contract");
        self.select(ctx)?;

        info!("Resolving sending account");
        let from = self.resolve_account(account).await?;

        info!("Deploying contract");
        let deployment = self.deploy(ctx, from).await?;
        info!(address = %deployment.address, tx = %deployment.transaction_hash, "Deployment confirmed");

        info!(directory, "Fetching assets");
        let assets = self.fetch_assets(directory).await?;

        info!(count = assets.len(), "Submitting batch");
        let results = self.submit_batch(ctx, from, &assets).await?;

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "some batch items failed");
        }
        Ok(())
    }
}
