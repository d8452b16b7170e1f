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

//! Deploy command - compile and deploy the first concrete contract

use std::path::PathBuf;

use alloy_primitives::Address;
use edp_engine::{Pipeline, PipelineConfig, RunContext};
use eyre::Result;

use crate::utils::load_sources;

/// Compile `files` and deploy the selected contract from `account`
pub async fn deploy(
    config: PipelineConfig,
    files: &[PathBuf],
    account: Option<Address>,
) -> Result<()> {
    let sources = load_sources(files)?;
    let pipeline = Pipeline::from_config(config)?;
    let mut ctx = RunContext::new();

    // Step 1: Compile and pick the contract before touching the node
    pipeline.compile(&mut ctx, sources).await?;
    let selected = pipeline.select(&mut ctx)?;

    // Step 2: Deploy from the resolved account
    let from = pipeline.resolve_account(account).await?;
    let deployment = pipeline.deploy(&mut ctx, from).await?;

    println!("Deployed {} at {}", selected.name, deployment.address);
    println!("Transaction: {}", deployment.transaction_hash);
    Ok(())
}
