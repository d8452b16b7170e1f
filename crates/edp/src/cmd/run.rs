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

//! Run command - the whole pipeline, from sources to minted items

use std::path::PathBuf;

use alloy_primitives::Address;
use edp_engine::{Pipeline, PipelineConfig, RunContext};
use eyre::Result;

use crate::utils::{format_call_result, load_sources};

/// Compile, deploy and mint one item per asset of `directory`.
///
/// Failed items are reported but do not make the command fail.
pub async fn run(
    config: PipelineConfig,
    files: &[PathBuf],
    directory: &str,
    account: Option<Address>,
) -> Result<()> {
    let sources = load_sources(files)?;
    let pipeline = Pipeline::from_config(config)?;
    let mut ctx = RunContext::new();

    let outcome = pipeline.run(&mut ctx, sources, account, directory).await;

    // Whatever happened, report the deployment if there was one
    if let Some(deployment) = ctx.deployment() {
        println!("Contract: {}", deployment.address);
        println!("Deployment transaction: {}", deployment.transaction_hash);
    }
    outcome?;

    let results = ctx.batch_results();
    for (index, result) in results.iter().enumerate() {
        println!("{}", format_call_result(index, result));
    }
    let succeeded = results.iter().filter(|r| r.success).count();
    println!("{succeeded}/{} call(s) succeeded", results.len());
    Ok(())
}
