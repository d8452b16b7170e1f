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

//! Compile command - compile sources and report the deployable contract

use std::path::PathBuf;

use edp_engine::{Pipeline, PipelineConfig, RunContext};
use eyre::Result;

use crate::utils::load_sources;

/// Compile `files`. Prints the whole artifact set with `json`, otherwise every
/// contract and the one that `deploy` would pick.
pub async fn compile(config: PipelineConfig, files: &[PathBuf], json: bool) -> Result<()> {
    let sources = load_sources(files)?;
    let pipeline = Pipeline::from_config(config)?;
    let mut ctx = RunContext::new();

    let artifacts = pipeline.compile(&mut ctx, sources).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(artifacts)?);
        return Ok(());
    }

    for (path, artifact) in artifacts.iter() {
        let kind = if artifact.is_deployable() { "concrete" } else { "no bytecode" };
        println!("{path}:{} ({kind})", artifact.name);
    }

    let selected = pipeline.select(&mut ctx)?;
    println!(
        "Selected {} from {} ({} bytes of creation code)",
        selected.name,
        selected.source_path,
        selected.bytecode_hex.len() / 2
    );
    Ok(())
}
