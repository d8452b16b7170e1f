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

//! Assets command - show what a batch would mint

use edp_engine::{Pipeline, PipelineConfig};
use eyre::Result;

/// List the assets of `directory`, one per line
pub async fn list_assets(config: PipelineConfig, directory: &str) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let assets = pipeline.fetch_assets(directory).await?;

    for asset in &assets {
        println!("{}\tlevel {}\t{}", asset.name, asset.level, asset.image_uri);
    }
    tracing::info!("{} asset(s) in {}", assets.len(), directory);
    Ok(())
}
