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

//! Accounts command - list the accounts the pipeline can send from

use edp_engine::{Pipeline, PipelineConfig};
use eyre::Result;

/// Print one available account per line
pub async fn list_accounts(config: PipelineConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let accounts = pipeline.accounts().await?;

    if accounts.is_empty() {
        tracing::warn!("The node exposes no accounts");
    }
    for account in accounts {
        println!("{account}");
    }
    Ok(())
}
