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

//! EDP - EVM Deployment Pipeline
//!
//! Compiles Solidity sources, deploys the first concrete contract to an EVM
//! node and mints one item per asset of an IPFS directory.

use std::{path::PathBuf, time::Duration};

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use edp_common::env::{
    EDP_IPFS_API_URL, EDP_IPFS_GATEWAY_URL, EDP_PRIVATE_KEY, EDP_SOLC_VERSION, ETH_RPC_URL,
};
use edp_engine::{
    PipelineConfig, DEFAULT_ALLOW_PATH, DEFAULT_ASSET_DIRECTORY, DEFAULT_BATCH_METHOD,
    DEFAULT_IPFS_API_URL, DEFAULT_IPFS_GATEWAY_URL, DEFAULT_RPC_URL,
};
use eyre::Result;
use semver::Version;

mod cmd;
mod utils;

/// Command-line interface for EDP
#[derive(Debug, Parser)]
#[command(name = "edp")]
#[command(about = "EVM Deployment Pipeline - compile, deploy and batch-mint Solidity contracts")]
#[command(version)]
pub struct Cli {
    /// Ethereum RPC endpoint
    #[arg(long, env = ETH_RPC_URL, default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// IPFS HTTP API endpoint
    #[arg(long, env = EDP_IPFS_API_URL, default_value = DEFAULT_IPFS_API_URL)]
    pub ipfs_api_url: String,

    /// Gateway prefix for asset image links
    #[arg(long, env = EDP_IPFS_GATEWAY_URL, default_value = DEFAULT_IPFS_GATEWAY_URL)]
    pub gateway_url: String,

    /// Solidity compiler version (installed on demand)
    #[arg(long, env = EDP_SOLC_VERSION)]
    pub solc_version: Option<Version>,

    /// Use this solc binary instead of a managed installation
    #[arg(long)]
    pub solc_path: Option<PathBuf>,

    /// Directory solc may import from (repeatable)
    #[arg(long = "allow-path", default_value = DEFAULT_ALLOW_PATH)]
    pub allow_paths: Vec<PathBuf>,

    /// Seconds to wait for each transaction receipt
    #[arg(long, default_value = "120")]
    pub receipt_timeout: u64,

    /// Contract method called once per asset with (name, owner, imageUri)
    #[arg(long, default_value = DEFAULT_BATCH_METHOD)]
    pub method: String,

    /// Private key for local signing; the node signs when omitted
    #[arg(long, env = EDP_PRIVATE_KEY, hide_env_values = true)]
    pub private_key: Option<String>,

    /// Also write logs to a daily rolling file under this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the accounts available for sending
    Accounts,
    /// List the assets of an IPFS directory
    Assets {
        /// Directory CID
        #[arg(default_value = DEFAULT_ASSET_DIRECTORY)]
        directory: String,
    },
    /// Compile Solidity sources and show the contract that would be deployed
    Compile {
        /// Solidity files or directories containing them
        files: Vec<PathBuf>,
        /// Print every compiled artifact as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile and deploy the first concrete contract
    Deploy {
        /// Solidity files or directories containing them
        files: Vec<PathBuf>,
        /// Sending account (default: the first available account)
        #[arg(long)]
        account: Option<Address>,
    },
    /// Compile, deploy, then call the batch method once per asset
    Run {
        /// Solidity files or directories containing them
        files: Vec<PathBuf>,
        /// IPFS directory listing the assets
        #[arg(long, default_value = DEFAULT_ASSET_DIRECTORY)]
        directory: String,
        /// Sending account, also used as the owner of every item
        #[arg(long)]
        account: Option<Address>,
    },
}

impl Cli {
    /// Pipeline settings from the command line and environment
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .with_rpc_url(&self.rpc_url)
            .with_ipfs_api_url(&self.ipfs_api_url)
            .with_ipfs_gateway_url(&self.gateway_url)
            .with_allow_paths(self.allow_paths.iter().cloned())
            .with_receipt_timeout(Duration::from_secs(self.receipt_timeout))
            .with_batch_method(&self.method);
        if let Some(version) = &self.solc_version {
            config = config.with_solc_version(version.clone());
        }
        if let Some(path) = &self.solc_path {
            config = config.with_solc_path(path);
        }
        if let Some(key) = &self.private_key {
            config = config.with_private_key(key);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    let _guard = edp_common::logging::init_logging("edp", cli.log_dir.as_deref())?;

    let config = cli.pipeline_config();
    tracing::debug!(?config, "pipeline configuration");

    match &cli.command {
        Commands::Accounts => cmd::list_accounts(config).await,
        Commands::Assets { directory } => cmd::list_assets(config, directory).await,
        Commands::Compile { files, json } => cmd::compile(config, files, *json).await,
        Commands::Deploy { files, account } => cmd::deploy(config, files, *account).await,
        Commands::Run { files, directory, account } => {
            cmd::run(config, files, directory, *account).await
        }
    }
}
