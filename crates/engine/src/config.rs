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

//! Pipeline configuration.

use std::{fmt, path::PathBuf, time::Duration};

use semver::Version;

/// Default JSON-RPC endpoint of the ledger node (Ganache/Anvil)
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
/// Default IPFS HTTP API endpoint
pub const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001";
/// Default gateway prefix for asset image links
pub const DEFAULT_IPFS_GATEWAY_URL: &str = "https://ipfs.io/ipfs";
/// Default asset directory listed by `edp run`
pub const DEFAULT_ASSET_DIRECTORY: &str = "QmZe4T9QfrZ2v467TbV8Y7Vw6YD6yznStxX8sRdAPGxdcK";
/// Method invoked once per asset, with `(name, owner, imageUri)`
pub const DEFAULT_BATCH_METHOD: &str = "createNewPokemon";
/// How long to wait for a transaction receipt
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);
/// Import directory solc may read from
pub const DEFAULT_ALLOW_PATH: &str = "node_modules";

/// Solidity compiler version used when none is configured
pub fn default_solc_version() -> Version {
    Version::new(0, 8, 26)
}

/// Configuration shared by every pipeline stage.
#[derive(Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// JSON-RPC endpoint of the ledger node
    pub rpc_url: String,
    /// IPFS HTTP API endpoint used to list asset directories
    pub ipfs_api_url: String,
    /// Gateway prefix the asset hash is appended to
    pub ipfs_gateway_url: String,
    /// Solidity compiler version, installed on demand
    pub solc_version: Version,
    /// Explicit solc binary; skips version lookup and installation
    pub solc_path: Option<PathBuf>,
    /// Directories solc may read imports from
    pub allow_paths: Vec<PathBuf>,
    /// Receipt wait limit for deployment and for every batch call
    pub receipt_timeout: Duration,
    /// Contract method called for each asset
    pub batch_method: String,
    /// Hex private key for local signing; node-side signing when `None`
    pub private_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            ipfs_api_url: DEFAULT_IPFS_API_URL.into(),
            ipfs_gateway_url: DEFAULT_IPFS_GATEWAY_URL.into(),
            solc_version: default_solc_version(),
            solc_path: None,
            allow_paths: vec![PathBuf::from(DEFAULT_ALLOW_PATH)],
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            batch_method: DEFAULT_BATCH_METHOD.into(),
            private_key: None,
        }
    }
}

// Keep the private key out of logs
impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("rpc_url", &self.rpc_url)
            .field("ipfs_api_url", &self.ipfs_api_url)
            .field("ipfs_gateway_url", &self.ipfs_gateway_url)
            .field("solc_version", &self.solc_version)
            .field("solc_path", &self.solc_path)
            .field("allow_paths", &self.allow_paths)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("batch_method", &self.batch_method)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Set the ledger node endpoint
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Set the IPFS HTTP API endpoint
    pub fn with_ipfs_api_url(mut self, url: impl Into<String>) -> Self {
        self.ipfs_api_url = url.into();
        self
    }

    /// Set the gateway prefix for asset image links
    pub fn with_ipfs_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.ipfs_gateway_url = url.into();
        self
    }

    /// Set the Solidity compiler version
    pub fn with_solc_version(mut self, version: Version) -> Self {
        self.solc_version = version;
        self
    }

    /// Use a specific solc binary instead of the managed installation
    pub fn with_solc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.solc_path = Some(path.into());
        self
    }

    /// Replace the directories solc may import from
    pub fn with_allow_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.allow_paths = paths.into_iter().collect();
        self
    }

    /// Set the receipt wait limit
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Set the method called for each asset
    pub fn with_batch_method(mut self, method: impl Into<String>) -> Self {
        self.batch_method = method.into();
        self
    }

    /// Sign transactions locally with the given hex private key
    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }
}
