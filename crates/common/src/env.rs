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

//! Environment variable name constants for EDP configuration.
//!
//! Every variable listed here has a matching command line flag on the `edp`
//! binary; the flag takes precedence when both are given. Variables can also
//! be placed in a `.env` file in the working directory.
//!
//! # Environment Variables
//!
//! ## Runtime Configuration
//! - [`ETH_RPC_URL`] - JSON-RPC endpoint of the ledger node
//! - [`EDP_IPFS_API_URL`] - IPFS HTTP API used to list asset directories
//! - [`EDP_IPFS_GATEWAY_URL`] - Gateway prefix for asset image links
//! - [`EDP_SOLC_VERSION`] - Solidity compiler version to install or reuse
//! - [`EDP_PRIVATE_KEY`] - Optional key for local transaction signing
//!
//! ## Testing Configuration
//! - [`EDP_TEST_E2E`] - Opt-in switch for the Anvil end-to-end tests

/// JSON-RPC endpoint of the ledger node.
///
/// Shares its name with the variable used by Foundry tooling so an existing
/// shell setup keeps working.
///
/// # Default
///
/// `http://127.0.0.1:8545`, the address Ganache and Anvil listen on.
pub const ETH_RPC_URL: &str = "ETH_RPC_URL";

/// Base URL of the IPFS HTTP API (the daemon's `/api/v0` endpoints).
///
/// # Default
///
/// `http://127.0.0.1:5001`.
pub const EDP_IPFS_API_URL: &str = "EDP_IPFS_API_URL";

/// Gateway prefix used to build the image URI of each listed asset.
///
/// The asset's content hash is appended as the last path segment.
///
/// # Default
///
/// `https://ipfs.io/ipfs`.
pub const EDP_IPFS_GATEWAY_URL: &str = "EDP_IPFS_GATEWAY_URL";

/// Solidity compiler version, e.g. `0.8.26`.
///
/// The version is installed through `svm` on first use when it is not
/// already available locally.
pub const EDP_SOLC_VERSION: &str = "EDP_SOLC_VERSION";

/// Hex encoded private key used to sign transactions locally.
///
/// When unset, transactions are sent with `eth_sendTransaction` and signed
/// by the node, which only works for accounts the node has unlocked.
///
/// # Warning
///
/// Prefer a `.env` file over exporting the key in an interactive shell.
pub const EDP_PRIVATE_KEY: &str = "EDP_PRIVATE_KEY";

/// Opt-in switch for tests that need a local Anvil binary and network
/// access to install solc.
///
/// # Values
///
/// - `"1"` or `"true"` - run the end-to-end tests
/// - Any other value or unset - skip them
///
/// # Examples
///
/// ```bash
/// EDP_TEST_E2E=1 cargo test -p edp-integration-tests
/// ```
pub const EDP_TEST_E2E: &str = "EDP_TEST_E2E";
