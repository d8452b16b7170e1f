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

//! Test utilities for integration tests

use std::path::PathBuf;

/// Path utilities for test resources
pub mod paths {
    use super::*;

    /// Workspace `testdata/` directory
    pub fn testdata_dir() -> PathBuf {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest_dir
            .parent() // crates/
            .and_then(|p| p.parent()) // workspace root
            .expect("Failed to find workspace root")
            .join("testdata")
    }

    /// The Pokemon fixture sources as `(path, bytes)` pairs, keyed the way a
    /// user would name them on the command line
    pub fn pokemon_sources() -> Vec<(String, Vec<u8>)> {
        ["IPokemon.sol", "Pokemon.sol"]
            .iter()
            .map(|name| {
                let path = testdata_dir().join("contracts").join(name);
                let bytes = std::fs::read(&path).expect("fixture exists");
                (format!("./contracts/{name}"), bytes)
            })
            .collect()
    }
}

/// Initialization utilities for tests
pub mod init {
    /// Initialize logging and report whether the end-to-end tests are enabled.
    ///
    /// They need an `anvil` binary on the PATH and network access to install
    /// solc, so they only run with `EDP_TEST_E2E=1`.
    pub fn init_e2e_environment() -> bool {
        edp_common::logging::ensure_test_logging(None);
        let enabled = std::env::var(edp_common::env::EDP_TEST_E2E)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if !enabled {
            tracing::warn!("Skipping end-to-end test, set EDP_TEST_E2E=1 to run it");
        }
        enabled
    }
}

/// IPFS API stand-in serving a single directory listing
pub mod ipfs {
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    /// Start a server that lists `files` as `(name, hash)` links of `cid`
    pub async fn mock_directory(cid: &str, files: &[(&str, &str)]) -> MockServer {
        let server = MockServer::start().await;
        let links: Vec<_> = files
            .iter()
            .map(|(name, hash)| json!({ "Name": name, "Hash": hash, "Size": 1024, "Type": 2 }))
            .collect();

        Mock::given(method("POST"))
            .and(path("/api/v0/ls"))
            .and(query_param("arg", cid))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "Objects": [{ "Hash": cid, "Links": links }] })),
            )
            .mount(&server)
            .await;
        server
    }
}
