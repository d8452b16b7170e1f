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

//! End-to-end tests of the deployment pipeline
//!
//! These tests run the real toolchain:
//! - solc, installed through svm
//! - a local Anvil node
//! - a mocked IPFS HTTP API

use alloy_node_bindings::Anvil;
use edp_engine::{Pipeline, PipelineConfig, RunContext};
use edp_integration_tests::test_utils::{init, ipfs, paths};
use tracing::info;

const CID: &str = "QmTestPokemonDirectory";

// First Anvil dev key
const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_against_anvil() {
    if !init::init_e2e_environment() {
        return;
    }
    info!("Testing the full pipeline against Anvil");

    let anvil = Anvil::new().try_spawn().expect("anvil on PATH");
    // ".png" has an empty stem; the contract rejects empty names
    let server = ipfs::mock_directory(
        CID,
        &[("pikachu.png", "QmPika"), (".png", "QmEmpty"), ("eevee.jpg", "QmEevee")],
    )
    .await;

    let config = PipelineConfig::default()
        .with_rpc_url(anvil.endpoint())
        .with_ipfs_api_url(server.uri())
        .with_allow_paths(Vec::new());
    let pipeline = Pipeline::from_config(config).expect("pipeline");
    let mut ctx = RunContext::new();

    pipeline.run(&mut ctx, paths::pokemon_sources(), None, CID).await.expect("run succeeds");

    // Paths are normalized and the interface is skipped
    let artifacts = ctx.artifacts().unwrap();
    assert!(artifacts.get("contracts/IPokemon.sol", "IPokemon").is_some());
    assert_eq!(ctx.selected().unwrap().name, "Pokemon");
    assert_eq!(ctx.selected().unwrap().source_path, "contracts/Pokemon.sol");

    let deployment = ctx.deployment().unwrap();
    info!("Deployed at {}", deployment.address);

    let results = ctx.batch_results();
    assert_eq!(
        results.iter().map(|r| (r.asset_name.as_str(), r.success)).collect::<Vec<_>>(),
        [("pikachu", true), ("", false), ("eevee", true)]
    );
    assert!(results[1].transaction_hash.is_some() || results[1].error.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deploy_with_local_signer() {
    if !init::init_e2e_environment() {
        return;
    }
    info!("Testing deployment signed with a local key");

    let anvil = Anvil::new().try_spawn().expect("anvil on PATH");
    let config = PipelineConfig::default()
        .with_rpc_url(anvil.endpoint())
        .with_allow_paths(Vec::new())
        .with_private_key(ANVIL_KEY_0);
    let pipeline = Pipeline::from_config(config).expect("pipeline");

    let accounts = pipeline.accounts().await.unwrap();
    assert_eq!(accounts, vec![anvil.addresses()[0]]);

    let mut ctx = RunContext::new();
    pipeline.compile(&mut ctx, paths::pokemon_sources()).await.unwrap();
    let from = pipeline.resolve_account(None).await.unwrap();
    let deployment = pipeline.deploy(&mut ctx, from).await.unwrap();

    assert_eq!(ctx.deployment(), Some(&deployment));
    assert!(pipeline.deploy(&mut ctx, from).await.is_err());
}
