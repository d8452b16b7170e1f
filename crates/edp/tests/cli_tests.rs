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

use assert_cmd::Command;
use predicates::prelude::*;
use tracing::info;

fn edp() -> Command {
    let mut cmd = Command::cargo_bin("edp").unwrap();
    // Keep the developer's environment out of the tests
    for var in ["ETH_RPC_URL", "EDP_IPFS_API_URL", "EDP_SOLC_VERSION", "EDP_PRIVATE_KEY"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_command() {
    edp_common::logging::ensure_test_logging(None);
    info!("Testing CLI help command");

    edp().arg("--help").assert().success().stdout(predicate::str::contains("EVM Deployment Pipeline"));
}

#[test]
fn test_version_command() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    edp().arg("--version").assert().success().stdout(predicate::str::contains("edp"));
}

#[test]
fn test_run_subcommand_help() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    edp()
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("call the batch method once per asset"))
        .stdout(predicate::str::contains("--directory"));
}

#[test]
fn test_missing_subcommand() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    edp().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_invalid_account() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    edp().args(["deploy", "Pokemon.sol", "--account", "not_an_address"]).assert().failure();
}

#[test]
fn test_compile_without_sources_fails_in_compile_stage() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    edp()
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("compile stage failed: no source files to compile"));
}

#[test]
fn test_non_solidity_files_are_skipped() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not solidity").unwrap();

    edp()
        .arg("compile")
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a .sol file"))
        .stderr(predicate::str::contains("compile stage failed"));
}

#[test]
fn test_invalid_utf8_fails_in_normalize_stage() {
    edp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Broken.sol");
    std::fs::write(&source, [0xff, 0xfe, 0x00]).unwrap();

    edp()
        .arg("compile")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("normalize stage failed"))
        .stderr(predicate::str::contains("not valid UTF-8"));
}
