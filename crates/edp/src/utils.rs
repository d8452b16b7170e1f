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

//! Utility functions for the EDP binary

use std::{
    fs,
    path::{Path, PathBuf},
};

use edp_engine::CallResult;
use eyre::{Result, WrapErr};
use tracing::{debug, warn};

/// Read the Solidity files named on the command line.
///
/// Directories are searched recursively. Only `.sol` files are kept; any other
/// file named explicitly is skipped with a warning. Returns `(path, bytes)`
/// pairs in the order given, directory entries sorted by path.
pub fn load_sources(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_solidity_files(path, &mut files)?;
        } else if is_solidity_file(path) {
            files.push(path.clone());
        } else {
            warn!("Skipping {}: not a .sol file", path.display());
        }
    }

    files
        .into_iter()
        .map(|path| {
            let bytes =
                fs::read(&path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
            debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
            Ok((path.to_string_lossy().into_owned(), bytes))
        })
        .collect()
}

fn collect_solidity_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .wrap_err_with(|| format!("failed to read directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_solidity_files(&path, files)?;
        } else if is_solidity_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_solidity_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "sol")
}

/// One line of the batch report
pub fn format_call_result(index: usize, result: &CallResult) -> String {
    let hash = result.transaction_hash.map(|h| format!(" {h}")).unwrap_or_default();
    match (&result.error, result.success) {
        (_, true) => format!("[{index}] ok     {}{hash}", result.asset_name),
        (Some(error), false) => format!("[{index}] failed {}{hash}: {error}", result.asset_name),
        (None, false) => format!("[{index}] failed {}{hash}", result.asset_name),
    }
}
