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

//! Contract compilation
//!
//! This module runs solc in standard JSON mode over the normalized sources and
//! turns its output into a [`CompiledArtifactSet`].

use std::{collections::BTreeMap, path::PathBuf};

use foundry_compilers::{
    artifacts::{output_selection::OutputSelection, CompilerOutput, Settings, SolcInput, Source, Sources},
    solc::{Solc, SolcLanguage},
};
use semver::Version;
use tracing::{debug, info, warn};

use crate::{CompilationError, CompiledArtifactSet, NormalizedSources, PipelineConfig};

/// Outputs requested for every contract of every file
pub const OUTPUT_SELECTION: [&str; 3] = ["abi", "evm.bytecode", "metadata"];

/// A compiler toolchain.
///
/// Implementations are synchronous; the pipeline runs them on a blocking thread.
pub trait SourceCompiler: Send + Sync {
    /// Compile `sources` into artifacts.
    fn compile(&self, sources: &NormalizedSources) -> Result<CompiledArtifactSet, CompilationError>;
}

/// solc, resolved lazily on first compilation.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    version: Version,
    solc_path: Option<PathBuf>,
    allow_paths: Vec<PathBuf>,
}

impl SolcCompiler {
    /// Compiler for the given solc version, installed through svm when missing.
    pub fn new(version: Version) -> Self {
        Self { version, solc_path: None, allow_paths: Vec::new() }
    }

    /// Compiler configured from the pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let compiler = Self::new(config.solc_version.clone())
            .with_allow_paths(config.allow_paths.iter().cloned());
        match &config.solc_path {
            Some(path) => compiler.with_solc_path(path),
            None => compiler,
        }
    }

    /// Use this solc binary instead of the svm managed one.
    pub fn with_solc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.solc_path = Some(path.into());
        self
    }

    /// Directories solc may read imports from.
    pub fn with_allow_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.allow_paths.extend(paths);
        self
    }

    /// Configured solc version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    fn resolve(&self) -> Result<Solc, CompilationError> {
        let mut solc = match &self.solc_path {
            Some(path) => Solc::new(path).map_err(|e| {
                CompilationError::Toolchain(format!("cannot use solc at {}: {e}", path.display()))
            })?,
            None => Solc::find_or_install(&self.version).map_err(|e| {
                CompilationError::Toolchain(format!("cannot install solc {}: {e}", self.version))
            })?,
        };
        solc.allow_paths.extend(self.allow_paths.iter().cloned());
        debug!(solc = %solc.solc.display(), version = %solc.version, "resolved compiler");
        Ok(solc)
    }
}

impl SourceCompiler for SolcCompiler {
    fn compile(&self, sources: &NormalizedSources) -> Result<CompiledArtifactSet, CompilationError> {
        if sources.is_empty() {
            return Err(CompilationError::NoSources);
        }

        let solc = self.resolve()?;
        info!(version = %solc.version, files = sources.len(), "compiling sources");

        let input = standard_json_input(sources);
        let output = solc
            .compile_exact(&input)
            .map_err(|e| CompilationError::Toolchain(format!("solc invocation failed: {e}")))?;

        check_diagnostics(&output, sources)?;

        let artifacts = CompiledArtifactSet::from(&output);
        if artifacts.is_empty() {
            return Err(CompilationError::NoContracts);
        }

        info!(contracts = artifacts.len(), "compilation finished");
        Ok(artifacts)
    }
}

/// The fixed output selection: ABI, bytecode and metadata for everything.
pub fn deployment_output_selection() -> OutputSelection {
    let per_contract =
        BTreeMap::from([("*".to_string(), OUTPUT_SELECTION.iter().map(|s| s.to_string()).collect())]);
    OutputSelection(BTreeMap::from([("*".to_string(), per_contract)]))
}

/// Build the standard JSON input for `sources`.
pub fn standard_json_input(sources: &NormalizedSources) -> SolcInput {
    let sources: Sources = sources
        .iter()
        .map(|(path, content)| (PathBuf::from(path), Source::new(content.clone())))
        .collect();

    let mut settings = Settings::default();
    settings.output_selection = deployment_output_selection();
    // Let solc pick the default EVM version of the release in use
    settings.evm_version = None;

    SolcInput::new(SolcLanguage::Solidity, sources, settings)
}

/// Log warnings and fail on any error-severity diagnostic.
fn check_diagnostics(
    output: &CompilerOutput,
    sources: &NormalizedSources,
) -> Result<(), CompilationError> {
    for warning in output.errors.iter().filter(|e| !e.is_error()) {
        warn!(code = ?warning.error_code, "{}", warning.message);
    }

    if output.errors.iter().any(|e| e.is_error()) {
        return Err(CompilationError::Diagnostics(format_compiler_errors(&output.errors, sources)));
    }
    Ok(())
}

/// Format compiler errors with their source location and a code excerpt.
pub fn format_compiler_errors(
    errors: &[foundry_compilers::artifacts::Error],
    sources: &NormalizedSources,
) -> String {
    let mut formatted = String::new();

    for error in errors.iter().filter(|e| e.is_error()) {
        formatted.push_str("\n\n");

        if let Some(error_code) = &error.error_code {
            formatted.push_str(&format!("Error [{error_code}]: "));
        } else {
            formatted.push_str("Error: ");
        }
        formatted.push_str(&error.message);

        if let Some(loc) = &error.source_location {
            formatted.push_str(&format!("\n  --> {}:{}:{}", loc.file, loc.start, loc.end));

            if let Some(context) = sources
                .get(loc.file.as_str())
                .and_then(|content| extract_code_context(content, loc.start, loc.end))
            {
                formatted.push('\n');
                formatted.push_str(&context);
            }
        }
    }

    if formatted.is_empty() {
        formatted.push_str("\nNo specific error details available");
    }

    formatted
}

/// The source line(s) spanning the byte range `start..end`, with line numbers.
fn extract_code_context(content: &str, start: i32, end: i32) -> Option<String> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?.max(start);
    if start > content.len() {
        return None;
    }

    let mut context = String::new();
    let mut offset = 0;
    for (index, line) in content.lines().enumerate() {
        let line_end = offset + line.len();
        if line_end >= start && offset <= end {
            context.push_str(&format!("  {} | {line}\n", index + 1));
        }
        if offset > end {
            break;
        }
        offset = line_end + 1;
    }

    (!context.is_empty()).then_some(context)
}
