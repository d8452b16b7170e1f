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

//! Error types for every pipeline stage.
//!
//! Each stage owns a dedicated error type so callers can tell precisely where
//! a run stopped. [`PipelineError`] wraps the fatal ones and reports the
//! [`Stage`] it came from. [`CallError`] is the only error that never reaches
//! [`PipelineError`]: batch items record it in their
//! [`CallResult`](crate::CallResult) and the batch moves on.

use std::{fmt, string::FromUtf8Error, time::Duration};

use alloy_primitives::{Address, TxHash};
use thiserror::Error;

/// Pipeline stage, used to attribute fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Building the clients from the configuration
    Setup,
    /// Decoding and path normalization of the input files
    Normalize,
    /// Running the Solidity compiler
    Compile,
    /// Picking the deployable artifact
    Select,
    /// Choosing the sending account
    Account,
    /// Contract creation transaction
    Deploy,
    /// Fetching the external asset listing
    Assets,
    /// Per-asset method calls
    Batch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Normalize => "normalize",
            Self::Compile => "compile",
            Self::Select => "select",
            Self::Account => "account",
            Self::Deploy => "deploy",
            Self::Assets => "assets",
            Self::Batch => "batch",
        };
        f.write_str(name)
    }
}

/// An input file could not be decoded as UTF-8 text.
#[derive(Debug, Error)]
#[error("source file `{path}` is not valid UTF-8: {source}")]
pub struct EncodingError {
    /// Path of the offending file, as it was handed in
    pub path: String,
    /// Underlying decoding failure
    pub source: FromUtf8Error,
}

/// The compiler toolchain failed or produced nothing usable.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// There was nothing to compile
    #[error("no source files to compile")]
    NoSources,

    /// The toolchain could not be located, installed or executed
    #[error("solc toolchain failure: {0}")]
    Toolchain(String),

    /// The compiler reported at least one error-severity diagnostic
    #[error("compiler reported errors:{0}")]
    Diagnostics(String),

    /// Compilation succeeded without yielding a single contract
    #[error("no contracts produced")]
    NoContracts,

    /// The blocking compiler task panicked or was cancelled
    #[error("compiler task failed: {0}")]
    Task(String),
}

/// No artifact of the compilation carries both an ABI and bytecode.
#[derive(Debug, Error)]
#[error("no concrete contract with ABI and bytecode among {inspected} compiled contract(s)")]
pub struct NoDeployableContractError {
    /// Number of artifacts that were looked at
    pub inspected: usize,
}

/// Failures at the ledger node boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Connection or protocol level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The node (or the local signer) refused the transaction
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The private key could not be parsed
    #[error("invalid signer key: {0}")]
    InvalidSigner(String),

    /// No receipt arrived in time
    #[error("timed out after {timeout:?} waiting for the receipt of {hash}")]
    Timeout {
        /// Hash of the transaction being watched
        hash: TxHash,
        /// Configured receipt timeout
        timeout: Duration,
    },
}

/// The sending account cannot be used.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The node does not manage any account
    #[error("the node exposes no accounts")]
    NoAccounts,

    /// The requested account is not one the node (or local signer) can sign for
    #[error("account {0} is not available for signing")]
    Unavailable(Address),

    /// Account enumeration failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The contract creation transaction did not produce a contract.
#[derive(Debug, Error)]
pub enum DeploymentError {
    /// The constructor needs arguments, which this pipeline never supplies
    #[error("constructor of `{contract}` expects {expected} argument(s) but none are supplied")]
    ConstructorArguments {
        /// Contract name
        contract: String,
        /// Number of constructor inputs declared in the ABI
        expected: usize,
    },

    /// The bytecode is not plain hex (e.g. unlinked library placeholders)
    #[error("malformed bytecode for `{contract}`: {reason}")]
    MalformedBytecode {
        /// Contract name
        contract: String,
        /// Decoder message
        reason: String,
    },

    /// Submission or receipt wait failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The receipt reports a failed execution
    #[error("deployment transaction {0} reverted")]
    Reverted(TxHash),

    /// The receipt does not name the created contract
    #[error("receipt of {0} carries no contract address")]
    MissingAddress(TxHash),

    /// A contract has already been deployed in this run
    #[error("a contract is already deployed at {0} in this run")]
    AlreadyDeployed(Address),
}

/// Per-item batch failure. Recorded in the item's result, never fatal.
#[derive(Debug, Error)]
pub enum CallError {
    /// The ABI has no function with the configured name
    #[error("method `{0}` not found in the contract ABI")]
    UnknownMethod(String),

    /// None of the overloads takes `(name, owner, imageUri)`
    #[error("method `{0}` has no overload taking (name, owner, imageUri)")]
    NoMatchingOverload(String),

    /// The asset values do not fit the method's parameter types
    #[error("failed to encode call: {0}")]
    Encoding(String),

    /// Submission or receipt wait failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The call was mined but reverted
    #[error("call transaction {0} reverted")]
    Reverted(TxHash),
}

impl CallError {
    /// Hash of the transaction, when it made it onto the ledger.
    pub fn transaction_hash(&self) -> Option<TxHash> {
        match self {
            Self::Reverted(hash) => Some(*hash),
            Self::Ledger(LedgerError::Timeout { hash, .. }) => Some(*hash),
            _ => None,
        }
    }
}

/// The asset directory could not be listed.
#[derive(Debug, Error)]
pub enum AssetDirectoryError {
    /// The HTTP request failed or returned an error status
    #[error("directory request failed: {0}")]
    Http(String),

    /// The response body is not a directory listing
    #[error("malformed directory listing: {0}")]
    Malformed(String),
}

/// A fatal pipeline failure, tagged with the stage it happened in.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The ledger client could not be built from the configuration, e.g. a
    /// malformed RPC URL
    #[error("setup stage failed: {0}")]
    Setup(LedgerError),

    /// See [`EncodingError`]
    #[error("normalize stage failed: {0}")]
    Encoding(#[from] EncodingError),

    /// See [`CompilationError`]
    #[error("compile stage failed: {0}")]
    Compilation(#[from] CompilationError),

    /// See [`NoDeployableContractError`]
    #[error("select stage failed: {0}")]
    Selection(#[from] NoDeployableContractError),

    /// See [`AccountError`]
    #[error("account stage failed: {0}")]
    Account(#[from] AccountError),

    /// See [`DeploymentError`]
    #[error("deploy stage failed: {0}")]
    Deployment(#[from] DeploymentError),

    /// See [`AssetDirectoryError`]
    #[error("assets stage failed: {0}")]
    Assets(#[from] AssetDirectoryError),

    /// A stage was invoked before the stage it depends on completed
    #[error("{stage} stage requires a completed {requires} stage")]
    MissingStage {
        /// Stage that was invoked
        stage: Stage,
        /// Stage that has to run first
        requires: Stage,
    },
}

impl PipelineError {
    /// The stage this error aborted.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Setup(_) => Stage::Setup,
            Self::Encoding(_) => Stage::Normalize,
            Self::Compilation(_) => Stage::Compile,
            Self::Selection(_) => Stage::Select,
            Self::Account(_) => Stage::Account,
            Self::Deployment(_) => Stage::Deploy,
            Self::Assets(_) => Stage::Assets,
            Self::MissingStage { stage, .. } => *stage,
        }
    }
}
