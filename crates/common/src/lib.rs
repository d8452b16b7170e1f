// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! EDP Common - Shared functionality for EDP components
//!
//! This crate provides the pieces shared by the `edp` binary, the engine
//! crate and the integration tests: logging setup and the names of the
//! environment variables EDP reads.

/// Environment variable names recognized by EDP
pub mod env;
/// Logging setup and utilities for consistent logging across EDP components
pub mod logging;

pub use logging::*;
