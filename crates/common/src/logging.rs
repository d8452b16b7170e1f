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

//! Logging configuration for EDP components
//!
//! Provides centralized logging setup with:
//! - Structured console output on stderr, so stdout stays reserved for
//!   command results
//! - Optional file logging with daily rotation
//! - Environment variable support (RUST_LOG), default INFO level

use eyre::Result;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Once,
};
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize logging for EDP components
///
/// This function sets up:
/// - Compact, colored console logging with timestamps on stderr
/// - File logging under `log_dir` with daily rotation, when a directory is given
/// - Environment variable support for log levels (RUST_LOG), INFO by default
///
/// # Arguments
/// * `component_name` - Name of the component (e.g., "edp")
/// * `log_dir` - Directory for the rolling log file; `None` disables file logging
///
/// # Returns
/// The file appender's guard when file logging is enabled. Keep it alive for the
/// lifetime of the process, dropping it flushes and stops the background writer.
///
/// # Examples
/// ```rust,no_run
/// use edp_common::logging;
///
/// fn main() -> eyre::Result<()> {
///     let _guard = logging::init_logging("edp", None)?;
///     tracing::info!("Application started");
///     Ok(())
/// }
/// ```
pub fn init_logging(component_name: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(true)
        .with_writer(io::stderr)
        .compact()
        .with_filter(filter_for_console()?);

    let guard = if let Some(log_dir) = log_dir {
        let log_dir = create_log_directory(log_dir, component_name)?;

        let file_appender = rolling::daily(&log_dir, format!("{component_name}.log"));
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        // No colors in files
        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(LocalTime::rfc_3339())
            .with_ansi(false)
            .with_writer(non_blocking_appender)
            .with_filter(filter_for_file()?);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {e}"))?;

        tracing::info!(
            component = component_name,
            log_dir = %log_dir.display(),
            "Logging initialized with console and file output"
        );
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {e}"))?;

        tracing::debug!(component = component_name, "Logging initialized with console output only");
        None
    };

    log_environment_info(component_name);

    Ok(guard)
}

/// Create the per-component log directory below `root`
fn create_log_directory(root: &Path, component_name: &str) -> Result<PathBuf> {
    let log_dir = root.join("edp-logs").join(component_name);
    fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

/// Filter for console output
fn filter_for_console() -> Result<EnvFilter> {
    Ok(default_filter(Level::INFO)?
        .add_directive("hyper=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("alloy_transport_http=warn".parse()?))
}

/// Filter for file output - be more verbose for debugging
fn filter_for_file() -> Result<EnvFilter> {
    default_filter(Level::DEBUG)
}

/// RUST_LOG if set, otherwise `level`
fn default_filter(level: Level) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| eyre::eyre!("Failed to create environment filter: {e}"))
}

/// Log useful environment information
fn log_environment_info(component_name: &str) {
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let args: Vec<String> = env::args().collect();

    tracing::debug!(
        component = component_name,
        rust_log = %rust_log,
        args = ?args,
        "Environment information"
    );

    if let Ok(current_dir) = env::current_dir() {
        tracing::debug!(working_directory = %current_dir.display(), "Working directory");
    }
}

/// Initialize simple logging (console only, no file output)
///
/// This is useful for tests or simple utilities that don't need
/// the full logging setup.
///
/// # Arguments
/// * `level` - The default log level to use
pub fn init_simple_logging(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(level)?)
        .with_target(false)
        .with_test_writer()
        .compact()
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize simple logging: {e}"))?;

    Ok(())
}

// Global test logging initialization - ensures logging is only set up once across all tests
static TEST_LOGGING_INIT: Once = Once::new();

/// Safe logging initialization for tests - can be called multiple times without crashing
///
/// Uses `std::sync::Once` so initialization happens only once per test process.
/// Output goes through the test writer, so it is captured unless `--nocapture`
/// is passed. INFO is the default level unless RUST_LOG says otherwise.
///
/// # Usage
/// ```rust
/// use edp_common::logging;
/// use tracing::info;
///
/// logging::ensure_test_logging(None);
/// info!("This will work safely in any test!");
/// ```
pub fn ensure_test_logging(default_level: Option<Level>) {
    TEST_LOGGING_INIT.call_once(|| {
        // A subscriber may already be installed by the test harness, which is fine
        let _ = init_simple_logging(default_level.unwrap_or(Level::INFO));
    });
}
