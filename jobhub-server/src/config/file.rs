//! TOML configuration file schema.

use serde::Deserialize;

/// Top-level TOML document.
#[derive(Debug, Default, Deserialize)]
pub struct FileOptions {
    /// Global log level, e.g. `"info"`.
    pub verbosity: Option<String>,
    /// `[service]` table.
    pub service: Option<ServiceFileOptions>,
    /// `[status]` table.
    pub status: Option<StatusFileOptions>,
    /// `[threads]` table.
    pub threads: Option<ThreadsFileOptions>,
}

/// `[service]` table fields.
#[derive(Debug, Default, Deserialize)]
pub struct ServiceFileOptions {
    /// See [`crate::config::cli::ServiceOptions::address`].
    pub address: Option<String>,
    /// See [`crate::config::cli::ServiceOptions::port`].
    pub port: Option<u16>,
    /// See [`crate::config::cli::ServiceOptions::max_frame_bytes`].
    pub max_frame_bytes: Option<u32>,
    /// See [`crate::config::cli::ServiceOptions::job_log_dir`].
    pub job_log_dir: Option<String>,
    /// See [`crate::config::cli::ServiceOptions::backlog`].
    pub backlog: Option<u32>,
    /// See [`crate::config::cli::ServiceOptions::worker_wakeup_count`].
    pub worker_wakeup_count: Option<usize>,
    /// See [`crate::config::cli::ServiceOptions::graceful_shutdown_signal`].
    pub graceful_shutdown_signal: Option<String>,
    /// See [`crate::config::cli::ServiceOptions::sweep_interval_secs`].
    pub sweep_interval_secs: Option<u64>,
}

/// `[status]` table fields.
#[derive(Debug, Default, Deserialize)]
pub struct StatusFileOptions {
    /// See [`crate::config::cli::StatusOptions::address`].
    pub address: Option<String>,
    /// See [`crate::config::cli::StatusOptions::port`].
    pub port: Option<u16>,
}

/// `[threads]` table fields.
#[derive(Debug, Default, Deserialize)]
pub struct ThreadsFileOptions {
    /// See [`crate::config::cli::ThreadingOptions::io_thread_count`].
    pub io_count: Option<usize>,
}

impl FileOptions {
    /// Read and parse a TOML file from `path`.
    pub fn read_filepath(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path, e))?;
        let parsed: FileOptions = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path, e))?;
        Ok(parsed)
    }
}
