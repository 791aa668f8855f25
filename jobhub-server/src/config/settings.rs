//! Runtime application settings (validated config).

use super::cli::{CliOptions, ServiceOptions, StatusOptions, ThreadingOptions};
use super::file::FileOptions;
use crate::net::DEFAULT_MAX_FRAME_BYTES;
use jobhub_commons::MergeOptions;
use smart_default::SmartDefault;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Validated runtime settings the binary actually runs with.
#[derive(Debug, SmartDefault)]
pub struct AppSettings {
    /// Listening address for the client/worker dispatch service.
    #[default(IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub address: IpAddr,

    /// Listening port for the client/worker dispatch service.
    #[default(4730)]
    pub port: u16,

    /// Ceiling on a single binary frame's body, in bytes.
    #[default(DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: u32,

    /// Directory to persist queued jobs under; `None` disables persistence.
    pub job_log_dir: Option<PathBuf>,

    /// TCP listen backlog for the dispatch service's socket.
    #[default(1024)]
    pub backlog: u32,

    /// How many sleeping workers a single job submission wakes, at most.
    #[default(1)]
    pub worker_wakeup_count: usize,

    /// OS signal that triggers a graceful shutdown.
    #[default("SIGTERM")]
    pub graceful_shutdown_signal: String,

    /// How often to check for workers holding a job past its
    /// `CAN_DO_TIMEOUT` deadline.
    #[default(Duration::from_secs(5))]
    pub sweep_interval: Duration,

    /// Listening address for the status service.
    #[default(IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub status_address: IpAddr,

    /// Listening port for the status service.
    #[default(8080)]
    pub status_port: u16,

    /// Number of I/O threads. `0` collapses I/O and dispatch into a single
    /// thread, as the protocol's single-threaded mode requires.
    #[default(4)]
    pub io_thread_count: usize,

    /// Global log level.
    #[default(log::LevelFilter::Warn)]
    pub verbosity: log::LevelFilter,
}

impl AppSettings {
    /// Source CLI flags and an optional config file, merge them over
    /// compiled-in defaults, and validate the result.
    pub fn assemble() -> anyhow::Result<Self> {
        let cli_opts = CliOptions::from_args();
        let file_opts = match &cli_opts.config_path {
            Some(path) => Some(FileOptions::read_filepath(path)?),
            None => None,
        };

        let mut settings = Self::default();
        if cli_opts.verbosity > 0 {
            settings.verbosity = match cli_opts.verbosity {
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            };
        }
        settings.try_merge(Some(cli_opts.service))?;
        settings.try_merge(Some(cli_opts.status))?;
        settings.try_merge(Some(cli_opts.threading))?;
        settings.try_merge(file_opts)?;

        settings.try_validate()
    }

    fn try_validate(self) -> anyhow::Result<Self> {
        if self.max_frame_bytes == 0 {
            anyhow::bail!("service.max_frame_bytes must be non-zero");
        }
        if self.worker_wakeup_count == 0 {
            anyhow::bail!("service.worker_wakeup_count must be non-zero");
        }
        if signal_number(&self.graceful_shutdown_signal).is_none() {
            anyhow::bail!(
                "service.graceful_shutdown_signal {:?} is not one of SIGTERM, SIGHUP, SIGUSR1, SIGUSR2",
                self.graceful_shutdown_signal
            );
        }
        if self.sweep_interval.is_zero() {
            anyhow::bail!("service.sweep_interval_secs must be non-zero");
        }
        Ok(self)
    }
}

/// Map a signal name (as accepted by `service.graceful_shutdown_signal`) to
/// its `signal-hook` constant. `SIGINT` is deliberately excluded here: it
/// always triggers an immediate shutdown, regardless of this setting, so
/// graceful shutdown never has to fight an operator's Ctrl-C.
pub fn signal_number(name: &str) -> Option<i32> {
    use signal_hook::consts::signal::{SIGHUP, SIGTERM, SIGUSR1, SIGUSR2};
    match name {
        "SIGTERM" => Some(SIGTERM),
        "SIGHUP" => Some(SIGHUP),
        "SIGUSR1" => Some(SIGUSR1),
        "SIGUSR2" => Some(SIGUSR2),
        _ => None,
    }
}

impl MergeOptions<Option<ServiceOptions>> for AppSettings {
    fn try_merge(&mut self, opts: Option<ServiceOptions>) -> anyhow::Result<()> {
        if let Some(service) = opts {
            if let Some(addr) = service.address {
                self.address = addr.parse()?;
            }
            assign_if_some(&mut self.port, service.port);
            assign_if_some(&mut self.max_frame_bytes, service.max_frame_bytes);
            if let Some(dir) = service.job_log_dir {
                self.job_log_dir = Some(PathBuf::from(dir));
            }
            assign_if_some(&mut self.backlog, service.backlog);
            assign_if_some(&mut self.worker_wakeup_count, service.worker_wakeup_count);
            assign_if_some(&mut self.graceful_shutdown_signal, service.graceful_shutdown_signal);
            if let Some(secs) = service.sweep_interval_secs {
                self.sweep_interval = Duration::from_secs(secs);
            }
        }
        Ok(())
    }
}

impl MergeOptions<Option<StatusOptions>> for AppSettings {
    fn try_merge(&mut self, opts: Option<StatusOptions>) -> anyhow::Result<()> {
        if let Some(status) = opts {
            if let Some(addr) = status.address {
                self.status_address = addr.parse()?;
            }
            assign_if_some(&mut self.status_port, status.port);
        }
        Ok(())
    }
}

impl MergeOptions<Option<ThreadingOptions>> for AppSettings {
    fn try_merge(&mut self, opts: Option<ThreadingOptions>) -> anyhow::Result<()> {
        if let Some(threading) = opts {
            assign_if_some(&mut self.io_thread_count, threading.io_thread_count);
        }
        Ok(())
    }
}

impl MergeOptions<Option<FileOptions>> for AppSettings {
    fn try_merge(&mut self, opts: Option<FileOptions>) -> anyhow::Result<()> {
        let Some(file) = opts else {
            return Ok(());
        };
        if let Some(verbosity) = &file.verbosity {
            self.verbosity = verbosity
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid verbosity {:?}", verbosity))?;
        }
        if let Some(service) = file.service {
            if let Some(addr) = service.address {
                self.address = addr.parse()?;
            }
            assign_if_some(&mut self.port, service.port);
            assign_if_some(&mut self.max_frame_bytes, service.max_frame_bytes);
            if let Some(dir) = service.job_log_dir {
                self.job_log_dir = Some(PathBuf::from(dir));
            }
            assign_if_some(&mut self.backlog, service.backlog);
            assign_if_some(&mut self.worker_wakeup_count, service.worker_wakeup_count);
            assign_if_some(&mut self.graceful_shutdown_signal, service.graceful_shutdown_signal);
            if let Some(secs) = service.sweep_interval_secs {
                self.sweep_interval = Duration::from_secs(secs);
            }
        }
        if let Some(status) = file.status {
            if let Some(addr) = status.address {
                self.status_address = addr.parse()?;
            }
            assign_if_some(&mut self.status_port, status.port);
        }
        if let Some(threads) = file.threads {
            assign_if_some(&mut self.io_thread_count, threads.io_count);
        }
        Ok(())
    }
}

fn assign_if_some<T>(dst: &mut T, src: Option<T>) {
    if let Some(value) = src {
        *dst = value;
    }
}
