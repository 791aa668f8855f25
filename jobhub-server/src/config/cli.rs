//! Command-line options.

use structopt::StructOpt;

/// CLI configuration flags, top-level.
#[derive(Debug, StructOpt)]
pub struct CliOptions {
    /// Verbosity level (repeat for more, e.g. `-vv`).
    #[structopt(long = "verbosity", short = "v", parse(from_occurrences))]
    pub verbosity: u8,

    /// Path to a TOML configuration file.
    #[structopt(short = "c", long = "config")]
    pub config_path: Option<String>,

    #[structopt(flatten)]
    pub service: ServiceOptions,

    #[structopt(flatten)]
    pub status: StatusOptions,

    #[structopt(flatten)]
    pub threading: ThreadingOptions,
}

/// CLI configuration flags, client/worker service.
#[derive(Debug, StructOpt)]
pub struct ServiceOptions {
    /// Address the dispatch service listens on.
    #[structopt(long = "service.address")]
    pub address: Option<String>,

    /// Port the dispatch service binds to.
    #[structopt(long = "service.port")]
    pub port: Option<u16>,

    /// Ceiling on a single binary frame's body, in bytes.
    #[structopt(long = "service.max_frame_bytes")]
    pub max_frame_bytes: Option<u32>,

    /// Directory to persist queued jobs under; unset disables persistence.
    #[structopt(long = "service.job_log_dir")]
    pub job_log_dir: Option<String>,

    /// TCP listen backlog for the dispatch service's socket.
    #[structopt(long = "service.backlog")]
    pub backlog: Option<u32>,

    /// How many sleeping workers a single job submission wakes, at most.
    #[structopt(long = "service.worker_wakeup_count")]
    pub worker_wakeup_count: Option<usize>,

    /// OS signal that triggers a graceful shutdown (e.g. `SIGTERM`,
    /// `SIGUSR1`). `SIGINT` always triggers an immediate shutdown.
    #[structopt(long = "service.graceful_shutdown_signal")]
    pub graceful_shutdown_signal: Option<String>,

    /// How often, in seconds, to check for workers holding a job past its
    /// `CAN_DO_TIMEOUT` deadline.
    #[structopt(long = "service.sweep_interval_secs")]
    pub sweep_interval_secs: Option<u64>,
}

/// CLI configuration flags, status service.
#[derive(Debug, StructOpt)]
pub struct StatusOptions {
    /// Address the status service (`/metrics`, `/liveness`, `/readiness`)
    /// listens on.
    #[structopt(long = "status.address")]
    pub address: Option<String>,

    /// Port the status service binds to.
    #[structopt(long = "status.port")]
    pub port: Option<u16>,
}

/// CLI configuration flags, concurrency model.
#[derive(Debug, StructOpt)]
pub struct ThreadingOptions {
    /// Number of I/O threads. `0` runs the collapsed single-threaded mode,
    /// with no separate dispatcher thread.
    #[structopt(long = "threads.io_count")]
    pub io_thread_count: Option<usize>,
}
