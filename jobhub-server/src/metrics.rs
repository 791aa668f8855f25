//! Prometheus metric definitions for the dispatch server.

use prometheus::{IntCounter, IntGauge, Registry};

/// Common prefix for this server's metrics.
static METRICS_PREFIX: &str = "jobhub";

lazy_static::lazy_static! {
    /// Metrics registry, served at `/metrics`.
    pub static ref PROM_REGISTRY: Registry =
        Registry::new_custom(Some(METRICS_PREFIX.to_string()), None)
            .expect("could not create metrics registry");

    /// Jobs submitted, across every function.
    pub static ref JOBS_SUBMITTED: IntCounter = IntCounter::new(
        "jobs_submitted_total",
        "Total number of jobs submitted by clients"
    ).expect("could not create jobs_submitted_total");

    /// Jobs that reached `WORK_COMPLETE`.
    pub static ref JOBS_COMPLETED: IntCounter = IntCounter::new(
        "jobs_completed_total",
        "Total number of jobs completed by workers"
    ).expect("could not create jobs_completed_total");

    /// Jobs that reached `WORK_FAIL`.
    pub static ref JOBS_FAILED: IntCounter = IntCounter::new(
        "jobs_failed_total",
        "Total number of jobs reported failed by workers"
    ).expect("could not create jobs_failed_total");

    /// Currently open connections, by role.
    pub static ref CONNECTIONS: IntGauge = IntGauge::new(
        "connections_open",
        "Number of currently open connections"
    ).expect("could not create connections_open");
}

/// Register every metric above with [`PROM_REGISTRY`]. Called once at
/// startup; panics on a registration conflict since that can only mean a
/// programming error (two metrics sharing a name).
pub fn register() {
    PROM_REGISTRY
        .register(Box::new(JOBS_SUBMITTED.clone()))
        .expect("register jobs_submitted_total");
    PROM_REGISTRY
        .register(Box::new(JOBS_COMPLETED.clone()))
        .expect("register jobs_completed_total");
    PROM_REGISTRY
        .register(Box::new(JOBS_FAILED.clone()))
        .expect("register jobs_failed_total");
    PROM_REGISTRY
        .register(Box::new(CONNECTIONS.clone()))
        .expect("register connections_open");
}
