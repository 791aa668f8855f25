use crate::ids::{ConnId, JobId, Priority};
use std::time::Instant;

/// A job in flight: submitted by a client, waiting in a function's queue or
/// currently assigned to a worker. Removed from the job table the moment it
/// completes or fails — `GET_STATUS` on a handle no longer present simply
/// reports the job as unknown, matching the wire protocol's "known=0"
/// status line.
#[derive(Debug, Clone)]
pub struct Job {
    /// Stable index into the job table.
    pub id: JobId,
    /// Wire handle, `H:<host>:<counter>`.
    pub handle: String,
    /// Function name this job was submitted against.
    pub function: String,
    /// Client-supplied unique id (may be empty).
    pub unique: String,
    /// Scheduling priority.
    pub priority: Priority,
    /// Opaque workload bytes handed to whichever worker picks this job up.
    pub workload: Vec<u8>,
    /// Background jobs are fire-and-forget: the submitting client gets a
    /// `JOB_CREATED` handle and nothing further unless it later polls
    /// `GET_STATUS`.
    pub background: bool,
    /// Connections watching this job for `WORK_STATUS`/`WORK_COMPLETE`/
    /// `WORK_FAIL` updates. Empty for background jobs.
    pub clients: Vec<ConnId>,
    /// The worker connection currently processing this job, if any.
    pub owner: Option<ConnId>,
    /// When `owner` was last set, for the worker timeout sweep's deadline
    /// check. `None` while queued.
    pub assigned_at: Option<Instant>,
    /// Last reported `(numerator, denominator)` from `WORK_STATUS`.
    pub progress: (u32, u32),
}

impl Job {
    /// Build a freshly-submitted, unassigned job.
    pub fn new(
        id: JobId,
        handle: String,
        function: String,
        unique: String,
        priority: Priority,
        workload: Vec<u8>,
        background: bool,
        submitter: Option<ConnId>,
    ) -> Self {
        Job {
            id,
            handle,
            function,
            unique,
            priority,
            workload,
            background,
            clients: submitter.into_iter().collect(),
            owner: None,
            assigned_at: None,
            progress: (0, 0),
        }
    }

    /// Whether this job is sitting in a queue, unassigned.
    pub fn is_queued(&self) -> bool {
        self.owner.is_none()
    }
}
