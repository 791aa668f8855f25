use crate::connection::Connection;
use crate::function_registry::FunctionRegistry;
use crate::ids::{ConnId, JobId};
use crate::job::Job;
use std::collections::HashMap;

/// How the server is winding down, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Normal operation.
    Running,
    /// Accept no new jobs; stop once every assigned job has completed or
    /// failed.
    Graceful,
    /// Stop as soon as the I/O layer notices this flag.
    Immediate,
}

/// The single global data model a dispatch thread owns: the job table, the
/// function registry, and the connection table. Every operation in
/// [`crate::dispatch`] takes `&mut Server` — in the multi-threaded runtime
/// this is the one structure protected by one lock, held only while a
/// command is being applied.
#[derive(Debug)]
pub struct Server {
    /// Host component of generated job handles (`H:<host>:<counter>`).
    host_label: String,
    next_job_counter: u64,
    next_conn_counter: u64,
    /// All known jobs, keyed by their table index.
    pub jobs: HashMap<JobId, Job>,
    /// Wire handle to job-table index, for `GET_STATUS`/admin lookups.
    pub handles: HashMap<String, JobId>,
    /// All known connections, keyed by their table index.
    pub connections: HashMap<ConnId, Connection>,
    /// Function capability, sleeper and queue bookkeeping.
    pub functions: FunctionRegistry,
    /// Shutdown state, set by the `shutdown` admin command.
    pub shutdown: ShutdownMode,
    /// How many sleeping workers a single job submission wakes, at most.
    /// `1` matches the wire protocol's literal "pop one" wording; a higher
    /// value trades a few redundant `NOOP`/`GRAB_JOB`/`NO_JOB` round trips
    /// for faster pickup when several workers raced to sleep on a function
    /// that then receives a burst of submissions.
    pub worker_wakeup_count: usize,
}

impl Server {
    /// Build an empty server. `host_label` is embedded in every job handle
    /// this server generates and would typically be the local hostname.
    pub fn new(host_label: impl Into<String>) -> Self {
        Server {
            host_label: host_label.into(),
            next_job_counter: 1,
            next_conn_counter: 1,
            jobs: HashMap::new(),
            handles: HashMap::new(),
            connections: HashMap::new(),
            functions: FunctionRegistry::default(),
            shutdown: ShutdownMode::Running,
            worker_wakeup_count: 1,
        }
    }

    /// Override how many sleeping workers a submission wakes at most.
    /// Builder-style, intended for use right after [`Server::new`].
    pub fn with_worker_wakeup_count(mut self, count: usize) -> Self {
        self.worker_wakeup_count = count.max(1);
        self
    }

    /// Register a freshly-accepted connection and return its id.
    pub fn register_connection(&mut self) -> ConnId {
        let id = ConnId(self.next_conn_counter);
        self.next_conn_counter += 1;
        self.connections.insert(id, Connection::new(id));
        id
    }

    /// Allocate a fresh job id and wire handle.
    pub fn next_handle(&mut self) -> (JobId, String) {
        let counter = self.next_job_counter;
        self.next_job_counter += 1;
        (JobId(counter), format!("H:{}:{}", self.host_label, counter))
    }

    /// Insert a newly-built job into the job and handle tables.
    pub fn insert_job(&mut self, job: Job) {
        self.handles.insert(job.handle.clone(), job.id);
        self.jobs.insert(job.id, job);
    }

    /// Remove a job from both tables, e.g. once it completes or fails.
    pub fn remove_job(&mut self, id: JobId) -> Option<Job> {
        let job = self.jobs.remove(&id)?;
        self.handles.remove(&job.handle);
        Some(job)
    }

    /// True once every connection has been torn down and no jobs remain,
    /// the condition a graceful shutdown waits for.
    pub fn is_drained(&self) -> bool {
        self.jobs.is_empty()
    }
}
