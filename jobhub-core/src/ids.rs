use std::fmt;

/// Opaque index into the job table. Jobs are stored in a `HashMap` keyed by
/// this id rather than linked through owned/borrowed references, to avoid
/// building a cyclic reference graph between jobs, functions and
/// connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u64);

/// Opaque index into the connection table, assigned by the server when a
/// connection is first registered. Stable for the lifetime of the
/// connection; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub(crate) u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Priority tier for a submitted job. Scheduling is strict priority with
/// FIFO order within a tier: every `High` job is handed out before any
/// `Normal` job, which in turn precedes every `Low` job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Handed out last.
    Low,
    /// Default priority.
    Normal,
    /// Handed out first.
    High,
}

impl Priority {
    /// All priority tiers, in scheduling order (highest first).
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];
}
