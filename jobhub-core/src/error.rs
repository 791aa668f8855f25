use crate::ids::ConnId;

/// Errors the dispatch engine can raise while applying an inbound packet or
/// admin request to the data model. Every variant maps to a wire-facing
/// `ERROR` packet or admin error line; callers should not need to match on
/// this beyond logging and, for client-issued packets, forwarding
/// [`DispatchError::as_wire_code`] back to the misbehaving connection.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum DispatchError {
    /// A command id not understood in the sending connection's current
    /// role (e.g. `GRAB_JOB` from a connection that never registered
    /// abilities, or a second role-establishing command from a connection
    /// that already committed to another role).
    #[error("command not valid for connection {0} in its current role")]
    WrongRole(ConnId),

    /// `SUBMIT_JOB*` was sent with a zero-length function name, a workload
    /// argument absent when the caller declared one present, or
    /// `OPTION_REQ` named an option other than `exceptions`.
    #[error("invalid job submission arguments")]
    InvalidArgument,

    /// A handle referenced by `GET_STATUS`, `WORK_*` or an admin command
    /// does not correspond to a known job.
    #[error("unknown job handle: {0}")]
    UnknownJob(String),

    /// A function name referenced by an admin command is not registered by
    /// any connection.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// A function's queue already holds its configured `maxqueue` ceiling
    /// of pending jobs.
    #[error("function {0} queue is full")]
    QueueFull(String),

    /// `SUBMIT_JOB*` was received while the server is draining for a
    /// graceful shutdown; no new job is admitted.
    #[error("server is shutting down gracefully; no new jobs are accepted")]
    ShuttingDown,
}

impl DispatchError {
    /// The short code sent back to a client inside an `ERROR` packet,
    /// matching the wire-facing kind strings in the error handling design.
    pub fn as_wire_code(&self) -> &'static str {
        match self {
            DispatchError::WrongRole(_) => "unknown-command",
            DispatchError::InvalidArgument => "invalid-argument",
            DispatchError::UnknownJob(_) => "unknown-job",
            DispatchError::UnknownFunction(_) => "unknown-function",
            DispatchError::QueueFull(_) => "queue-full",
            DispatchError::ShuttingDown => "shutdown-graceful",
        }
    }
}
