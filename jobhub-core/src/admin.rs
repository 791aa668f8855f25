//! Data behind the admin text protocol's verbs. Formatting into the exact
//! wire text (including the trailing `.` line and, for `workers`, each
//! connection's remote address) is the I/O layer's job, since this crate
//! has no notion of sockets or addresses.


use crate::error::DispatchError;
use crate::ids::ConnId;
use crate::server::{Server, ShutdownMode};

/// One line of `status` output: a function, its queue depth, how many of
/// those jobs are currently running, and how many workers can perform it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionStatus {
    /// Function name.
    pub name: String,
    /// Jobs submitted but not yet handed to a worker.
    pub queued: usize,
    /// Jobs currently assigned to a worker.
    pub running: usize,
    /// Workers that have registered this ability.
    pub workers: usize,
}

/// One line of `workers` output: a connection id, its optional
/// `SET_CLIENT_ID` label, and the functions it can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Connection id (the I/O layer maps this to a remote address).
    pub conn: ConnId,
    /// Label set via `SET_CLIENT_ID`, if any.
    pub client_id: Option<String>,
    /// Functions this worker can perform.
    pub abilities: Vec<String>,
}

/// Data for the `status` admin command: one entry per registered function.
pub fn status(server: &Server) -> Vec<FunctionStatus> {
    server
        .functions
        .iter()
        .map(|(name, entry)| {
            let running = server
                .jobs
                .values()
                .filter(|j| &j.function == name && j.owner.is_some())
                .count();
            FunctionStatus {
                name: name.clone(),
                queued: entry.queued_count(),
                running,
                workers: entry.capable_workers.len(),
            }
        })
        .collect()
}

/// Data for the `workers` admin command: one entry per worker connection.
pub fn workers(server: &Server) -> Vec<WorkerStatus> {
    server
        .connections
        .values()
        .filter_map(|c| {
            c.worker().map(|w| WorkerStatus {
                conn: c.id,
                client_id: w.client_id.clone(),
                abilities: w.abilities.clone(),
            })
        })
        .collect()
}

/// Apply `maxqueue <function> [<size>]`. `size` of `None` clears any
/// existing ceiling.
pub fn set_max_queue(server: &mut Server, function: &str, size: Option<usize>) {
    server.functions.entry(function).max_queue = size;
}

/// Apply `shutdown` / `shutdown graceful`.
pub fn shutdown(server: &mut Server, graceful: bool) {
    server.shutdown = if graceful {
        ShutdownMode::Graceful
    } else {
        ShutdownMode::Immediate
    };
}

/// `status`/`workers` reference a handle-less function or connection only
/// implicitly (they never fail); this exists so admin command handling in
/// the server crate shares the same error type as packet dispatch when it
/// needs to reject, e.g., a malformed `maxqueue` size.
pub fn validate_max_queue_size(raw: Option<&str>) -> Result<Option<usize>, DispatchError> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| DispatchError::InvalidArgument),
    }
}
