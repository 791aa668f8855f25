use crate::ids::{ConnId, JobId};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// State a client connection has accumulated: the jobs it submitted and is
/// still watching for completion.
#[derive(Debug, Default)]
pub struct ClientState {
    /// Jobs this client submitted in the foreground and has not yet seen
    /// `WORK_COMPLETE`/`WORK_FAIL` for.
    pub watching: HashSet<JobId>,
    /// Set by a successful `OPTION_REQ("exceptions")`. Gates whether this
    /// client is forwarded `WORK_EXCEPTION` at all.
    pub exceptions: bool,
}

/// State a worker connection has accumulated: which functions it can
/// perform, an optional per-client identifier, and which jobs it currently
/// holds.
#[derive(Debug, Default)]
pub struct WorkerState {
    /// Function names this worker can perform, in `CAN_DO` registration
    /// order — `GRAB_JOB` checks them in this order.
    pub abilities: Vec<String>,
    /// Per-function `CAN_DO_TIMEOUT` deadline, if one was set.
    pub timeouts: HashMap<String, Duration>,
    /// Set via `SET_CLIENT_ID`; purely informational, shown by `workers`.
    pub client_id: Option<String>,
    /// Jobs this worker currently holds (assigned via `GRAB_JOB*`, not yet
    /// completed or failed).
    pub assigned: HashSet<JobId>,
    /// True iff exactly one `NOOP` is presently in flight to this worker
    /// (sent but not yet followed by a `GRAB_JOB*`). Cleared on `GRAB_JOB*`;
    /// checked before a submission or requeue-wake sends another, so a
    /// worker parked on several functions never receives more than one
    /// `NOOP` per wake.
    pub noop_queued: bool,
}

impl WorkerState {
    /// Register (or re-register) an ability, optionally with a timeout.
    pub fn add_ability(&mut self, function: String, timeout: Option<Duration>) {
        if !self.abilities.contains(&function) {
            self.abilities.push(function.clone());
        }
        match timeout {
            Some(t) => {
                self.timeouts.insert(function, t);
            }
            None => {
                self.timeouts.remove(&function);
            }
        }
    }

    /// Forget an ability.
    pub fn remove_ability(&mut self, function: &str) {
        self.abilities.retain(|f| f != function);
        self.timeouts.remove(function);
    }

    /// Forget every ability, as `RESET_ABILITIES` requires.
    pub fn reset_abilities(&mut self) {
        self.abilities.clear();
        self.timeouts.clear();
    }
}

/// A connection's role, mirroring the wire protocol's own state machine:
/// every connection starts `Unset` and transitions the first time it sends
/// a client, worker, or admin-only command. `Dead` marks a connection the
/// I/O layer has reported closed but whose teardown (requeueing jobs,
/// forgetting abilities) has not yet run.
#[derive(Debug)]
pub enum ConnRole {
    /// No command establishing a role has been seen yet.
    Unset,
    /// Connection has submitted at least one job or grabbed job status.
    Client(ClientState),
    /// Connection has registered at least one ability.
    Worker(WorkerState),
    /// Connection is latched into the line-oriented admin protocol.
    Admin,
    /// Connection closed; pending cleanup.
    Dead,
}

/// Everything the dispatcher tracks about one connection, addressed by its
/// [`ConnId`]. Carries no socket or buffer state — that belongs to the I/O
/// layer.
#[derive(Debug)]
pub struct Connection {
    /// Stable id assigned at registration.
    pub id: ConnId,
    /// Current role in the connection state machine.
    pub role: ConnRole,
}

impl Connection {
    /// A brand new, not-yet-classified connection.
    pub fn new(id: ConnId) -> Self {
        Connection {
            id,
            role: ConnRole::Unset,
        }
    }

    /// Promote an `Unset` connection to `Client`, or borrow its existing
    /// client state. Returns `None` if the connection is already a worker
    /// or admin connection, since a connection commits to one role for its
    /// lifetime.
    pub fn as_client_mut(&mut self) -> Option<&mut ClientState> {
        if matches!(self.role, ConnRole::Unset) {
            self.role = ConnRole::Client(ClientState::default());
        }
        match &mut self.role {
            ConnRole::Client(state) => Some(state),
            _ => None,
        }
    }

    /// Promote an `Unset` connection to `Worker`, or borrow its existing
    /// worker state. Returns `None` if the connection already committed to
    /// another role.
    pub fn as_worker_mut(&mut self) -> Option<&mut WorkerState> {
        if matches!(self.role, ConnRole::Unset) {
            self.role = ConnRole::Worker(WorkerState::default());
        }
        match &mut self.role {
            ConnRole::Worker(state) => Some(state),
            _ => None,
        }
    }

    /// Borrow worker state, if this connection is in fact a worker.
    pub fn worker(&self) -> Option<&WorkerState> {
        match &self.role {
            ConnRole::Worker(state) => Some(state),
            _ => None,
        }
    }

    /// Borrow client state, if this connection is in fact a client.
    pub fn client(&self) -> Option<&ClientState> {
        match &self.role {
            ConnRole::Client(state) => Some(state),
            _ => None,
        }
    }
}
