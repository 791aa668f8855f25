//! State shared between every I/O thread and the dispatcher: the single
//! global data model lock, the `proc_ready` hand-off queue the
//! condvar-based wake contract is built around, and the routing tables the
//! dispatcher uses to get outbound bytes back to the right socket.

use crate::job_store::JobStore;
use crate::net::Inbound;
use jobhub_core::{ConnId, Server};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A message an I/O thread's control channel accepts: a freshly-accepted
/// socket to take ownership of, or bytes the dispatcher wants written to a
/// connection that thread owns.
pub enum IoCommand {
    /// Hand over a newly-accepted socket from the acceptor.
    NewConn(std::net::TcpStream),
    /// Write `bytes` to `ConnId`.
    Write(ConnId, Vec<u8>),
    /// Close a connection outright (malformed-frame teardown, admin
    /// `shutdown`).
    Close(ConnId),
}

/// One I/O thread's control channel plus the [`mio::Waker`] needed to pull
/// it out of a blocking poll from another thread.
pub struct IoHandle {
    /// Sender side of this thread's control channel.
    pub tx: crossbeam_channel::Sender<IoCommand>,
    /// Wakes this thread's `mio::Poll` once a control message is queued.
    pub waker: Arc<mio::Waker>,
}

/// Every I/O thread's handle, indexed by thread index.
pub type IoHandles = Arc<Vec<IoHandle>>;

/// Maps a live connection to the index of the I/O thread that owns its
/// socket, so the dispatcher can route an outbound packet to the right
/// [`IoHandle`]. Populated when an I/O thread accepts a connection and
/// registers it with [`Server::register_connection`], erased again once
/// that connection is torn down.
pub type RouteTable = Arc<Mutex<HashMap<ConnId, usize>>>;

/// Maps a live connection to its remote address, purely for the admin
/// `workers` command's output — [`jobhub_core`] has no notion of sockets.
pub type AddrTable = Arc<Mutex<HashMap<ConnId, SocketAddr>>>;

/// One connection's worth of freshly-decoded inbound units, queued for the
/// dispatcher.
pub struct ReadyUnit {
    /// Connection the units arrived on.
    pub conn: ConnId,
    /// Decoded packets or admin requests, in arrival order.
    pub units: Vec<Inbound>,
}

/// The one structure every thread in this server touches. In multi-threaded
/// mode, `server` is the single lock named throughout the concurrency
/// model: I/O threads hold it only long enough to register or forget a
/// connection, and the dispatcher holds it only while applying a batch of
/// commands.
pub struct Shared {
    /// The dispatch data model.
    pub server: Mutex<Server>,
    /// Connections with inbound units waiting to be applied.
    pub proc_ready: Mutex<VecDeque<ReadyUnit>>,
    /// Connections that died and need teardown, queued separately from
    /// `proc_ready` since a dead connection carries no units.
    pub disconnects: Mutex<VecDeque<ConnId>>,
    /// Signalled whenever `proc_ready` or `disconnects` gains an entry, or
    /// shutdown is requested. The dispatcher's wait loop treats a spurious
    /// wake as a no-op and simply re-checks both queues, so redundant
    /// notifications (several I/O threads waking it in quick succession)
    /// are harmless — this is the "at-least-one-wake" contract.
    pub proc_cv: Condvar,
    /// Set once an admin `shutdown` (no args) asks the server to stop now.
    pub shutdown_immediate: AtomicBool,
    /// Set once `shutdown graceful` asks the server to drain and then stop.
    pub shutdown_graceful: AtomicBool,
    /// Where queued jobs are durably recorded, if at all.
    pub job_store: Mutex<Box<dyn JobStore>>,
    /// Remote address of every live connection.
    pub addrs: AddrTable,
    /// How often the dispatcher checks for workers that have held a job
    /// past its `CAN_DO_TIMEOUT` deadline.
    pub sweep_interval: Duration,
    /// When the timeout sweep last ran.
    pub last_sweep: Mutex<Instant>,
}

impl Shared {
    /// Build fresh shared state around an empty [`Server`].
    pub fn new(server: Server, job_store: Box<dyn JobStore>, sweep_interval: Duration) -> Self {
        Shared {
            server: Mutex::new(server),
            proc_ready: Mutex::new(VecDeque::new()),
            disconnects: Mutex::new(VecDeque::new()),
            proc_cv: Condvar::new(),
            shutdown_immediate: AtomicBool::new(false),
            shutdown_graceful: AtomicBool::new(false),
            job_store: Mutex::new(job_store),
            addrs: Arc::new(Mutex::new(HashMap::new())),
            sweep_interval,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Hand a connection's decoded units to the dispatcher and wake it.
    pub fn push_ready(&self, conn: ConnId, units: Vec<Inbound>) {
        if units.is_empty() {
            return;
        }
        self.proc_ready.lock().unwrap().push_back(ReadyUnit { conn, units });
        self.proc_cv.notify_one();
    }

    /// Report a connection's death to the dispatcher and wake it.
    pub fn push_disconnect(&self, conn: ConnId) {
        self.disconnects.lock().unwrap().push_back(conn);
        self.proc_cv.notify_one();
    }

    /// True once either shutdown flag has been set.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_immediate.load(Ordering::SeqCst) || self.shutdown_graceful.load(Ordering::SeqCst)
    }
}
