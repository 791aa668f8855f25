//! The dispatcher: drains decoded inbound units and dead-connection
//! reports, applies them to the one [`jobhub_core::Server`], and routes
//! every resulting outbound byte string back to the I/O thread that owns
//! the destination connection.
//!
//! Runs on its own thread in the multi-threaded runtime ([`run_loop`]), or
//! inline at the end of the single I/O thread's poll loop when
//! `io_thread_count == 0` collapses the server onto one thread
//! ([`drain_once`] called directly — see [`crate::io_thread::run`]).

use crate::metrics::{JOBS_COMPLETED, JOBS_FAILED, JOBS_SUBMITTED};
use crate::net::{encode_packet, Inbound};
use crate::shared::{AddrTable, IoCommand, IoHandles, RouteTable, Shared};
use jobhub_core::{admin, dispatch, handle_disconnect, overdue_workers, ConnId, DispatchError, Outbound, Server};
use jobhub_proto::{AdminRequest, CommandId, Magic, Packet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WAIT_TIMEOUT: Duration = Duration::from_millis(250);

/// Run the dispatcher loop on its own thread until shutdown. Used by every
/// mode except the collapsed single-threaded one.
pub fn run_loop(shared: Arc<Shared>, routes: RouteTable, addrs: AddrTable, io_handles: IoHandles) {
    loop {
        let made_progress = drain_once(&shared, &routes, &addrs, &io_handles);

        if shared.shutdown_immediate.load(Ordering::SeqCst) {
            return;
        }
        if shared.shutdown_graceful.load(Ordering::SeqCst) && shared.server.lock().unwrap().is_drained() {
            return;
        }
        if !made_progress {
            let guard = shared.proc_ready.lock().unwrap();
            let _ = shared.proc_cv.wait_timeout(guard, WAIT_TIMEOUT);
        }
    }
}

/// Apply everything currently queued in `shared.proc_ready` and
/// `shared.disconnects` exactly once, routing every outbound byte string
/// produced. Returns whether anything was actually applied, so callers can
/// decide whether to wait on the condvar next.
pub fn drain_once(shared: &Shared, routes: &RouteTable, addrs: &AddrTable, io_handles: &IoHandles) -> bool {
    let mut progress = false;

    maybe_sweep_timeouts(shared, routes, io_handles);

    let dead: Vec<ConnId> = shared.disconnects.lock().unwrap().drain(..).collect();
    if !dead.is_empty() {
        progress = true;
        let mut server = shared.server.lock().unwrap();
        for conn in dead {
            let out = handle_disconnect(&mut server, conn);
            route_outbound(out, routes, io_handles);
        }
    }

    let ready = {
        let mut q = shared.proc_ready.lock().unwrap();
        let drained: Vec<_> = q.drain(..).collect();
        drained
    };
    if !ready.is_empty() {
        progress = true;
        let mut server = shared.server.lock().unwrap();
        for unit in ready {
            let conn = unit.conn;
            for inbound in unit.units {
                match inbound {
                    Inbound::Packet(packet) => apply_packet(&mut server, conn, packet, routes, io_handles, shared),
                    Inbound::Admin(req) => apply_admin(&mut server, conn, req, addrs, shared, routes, io_handles),
                }
            }
        }
    }

    progress
}

/// Close out any worker still holding a job past its `CAN_DO_TIMEOUT`
/// deadline, at most once per `shared.sweep_interval`. Reuses the ordinary
/// disconnect teardown path: the I/O thread's `Close` handling pushes the
/// connection onto `shared.disconnects`, which the next `drain_once` call
/// tears down exactly as it would a connection the I/O layer noticed died.
fn maybe_sweep_timeouts(shared: &Shared, routes: &RouteTable, io_handles: &IoHandles) {
    let mut last_sweep = shared.last_sweep.lock().unwrap();
    let now = Instant::now();
    if now.duration_since(*last_sweep) < shared.sweep_interval {
        return;
    }
    *last_sweep = now;
    drop(last_sweep);

    let overdue = {
        let server = shared.server.lock().unwrap();
        overdue_workers(&server, now)
    };
    for conn in overdue {
        log::warn!("worker {} exceeded its job timeout, closing", conn);
        send_to(conn, IoCommand::Close(conn), routes, io_handles);
    }
}

fn apply_packet(
    server: &mut Server,
    conn: ConnId,
    packet: jobhub_proto::Packet,
    routes: &RouteTable,
    io_handles: &IoHandles,
    shared: &Shared,
) {
    use CommandId::*;
    let command = packet.command;
    let terminal_handle = if matches!(command, WorkComplete | WorkFail) {
        packet.args.get(0).map(|h| String::from_utf8_lossy(h).into_owned())
    } else {
        None
    };
    let background_terminal = terminal_handle
        .as_ref()
        .and_then(|h| server.handles.get(h))
        .and_then(|id| server.jobs.get(id))
        .map_or(false, |j| j.background);

    match dispatch(server, conn, packet) {
        Ok(out) => {
            count_job_event(command);
            match command {
                SubmitJobBg | SubmitJobHighBg | SubmitJobLowBg => persist_created_job(server, &out, shared),
                WorkComplete | WorkFail if background_terminal => {
                    if let Some(handle) = &terminal_handle {
                        if let Err(e) = shared.job_store.lock().unwrap().remove(handle) {
                            log::warn!("job store remove failed for {}: {}", handle, e);
                        }
                    }
                }
                _ => {}
            }
            route_outbound(out, routes, io_handles);
        }
        Err(e) => {
            log::warn!("dispatch error from {}: {}", conn, e);
            send_error(conn, &e, routes, io_handles);
        }
    }
}

/// `SUBMIT_JOB_BG`/`SUBMIT_JOB_HIGH_BG`/`SUBMIT_JOB_LOW_BG` all ack with a
/// `JOB_CREATED` packet carrying the new handle; find it among `out` and
/// hand the freshly-inserted job to the store.
fn persist_created_job(server: &Server, out: &[Outbound], shared: &Shared) {
    let Some((_, packet)) = out.iter().find(|(_, p)| p.command == CommandId::JobCreated) else {
        return;
    };
    let Some(handle_bytes) = packet.args.get(0) else {
        return;
    };
    let handle = String::from_utf8_lossy(handle_bytes).into_owned();
    let Some(job) = server.handles.get(&handle).and_then(|id| server.jobs.get(id)) else {
        return;
    };
    if let Err(e) = shared.job_store.lock().unwrap().persist(job) {
        log::warn!("job store persist failed for {}: {}", handle, e);
    }
}

/// A failed command gets an `ERROR` reply on its own connection, not a
/// teardown: only a malformed frame (caught earlier, in [`crate::net`])
/// warrants dropping the connection outright.
fn send_error(conn: ConnId, error: &DispatchError, routes: &RouteTable, io_handles: &IoHandles) {
    let reply = Packet::new(
        Magic::Response,
        CommandId::Error,
        vec![error.as_wire_code().as_bytes().to_vec(), error.to_string().into_bytes()],
    );
    send_to(conn, IoCommand::Write(conn, encode_packet(&reply)), routes, io_handles);
}

fn count_job_event(command: CommandId) {
    use CommandId::*;
    match command {
        SubmitJob | SubmitJobBg | SubmitJobHigh | SubmitJobHighBg | SubmitJobLow | SubmitJobLowBg => {
            JOBS_SUBMITTED.inc()
        }
        WorkComplete => JOBS_COMPLETED.inc(),
        WorkFail => JOBS_FAILED.inc(),
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_admin(
    server: &mut Server,
    conn: ConnId,
    req: AdminRequest,
    addrs: &AddrTable,
    shared: &Shared,
    routes: &RouteTable,
    io_handles: &IoHandles,
) {
    let reply = match req {
        AdminRequest::Status => {
            let mut out = String::new();
            for f in admin::status(server) {
                out.push_str(&format!("{}\t{}\t{}\t{}\n", f.name, f.queued, f.running, f.workers));
            }
            out.push_str(".\n");
            out
        }
        AdminRequest::Workers => {
            let addrs = addrs.lock().unwrap();
            let mut out = String::new();
            for w in admin::workers(server) {
                let ip = addrs.get(&w.conn).map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
                let client_id = w.client_id.as_deref().unwrap_or("-");
                out.push_str(&format!("{} {} {} : {}\n", w.conn, ip, client_id, w.abilities.join(" ")));
            }
            out.push_str(".\n");
            out
        }
        AdminRequest::MaxQueue { function, size } => {
            admin::set_max_queue(server, &function, size);
            "OK\n".to_string()
        }
        AdminRequest::Shutdown { graceful } => {
            admin::shutdown(server, graceful);
            if graceful {
                shared.shutdown_graceful.store(true, Ordering::SeqCst);
            } else {
                shared.shutdown_immediate.store(true, Ordering::SeqCst);
            }
            "OK\n".to_string()
        }
        AdminRequest::Version => format!("{}\n", env!("CARGO_PKG_VERSION")),
    };
    send_to(conn, IoCommand::Write(conn, reply.into_bytes()), routes, io_handles);
}

fn route_outbound(out: Vec<Outbound>, routes: &RouteTable, io_handles: &IoHandles) {
    for (conn, packet) in out {
        send_to(conn, IoCommand::Write(conn, encode_packet(&packet)), routes, io_handles);
    }
}

fn send_to(conn: ConnId, cmd: IoCommand, routes: &RouteTable, io_handles: &IoHandles) {
    let Some(&thread_idx) = routes.lock().unwrap().get(&conn) else {
        return;
    };
    let Some(handle) = io_handles.get(thread_idx) else {
        return;
    };
    if handle.tx.send(cmd).is_ok() {
        handle.waker.wake().ok();
    }
}
