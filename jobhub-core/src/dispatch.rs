//! Command dispatch: turns one inbound [`Packet`] (or a connection's death)
//! into the mutations it makes to the [`Server`] data model, and the
//! outbound packets those mutations imply.

use crate::connection::ConnRole;
use crate::error::DispatchError;
use crate::ids::{ConnId, JobId, Priority};
use crate::job::Job;
use crate::server::{Server, ShutdownMode};
use jobhub_proto::{CommandId, Magic, Packet};
use std::time::{Duration, Instant};

/// An outbound packet addressed to a specific connection. The caller (the
/// I/O layer) is responsible for actually writing it to that connection's
/// socket.
pub type Outbound = (ConnId, Packet);

fn send(to: ConnId, command: CommandId, args: Vec<Vec<u8>>) -> Outbound {
    (to, Packet::new(Magic::Response, command, args))
}

fn arg(args: &[Vec<u8>], i: usize) -> &[u8] {
    args.get(i).map(Vec::as_slice).unwrap_or(b"")
}

fn arg_str(args: &[Vec<u8>], i: usize) -> String {
    String::from_utf8_lossy(arg(args, i)).into_owned()
}

/// Apply one inbound packet from `from` to `server`, returning every
/// outbound packet the change produces (an acknowledgement to the sender,
/// a wake-up `NOOP` to a sleeping worker, a forwarded `WORK_*` update to a
/// watching client, and so on).
pub fn dispatch(
    server: &mut Server,
    from: ConnId,
    packet: Packet,
) -> Result<Vec<Outbound>, DispatchError> {
    use CommandId::*;
    match packet.command {
        SubmitJob => submit_job(server, from, packet.args, Priority::Normal, false),
        SubmitJobBg => submit_job(server, from, packet.args, Priority::Normal, true),
        SubmitJobHigh => submit_job(server, from, packet.args, Priority::High, false),
        SubmitJobHighBg => submit_job(server, from, packet.args, Priority::High, true),
        SubmitJobLow => submit_job(server, from, packet.args, Priority::Low, false),
        SubmitJobLowBg => submit_job(server, from, packet.args, Priority::Low, true),
        GetStatus => get_status(server, from, packet.args),
        EchoReq => Ok(vec![send(from, EchoRes, packet.args)]),
        OptionReq => option_req(server, from, packet.args),

        CanDo => can_do(server, from, packet.args, None),
        CanDoTimeout => {
            let secs: u64 = arg_str(&packet.args, 1).parse().unwrap_or(0);
            can_do(
                server,
                from,
                vec![arg(&packet.args, 0).to_vec()],
                Some(Duration::from_secs(secs)),
            )
        }
        CantDo => cant_do(server, from, packet.args),
        ResetAbilities => reset_abilities(server, from),
        SetClientId => set_client_id(server, from, packet.args),
        PreSleep => pre_sleep(server, from),
        GrabJob => grab_job(server, from, false),
        GrabJobUniq => grab_job(server, from, true),

        WorkStatus => forward_work_update(server, from, packet.args, WorkStatus, false),
        WorkData => forward_work_update(server, from, packet.args, WorkData, false),
        WorkWarning => forward_work_update(server, from, packet.args, WorkWarning, false),
        WorkException => forward_work_update(server, from, packet.args, WorkException, false),
        WorkComplete => forward_work_update(server, from, packet.args, WorkComplete, true),
        WorkFail => forward_work_update(server, from, packet.args, WorkFail, true),

        Noop | AllYours | JobCreated | NoJob | JobAssign | JobAssignUniq | Error | StatusRes
        | EchoRes | OptionRes => Ok(vec![]),
    }
}

fn submit_job(
    server: &mut Server,
    from: ConnId,
    args: Vec<Vec<u8>>,
    priority: Priority,
    background: bool,
) -> Result<Vec<Outbound>, DispatchError> {
    if server.shutdown == ShutdownMode::Graceful {
        return Err(DispatchError::ShuttingDown);
    }
    let function = arg_str(&args, 0);
    if function.is_empty() {
        return Err(DispatchError::InvalidArgument);
    }
    let unique = arg_str(&args, 1);
    let workload = arg(&args, 2).to_vec();

    let (job_id, handle) = server.next_handle();
    let watcher = if background { None } else { Some(from) };
    let job = Job::new(
        job_id,
        handle.clone(),
        function.clone(),
        unique,
        priority,
        workload,
        background,
        watcher,
    );

    let wakeup_count = server.worker_wakeup_count;
    if !server.functions.entry(&function).enqueue(priority, job_id) {
        return Err(DispatchError::QueueFull(function));
    }
    let woken = wake_sleeping_workers(server, &function, wakeup_count);

    if !background {
        let conn = server
            .connections
            .get_mut(&from)
            .ok_or(DispatchError::WrongRole(from))?;
        conn.as_client_mut()
            .ok_or(DispatchError::WrongRole(from))?
            .watching
            .insert(job_id);
    }
    server.insert_job(job);

    let mut out = vec![send(from, CommandId::JobCreated, vec![handle.into_bytes()])];
    out.extend(woken.into_iter().map(|worker| send(worker, CommandId::Noop, vec![])));
    Ok(out)
}

/// Wake up to `count` workers sleeping on `function`, skipping any that
/// already have a `NOOP` in flight so a worker parked on several functions
/// never receives more than one per wake. Returns the connections that
/// should actually be sent a `NOOP`.
fn wake_sleeping_workers(server: &mut Server, function: &str, count: usize) -> Vec<ConnId> {
    let mut woken = Vec::with_capacity(count);
    while woken.len() < count {
        let Some(entry) = server.functions.get_mut(function) else {
            break;
        };
        let Some(worker) = entry.sleeping.pop_front() else {
            break;
        };
        let already_queued = server
            .connections
            .get(&worker)
            .and_then(|c| c.worker())
            .map_or(true, |w| w.noop_queued);
        if already_queued {
            continue;
        }
        if let Some(conn) = server.connections.get_mut(&worker) {
            if let Some(state) = conn.as_worker_mut() {
                state.noop_queued = true;
            }
        }
        woken.push(worker);
    }
    woken
}

fn option_req(
    server: &mut Server,
    from: ConnId,
    args: Vec<Vec<u8>>,
) -> Result<Vec<Outbound>, DispatchError> {
    let option = arg_str(&args, 0);
    if option != "exceptions" {
        return Err(DispatchError::InvalidArgument);
    }
    let conn = server
        .connections
        .get_mut(&from)
        .ok_or(DispatchError::WrongRole(from))?;
    conn.as_client_mut()
        .ok_or(DispatchError::WrongRole(from))?
        .exceptions = true;
    Ok(vec![send(from, CommandId::OptionRes, args)])
}

fn get_status(
    server: &mut Server,
    from: ConnId,
    args: Vec<Vec<u8>>,
) -> Result<Vec<Outbound>, DispatchError> {
    let handle = arg_str(&args, 0);
    let reply = match server.handles.get(&handle).and_then(|id| server.jobs.get(id)) {
        Some(job) => vec![
            handle.into_bytes(),
            b"1".to_vec(),
            if job.owner.is_some() { b"1".to_vec() } else { b"0".to_vec() },
            job.progress.0.to_string().into_bytes(),
            job.progress.1.to_string().into_bytes(),
        ],
        None => vec![
            handle.into_bytes(),
            b"0".to_vec(),
            b"0".to_vec(),
            b"0".to_vec(),
            b"0".to_vec(),
        ],
    };
    Ok(vec![send(from, CommandId::StatusRes, reply)])
}

fn can_do(
    server: &mut Server,
    from: ConnId,
    args: Vec<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<Vec<Outbound>, DispatchError> {
    let function = arg_str(&args, 0);
    if function.is_empty() {
        return Err(DispatchError::InvalidArgument);
    }
    let conn = server
        .connections
        .get_mut(&from)
        .ok_or(DispatchError::WrongRole(from))?;
    conn.as_worker_mut()
        .ok_or(DispatchError::WrongRole(from))?
        .add_ability(function.clone(), timeout);
    server.functions.entry(&function).capable_workers.insert(from);
    Ok(vec![])
}

fn cant_do(server: &mut Server, from: ConnId, args: Vec<Vec<u8>>) -> Result<Vec<Outbound>, DispatchError> {
    let function = arg_str(&args, 0);
    if let Some(conn) = server.connections.get_mut(&from) {
        if let ConnRole::Worker(state) = &mut conn.role {
            state.remove_ability(&function);
        }
    }
    if let Some(entry) = server.functions.get_mut(&function) {
        entry.capable_workers.remove(&from);
        entry.sleeping.retain(|&c| c != from);
    }
    server.functions.prune_if_empty(&function);
    Ok(vec![])
}

fn reset_abilities(server: &mut Server, from: ConnId) -> Result<Vec<Outbound>, DispatchError> {
    let functions = server
        .connections
        .get(&from)
        .and_then(|c| c.worker())
        .map(|w| w.abilities.clone())
        .unwrap_or_default();
    for function in &functions {
        if let Some(entry) = server.functions.get_mut(function) {
            entry.capable_workers.remove(&from);
            entry.sleeping.retain(|&c| c != from);
        }
        server.functions.prune_if_empty(function);
    }
    if let Some(conn) = server.connections.get_mut(&from) {
        if let ConnRole::Worker(state) = &mut conn.role {
            state.reset_abilities();
        }
    }
    Ok(vec![])
}

fn set_client_id(server: &mut Server, from: ConnId, args: Vec<Vec<u8>>) -> Result<Vec<Outbound>, DispatchError> {
    let id = arg_str(&args, 0);
    let conn = server
        .connections
        .get_mut(&from)
        .ok_or(DispatchError::WrongRole(from))?;
    conn.as_worker_mut()
        .ok_or(DispatchError::WrongRole(from))?
        .client_id = Some(id);
    Ok(vec![])
}

fn pre_sleep(server: &mut Server, from: ConnId) -> Result<Vec<Outbound>, DispatchError> {
    let abilities = server
        .connections
        .get(&from)
        .and_then(|c| c.worker())
        .map(|w| w.abilities.clone())
        .unwrap_or_default();

    let has_work_waiting = abilities
        .iter()
        .any(|f| server.functions.get(f).map_or(false, |e| e.queued_count() > 0));

    if has_work_waiting {
        // Work is already available: wake the worker immediately instead
        // of parking it, matching the `NOOP`-coalesced wake contract.
        let already_queued = server
            .connections
            .get(&from)
            .and_then(|c| c.worker())
            .map_or(true, |w| w.noop_queued);
        if already_queued {
            return Ok(vec![]);
        }
        if let Some(conn) = server.connections.get_mut(&from) {
            if let Some(state) = conn.as_worker_mut() {
                state.noop_queued = true;
            }
        }
        return Ok(vec![send(from, CommandId::Noop, vec![])]);
    }

    for function in &abilities {
        let entry = server.functions.entry(function);
        if !entry.sleeping.contains(&from) {
            entry.sleeping.push_back(from);
        }
    }
    Ok(vec![])
}

fn grab_job(server: &mut Server, from: ConnId, uniq: bool) -> Result<Vec<Outbound>, DispatchError> {
    let abilities = server
        .connections
        .get(&from)
        .and_then(|c| c.worker())
        .map(|w| w.abilities.clone())
        .unwrap_or_default();

    if let Some(conn) = server.connections.get_mut(&from) {
        if let Some(state) = conn.as_worker_mut() {
            state.noop_queued = false;
        }
    }

    for function in &abilities {
        let Some(entry) = server.functions.get_mut(function) else {
            continue;
        };
        entry.sleeping.retain(|&c| c != from);
        if let Some(job_id) = entry.dequeue_next() {
            let job = server.jobs.get_mut(&job_id).expect("queued job must exist");
            job.owner = Some(from);
            job.assigned_at = Some(Instant::now());
            if let Some(conn) = server.connections.get_mut(&from) {
                if let Some(state) = conn.as_worker_mut() {
                    state.assigned.insert(job_id);
                }
            }

            let reply = if uniq {
                send(
                    from,
                    CommandId::JobAssignUniq,
                    vec![
                        job.handle.clone().into_bytes(),
                        job.function.clone().into_bytes(),
                        job.unique.clone().into_bytes(),
                        job.workload.clone(),
                    ],
                )
            } else {
                send(
                    from,
                    CommandId::JobAssign,
                    vec![
                        job.handle.clone().into_bytes(),
                        job.function.clone().into_bytes(),
                        job.workload.clone(),
                    ],
                )
            };
            return Ok(vec![reply]);
        }
    }
    Ok(vec![send(from, CommandId::NoJob, vec![])])
}

fn forward_work_update(
    server: &mut Server,
    from: ConnId,
    args: Vec<Vec<u8>>,
    command: CommandId,
    terminal: bool,
) -> Result<Vec<Outbound>, DispatchError> {
    let handle = arg_str(&args, 0);
    let Some(&job_id) = server.handles.get(&handle) else {
        return Err(DispatchError::UnknownJob(handle));
    };

    let worker_owns = server
        .jobs
        .get(&job_id)
        .map_or(false, |j| j.owner == Some(from));
    if !worker_owns {
        return Err(DispatchError::WrongRole(from));
    }

    if command == CommandId::WorkStatus {
        let numerator: u32 = arg_str(&args, 1).parse().unwrap_or(0);
        let denominator: u32 = arg_str(&args, 2).parse().unwrap_or(0);
        if let Some(job) = server.jobs.get_mut(&job_id) {
            job.progress = (numerator, denominator);
        }
    }

    let clients = server
        .jobs
        .get(&job_id)
        .map(|j| j.clients.clone())
        .unwrap_or_default();
    let mut out: Vec<Outbound> = clients
        .into_iter()
        .filter(|&c| {
            // WORK_EXCEPTION only reaches clients that opted in via
            // OPTION_REQ("exceptions"); every other WORK_* update is
            // unconditional.
            command != CommandId::WorkException
                || server
                    .connections
                    .get(&c)
                    .and_then(|conn| conn.client())
                    .map_or(false, |state| state.exceptions)
        })
        .map(|c| send(c, command, args.clone()))
        .collect();

    if terminal {
        if let Some(conn) = server.connections.get_mut(&from) {
            if let ConnRole::Worker(state) = &mut conn.role {
                state.assigned.remove(&job_id);
            }
        }
        server.remove_job(job_id);
    }
    Ok(out)
}

/// Tear down a connection that the I/O layer has reported closed: requeue
/// any jobs a dead worker held (at the head of their queue, so
/// already-waiting submissions are not starved), forget its abilities, and
/// drop it from every client watch list.
pub fn handle_disconnect(server: &mut Server, conn: ConnId) -> Vec<Outbound> {
    let mut out = Vec::new();

    let assigned: Vec<JobId> = server
        .connections
        .get(&conn)
        .and_then(|c| c.worker())
        .map(|w| w.assigned.iter().copied().collect())
        .unwrap_or_default();

    for job_id in assigned {
        let reassigned = server.jobs.get_mut(&job_id).map(|job| {
            job.owner = None;
            job.assigned_at = None;
            (job.function.clone(), job.priority)
        });
        if let Some((function, priority)) = reassigned {
            server.functions.entry(&function).requeue_at_head(priority, job_id);
            let woken = wake_sleeping_workers(server, &function, 1);
            out.extend(woken.into_iter().map(|worker| send(worker, CommandId::Noop, vec![])));
        }
    }

    let touched = server.functions.forget_connection(conn);
    for function in touched {
        server.functions.prune_if_empty(&function);
    }

    // Jobs this connection was watching as a client: queued jobs it owns
    // are cancelled outright, running jobs are simply orphaned (the worker
    // still holds them but nothing is left to report their outcome to).
    let watching: Vec<JobId> = server
        .connections
        .get(&conn)
        .and_then(|c| match &c.role {
            ConnRole::Client(state) => Some(state.watching.iter().copied().collect()),
            _ => None,
        })
        .unwrap_or_default();
    for job_id in watching {
        let Some(job) = server.jobs.get(&job_id) else {
            continue;
        };
        if job.owner.is_none() {
            let (function, priority) = (job.function.clone(), job.priority);
            if let Some(entry) = server.functions.get_mut(&function) {
                entry.remove_queued(priority, job_id);
                server.functions.prune_if_empty(&function);
            }
            server.remove_job(job_id);
        } else if let Some(job) = server.jobs.get_mut(&job_id) {
            job.clients.retain(|&c| c != conn);
        }
    }

    server.connections.remove(&conn);
    out
}

/// Connections holding at least one job past its `CAN_DO_TIMEOUT` deadline,
/// as of `now`. The dispatcher treats each returned connection exactly like
/// an I/O-reported disconnect.
pub fn overdue_workers(server: &Server, now: Instant) -> Vec<ConnId> {
    let mut overdue = Vec::new();
    for job in server.jobs.values() {
        let Some(owner) = job.owner else { continue };
        let Some(assigned_at) = job.assigned_at else { continue };
        let Some(timeout) = server
            .connections
            .get(&owner)
            .and_then(|c| c.worker())
            .and_then(|w| w.timeouts.get(&job.function))
        else {
            continue;
        };
        if now.saturating_duration_since(assigned_at) >= *timeout {
            overdue.push(owner);
        }
    }
    overdue.sort_unstable();
    overdue.dedup();
    overdue
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_proto::Magic;

    fn req(command: CommandId, args: Vec<&[u8]>) -> Packet {
        Packet::new(
            Magic::Request,
            command,
            args.into_iter().map(|a| a.to_vec()).collect(),
        )
    }

    #[test]
    fn submit_then_grab_then_complete() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker = server.register_connection();

        let out = dispatch(
            &mut server,
            worker,
            req(CommandId::CanDo, vec![b"reverse"]),
        )
        .unwrap();
        assert!(out.is_empty());

        let out = dispatch(
            &mut server,
            client,
            req(CommandId::SubmitJob, vec![b"reverse", b"", b"hello"]),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, client);
        assert_eq!(out[0].1.command, CommandId::JobCreated);
        let handle = out[0].1.args[0].clone();

        let out = dispatch(&mut server, worker, req(CommandId::GrabJob, vec![])).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.command, CommandId::JobAssign);
        assert_eq!(out[0].1.args[0], handle);
        assert_eq!(out[0].1.args[2], b"hello");

        let out = dispatch(
            &mut server,
            worker,
            req(CommandId::WorkComplete, vec![&handle, b"olleh"]),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, client);
        assert_eq!(out[0].1.command, CommandId::WorkComplete);
        assert!(server.jobs.is_empty());
    }

    #[test]
    fn submit_wakes_sleeping_worker() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker = server.register_connection();
        dispatch(&mut server, worker, req(CommandId::CanDo, vec![b"reverse"])).unwrap();
        dispatch(&mut server, worker, req(CommandId::PreSleep, vec![])).unwrap();

        let out = dispatch(
            &mut server,
            client,
            req(CommandId::SubmitJob, vec![b"reverse", b"", b"x"]),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|(to, p)| *to == worker && p.command == CommandId::Noop));
    }

    #[test]
    fn priority_jobs_jump_the_queue() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker = server.register_connection();
        dispatch(&mut server, worker, req(CommandId::CanDo, vec![b"f"])).unwrap();

        dispatch(&mut server, client, req(CommandId::SubmitJob, vec![b"f", b"", b"normal"])).unwrap();
        dispatch(
            &mut server,
            client,
            req(CommandId::SubmitJobHigh, vec![b"f", b"", b"high"]),
        )
        .unwrap();

        let out = dispatch(&mut server, worker, req(CommandId::GrabJob, vec![])).unwrap();
        assert_eq!(out[0].1.args[2], b"high");
    }

    #[test]
    fn worker_disconnect_requeues_at_head() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker_a = server.register_connection();
        let worker_b = server.register_connection();
        dispatch(&mut server, worker_a, req(CommandId::CanDo, vec![b"f"])).unwrap();
        dispatch(&mut server, worker_b, req(CommandId::CanDo, vec![b"f"])).unwrap();

        dispatch(&mut server, client, req(CommandId::SubmitJob, vec![b"f", b"", b"first"])).unwrap();
        dispatch(&mut server, client, req(CommandId::SubmitJob, vec![b"f", b"", b"second"])).unwrap();

        let out = dispatch(&mut server, worker_a, req(CommandId::GrabJob, vec![])).unwrap();
        assert_eq!(out[0].1.args[2], b"first");

        handle_disconnect(&mut server, worker_a);

        let out = dispatch(&mut server, worker_b, req(CommandId::GrabJob, vec![])).unwrap();
        assert_eq!(out[0].1.args[2], b"first");
    }

    #[test]
    fn get_status_reports_unknown_for_missing_handle() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let out = dispatch(
            &mut server,
            client,
            req(CommandId::GetStatus, vec![b"H:nope:1"]),
        )
        .unwrap();
        assert_eq!(out[0].1.args[1], b"0");
    }

    #[test]
    fn option_req_unknown_option_is_rejected() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let err = dispatch(&mut server, client, req(CommandId::OptionReq, vec![b"bogus"])).unwrap_err();
        assert_eq!(err, DispatchError::InvalidArgument);
    }

    #[test]
    fn work_exception_requires_option_req() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker = server.register_connection();
        dispatch(&mut server, worker, req(CommandId::CanDo, vec![b"flaky"])).unwrap();
        let handle = dispatch(
            &mut server,
            client,
            req(CommandId::SubmitJob, vec![b"flaky", b"", b"x"]),
        )
        .unwrap()[0]
            .1
            .args[0]
            .clone();
        dispatch(&mut server, worker, req(CommandId::GrabJob, vec![])).unwrap();

        let out = dispatch(
            &mut server,
            worker,
            req(CommandId::WorkException, vec![&handle, b"boom"]),
        )
        .unwrap();
        assert!(out.is_empty(), "client never opted in via OPTION_REQ");

        dispatch(&mut server, client, req(CommandId::OptionReq, vec![b"exceptions"])).unwrap();
        let out = dispatch(
            &mut server,
            worker,
            req(CommandId::WorkException, vec![&handle, b"boom"]),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.command, CommandId::WorkException);
    }

    #[test]
    fn disconnect_cancels_queued_job_but_orphans_running_job() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker = server.register_connection();
        dispatch(&mut server, worker, req(CommandId::CanDo, vec![b"f"])).unwrap();

        // Submitted then immediately grabbed: becomes running.
        dispatch(&mut server, client, req(CommandId::SubmitJob, vec![b"f", b"", b"running"])).unwrap();
        let running_handle = dispatch(&mut server, worker, req(CommandId::GrabJob, vec![])).unwrap()[0]
            .1
            .args[0]
            .clone();
        // Submitted while the only worker is already busy: stays queued.
        dispatch(&mut server, client, req(CommandId::SubmitJob, vec![b"f", b"", b"queued"])).unwrap();

        handle_disconnect(&mut server, client);

        // The queued job was cancelled outright.
        assert_eq!(server.jobs.len(), 1);
        assert!(server.jobs.values().all(|j| j.owner.is_some()));

        // The running job survives and still completes normally, even
        // though its client is gone (nobody is left to hear about it).
        let out = dispatch(
            &mut server,
            worker,
            req(CommandId::WorkComplete, vec![&running_handle, b"done"]),
        )
        .unwrap();
        assert!(out.is_empty());
        assert!(server.jobs.is_empty());
    }

    #[test]
    fn overdue_worker_is_detected_past_its_timeout() {
        let mut server = Server::new("test-host");
        let client = server.register_connection();
        let worker = server.register_connection();
        dispatch(
            &mut server,
            worker,
            req(CommandId::CanDoTimeout, vec![b"f", b"0"]),
        )
        .unwrap();
        dispatch(&mut server, client, req(CommandId::SubmitJob, vec![b"f", b"", b"x"])).unwrap();
        dispatch(&mut server, worker, req(CommandId::GrabJob, vec![])).unwrap();

        let overdue = overdue_workers(&server, Instant::now() + Duration::from_millis(1));
        assert_eq!(overdue, vec![worker]);
    }
}
