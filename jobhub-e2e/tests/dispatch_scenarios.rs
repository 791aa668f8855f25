//! End-to-end coverage of the dispatch engine over real loopback TCP
//! sockets, rather than in-process calls into `jobhub_core::dispatch`
//! directly. The harness below is a minimal, single-purpose server loop —
//! it exercises the same `jobhub_core` data model the production binary
//! runs, just without `jobhub-server`'s multi-threaded `mio` scheduling.

use jobhub_core::{dispatch, handle_disconnect, ConnId, Outbound, Server};
use jobhub_proto::{CommandId, Magic, Packet, HEADER_LEN};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: std::net::SocketAddr,
}

impl TestServer {
    fn start() -> Self {
        jobhub_commons::testing::init_logger();
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Mutex::new(Server::new("srv")));
        let streams: Arc<Mutex<HashMap<ConnId, TcpStream>>> = Arc::new(Mutex::new(HashMap::new()));
        thread::spawn(move || accept_loop(listener, server, streams));
        TestServer { addr }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect to test server");
        stream.set_read_timeout(Some(TEST_TIMEOUT)).unwrap();
        stream.set_nodelay(true).ok();
        stream
    }
}

fn accept_loop(
    listener: TcpListener,
    server: Arc<Mutex<Server>>,
    streams: Arc<Mutex<HashMap<ConnId, TcpStream>>>,
) {
    for incoming in listener.incoming() {
        let Ok(stream) = incoming else { continue };
        let server = server.clone();
        let streams = streams.clone();
        thread::spawn(move || connection_loop(stream, server, streams));
    }
}

fn connection_loop(mut stream: TcpStream, server: Arc<Mutex<Server>>, streams: Arc<Mutex<HashMap<ConnId, TcpStream>>>) {
    let conn = server.lock().unwrap().register_connection();
    streams.lock().unwrap().insert(conn, stream.try_clone().expect("clone test stream"));

    loop {
        let Some(packet) = read_packet(&mut stream) else { break };
        let outcome = {
            let mut s = server.lock().unwrap();
            dispatch(&mut s, conn, packet)
        };
        match outcome {
            Ok(out) => route(out, &streams),
            Err(e) => {
                log::warn!("dispatch error from {}: {}", conn, e);
                let error = Packet::new(
                    Magic::Response,
                    CommandId::Error,
                    vec![e.as_wire_code().as_bytes().to_vec(), e.to_string().into_bytes()],
                );
                route(vec![(conn, error)], &streams);
            }
        }
    }

    let out = {
        let mut s = server.lock().unwrap();
        handle_disconnect(&mut s, conn)
    };
    route(out, &streams);
    streams.lock().unwrap().remove(&conn);
}

fn route(out: Vec<Outbound>, streams: &Arc<Mutex<HashMap<ConnId, TcpStream>>>) {
    let mut map = streams.lock().unwrap();
    for (conn, packet) in out {
        if let Some(stream) = map.get_mut(&conn) {
            let _ = stream.write_all(&packet.encode());
        }
    }
}

fn read_packet(stream: &mut TcpStream) -> Option<Packet> {
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).ok()?;
    let (magic, command, body_len) = Packet::decode_header(&header).ok()?;
    let mut body = vec![0u8; body_len as usize];
    stream.read_exact(&mut body).ok()?;
    Packet::decode_body(magic, command, &body).ok()
}

fn send(stream: &mut TcpStream, command: CommandId, args: Vec<&[u8]>) {
    let packet = Packet::new(Magic::Request, command, args.into_iter().map(|a| a.to_vec()).collect());
    stream.write_all(&packet.encode()).expect("write packet");
}

fn recv(stream: &mut TcpStream) -> Packet {
    read_packet(stream).expect("expected a reply before the test timeout")
}

fn assert_silent(stream: &mut TcpStream) {
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut byte = [0u8; 1];
    let err = stream
        .read(&mut byte)
        .expect_err("connection should not have received anything");
    assert!(matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut));
    stream.set_read_timeout(Some(TEST_TIMEOUT)).unwrap();
}

/// (a) Submit and complete: a worker already sleeping on `reverse` is
/// woken, grabs the job, and its completion reaches the watching client.
#[test]
fn submit_and_complete() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"reverse"]);
    send(&mut worker, CommandId::PreSleep, vec![]);

    send(&mut client, CommandId::SubmitJob, vec![b"reverse", b"", b"dog"]);
    let created = recv(&mut client);
    assert_eq!(created.command, CommandId::JobCreated);
    let handle = created.args[0].clone();
    assert_eq!(handle, b"H:srv:1");

    let noop = recv(&mut worker);
    assert_eq!(noop.command, CommandId::Noop);

    send(&mut worker, CommandId::GrabJob, vec![]);
    let assigned = recv(&mut worker);
    assert_eq!(assigned.command, CommandId::JobAssign);
    assert_eq!(assigned.args[0], handle);
    assert_eq!(assigned.args[1], b"reverse");
    assert_eq!(assigned.args[2], b"dog");

    send(&mut worker, CommandId::WorkComplete, vec![&handle, b"god"]);
    let completed = recv(&mut client);
    assert_eq!(completed.command, CommandId::WorkComplete);
    assert_eq!(completed.args[0], handle);
    assert_eq!(completed.args[1], b"god");
}

/// (b) Background jobs: the submitting client gets `JOB_CREATED` and
/// nothing else, even once the worker completes the job.
#[test]
fn background_job_sends_no_completion() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"email"]);
    send(&mut client, CommandId::SubmitJobBg, vec![b"email", b"", b"payload"]);
    let created = recv(&mut client);
    assert_eq!(created.command, CommandId::JobCreated);
    let handle = created.args[0].clone();

    send(&mut worker, CommandId::GrabJob, vec![]);
    let assigned = recv(&mut worker);
    assert_eq!(assigned.command, CommandId::JobAssign);

    send(&mut worker, CommandId::WorkComplete, vec![&handle, b"sent"]);
    assert_silent(&mut client);
}

/// (c) A submission with no function name is rejected with `ERROR` and
/// creates no job — confirmed by a following `GET_STATUS` reporting the
/// handle as unknown.
#[test]
fn invalid_submission_is_rejected() {
    let server = TestServer::start();
    let mut client = server.connect();

    send(&mut client, CommandId::SubmitJob, vec![b"", b"", b"payload"]);
    let reply = recv(&mut client);
    assert_eq!(reply.command, CommandId::Error);
    assert_eq!(reply.args[0], b"invalid-argument");

    send(&mut client, CommandId::GetStatus, vec![b"H:srv:1"]);
    let status = recv(&mut client);
    assert_eq!(status.args[1], b"0", "no job should have been created");
}

/// (d) A worker's `WORK_FAIL` reaches the watching client as the job's
/// terminal outcome.
#[test]
fn work_fail_propagates_to_client() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"risky"]);
    send(&mut client, CommandId::SubmitJob, vec![b"risky", b"", b"x"]);
    let handle = recv(&mut client).args[0].clone();

    send(&mut worker, CommandId::GrabJob, vec![]);
    recv(&mut worker);

    send(&mut worker, CommandId::WorkFail, vec![&handle]);
    let failed = recv(&mut client);
    assert_eq!(failed.command, CommandId::WorkFail);
    assert_eq!(failed.args[0], handle);
}

/// (e) A worker that grabs a job and disconnects without completing it
/// yields that same handle to the next worker's `GRAB_JOB`.
#[test]
fn crashed_worker_requeues_job_for_next_worker() {
    let server = TestServer::start();
    let mut worker_a = server.connect();
    let mut client = server.connect();

    send(&mut worker_a, CommandId::CanDo, vec![b"f"]);
    send(&mut client, CommandId::SubmitJob, vec![b"f", b"", b"x"]);
    let handle = recv(&mut client).args[0].clone();

    send(&mut worker_a, CommandId::GrabJob, vec![]);
    let assigned = recv(&mut worker_a);
    assert_eq!(assigned.args[0], handle);

    drop(worker_a);
    thread::sleep(Duration::from_millis(200));

    let mut worker_b = server.connect();
    send(&mut worker_b, CommandId::CanDo, vec![b"f"]);
    send(&mut worker_b, CommandId::GrabJob, vec![]);
    let reassigned = recv(&mut worker_b);
    assert_eq!(reassigned.command, CommandId::JobAssign);
    assert_eq!(reassigned.args[0], handle);
}

/// (f) Strict priority ordering: jobs submitted low, normal, high, normal
/// are grabbed high-first, then FIFO within each remaining tier.
#[test]
fn priority_ordering_across_tiers() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"f"]);

    send(&mut client, CommandId::SubmitJobLow, vec![b"f", b"", b"low-a"]);
    recv(&mut client);
    send(&mut client, CommandId::SubmitJob, vec![b"f", b"", b"normal-b"]);
    recv(&mut client);
    send(&mut client, CommandId::SubmitJobHigh, vec![b"f", b"", b"high-c"]);
    recv(&mut client);
    send(&mut client, CommandId::SubmitJob, vec![b"f", b"", b"normal-d"]);
    recv(&mut client);

    let mut order = Vec::new();
    for _ in 0..4 {
        send(&mut worker, CommandId::GrabJob, vec![]);
        let assigned = recv(&mut worker);
        order.push(String::from_utf8(assigned.args[2].clone()).unwrap());
    }
    assert_eq!(order, vec!["high-c", "normal-b", "normal-d", "low-a"]);
}

/// (g) `WORK_EXCEPTION` only reaches a client that opted in with
/// `OPTION_REQ("exceptions")`; a client that never sent it hears nothing.
#[test]
fn work_exception_requires_option_req() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut silent_client = server.connect();
    let mut opted_client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"flaky"]);

    send(&mut silent_client, CommandId::SubmitJob, vec![b"flaky", b"", b"a"]);
    let handle_a = recv(&mut silent_client).args[0].clone();
    send(&mut worker, CommandId::GrabJob, vec![]);
    recv(&mut worker);
    send(&mut worker, CommandId::WorkException, vec![&handle_a, b"boom"]);
    assert_silent(&mut silent_client);

    send(&mut opted_client, CommandId::OptionReq, vec![b"exceptions"]);
    let opt_res = recv(&mut opted_client);
    assert_eq!(opt_res.command, CommandId::OptionRes);

    send(&mut opted_client, CommandId::SubmitJob, vec![b"flaky", b"", b"b"]);
    let handle_b = recv(&mut opted_client).args[0].clone();
    send(&mut worker, CommandId::GrabJob, vec![]);
    recv(&mut worker);
    send(&mut worker, CommandId::WorkException, vec![&handle_b, b"boom"]);
    let exception = recv(&mut opted_client);
    assert_eq!(exception.command, CommandId::WorkException);
    assert_eq!(exception.args[0], handle_b);
}

/// An `OPTION_REQ` for anything other than `exceptions` is rejected.
#[test]
fn option_req_rejects_unknown_option() {
    let server = TestServer::start();
    let mut client = server.connect();

    send(&mut client, CommandId::OptionReq, vec![b"nonsense"]);
    let reply = recv(&mut client);
    assert_eq!(reply.command, CommandId::Error);
    assert_eq!(reply.args[0], b"invalid-argument");
}

/// (h) A client that submitted a foreground job and disconnects before any
/// worker grabs it leaves the job cancelled, not merely un-watched: a
/// subsequently registered worker sees `NO_JOB`, not the stale submission.
#[test]
fn client_disconnect_cancels_still_queued_job() {
    let server = TestServer::start();
    let mut client = server.connect();

    send(&mut client, CommandId::SubmitJob, vec![b"orphaned", b"", b"x"]);
    recv(&mut client);
    drop(client);
    thread::sleep(Duration::from_millis(200));

    let mut worker = server.connect();
    send(&mut worker, CommandId::CanDo, vec![b"orphaned"]);
    send(&mut worker, CommandId::GrabJob, vec![]);
    let reply = recv(&mut worker);
    assert_eq!(reply.command, CommandId::NoJob);
}

/// A client disconnecting while its job is already running only drops it as
/// a watcher; the worker keeps the job rather than having it cancelled out
/// from under it.
#[test]
fn client_disconnect_orphans_running_job() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"running"]);
    send(&mut client, CommandId::SubmitJob, vec![b"running", b"", b"x"]);
    let handle = recv(&mut client).args[0].clone();

    send(&mut worker, CommandId::GrabJob, vec![]);
    recv(&mut worker);

    drop(client);
    thread::sleep(Duration::from_millis(200));

    send(&mut worker, CommandId::WorkComplete, vec![&handle, b"done"]);
    thread::sleep(Duration::from_millis(100));
}

/// (i) A worker parked on two functions receives at most one `NOOP` when a
/// submission burst lands work on both functions before it wakes.
#[test]
fn worker_parked_on_two_functions_gets_one_noop() {
    let server = TestServer::start();
    let mut worker = server.connect();
    let mut client = server.connect();

    send(&mut worker, CommandId::CanDo, vec![b"f1"]);
    send(&mut worker, CommandId::CanDo, vec![b"f2"]);
    send(&mut worker, CommandId::PreSleep, vec![]);

    send(&mut client, CommandId::SubmitJob, vec![b"f1", b"", b"x"]);
    recv(&mut client);
    send(&mut client, CommandId::SubmitJob, vec![b"f2", b"", b"y"]);
    recv(&mut client);

    let noop = recv(&mut worker);
    assert_eq!(noop.command, CommandId::Noop);
    assert_silent(&mut worker);

    send(&mut worker, CommandId::GrabJob, vec![]);
    let first = recv(&mut worker);
    assert_eq!(first.command, CommandId::JobAssign);

    send(&mut worker, CommandId::GrabJob, vec![]);
    let second = recv(&mut worker);
    assert_eq!(second.command, CommandId::JobAssign);
}
