//! One I/O thread: a single-threaded `mio` event loop owning a slice of the
//! server's live sockets. Decoded units are handed to the dispatcher via
//! [`Shared::push_ready`]; this thread touches [`jobhub_core::Server`] only
//! to register a new connection and to report one that died.
//!
//! Grounded on the `mio::Poll` + `mio::Waker` + `crossbeam_channel` control
//! loop: every socket gets its own token, a dedicated control token carries
//! cross-thread commands, and a `Waker` pulls the loop out of a blocking
//! poll whenever the acceptor or the dispatcher has something for it.

use crate::metrics::CONNECTIONS;
use crate::net::FrameReader;
use crate::shared::{AddrTable, IoCommand, IoHandles, RouteTable, Shared};
use jobhub_core::ConnId;
use mio::net::TcpStream as MioTcpStream;
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::TcpStream as StdTcpStream;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const CONTROL_TOKEN: Token = Token(usize::MAX);
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

struct ConnIo {
    conn: ConnId,
    stream: MioTcpStream,
    reader: FrameReader,
    outbound: Vec<u8>,
    write_interest: bool,
}

/// Run one I/O thread to completion on the calling thread. Creates its own
/// `Poll` and `Waker`, hands the waker back through `waker_tx` so the
/// spawner can publish it (paired with a clone of this thread's own control
/// sender) to the dispatcher's [`crate::shared::IoHandles`] table before
/// this thread processes its first control message.
///
/// `self_tx` is a clone of this thread's own control-channel sender, used
/// only when `inline_dispatch` is set: the collapsed single-threaded mode
/// has no separate dispatcher thread, so this loop must be able to route
/// its own dispatch output back to itself the same way a real dispatcher
/// thread would route it to a remote I/O thread.
#[allow(clippy::too_many_arguments)]
pub fn run(
    thread_idx: usize,
    shared: Arc<Shared>,
    routes: RouteTable,
    addrs: AddrTable,
    self_tx: crossbeam_channel::Sender<IoCommand>,
    max_frame_bytes: u32,
    rx: crossbeam_channel::Receiver<IoCommand>,
    waker_tx: std::sync::mpsc::Sender<Arc<Waker>>,
    inline_dispatch: bool,
) -> io::Result<()> {
    let mut poll = Poll::new()?;
    let waker = Arc::new(Waker::new(poll.registry(), CONTROL_TOKEN)?);
    let _ = waker_tx.send(waker.clone());
    let self_handles: IoHandles = Arc::new(vec![crate::shared::IoHandle { tx: self_tx, waker }]);

    let mut conns: HashMap<Token, ConnIo> = HashMap::new();
    let mut tokens: HashMap<ConnId, Token> = HashMap::new();
    let mut next_token = 0usize;
    let mut events = Events::with_capacity(256);

    loop {
        if shared.shutdown_immediate.load(Ordering::SeqCst) {
            return Ok(());
        }
        match poll.poll(&mut events, Some(POLL_TIMEOUT)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }

        for event in events.iter() {
            if event.token() == CONTROL_TOKEN {
                drain_control(
                    &rx,
                    &shared,
                    &routes,
                    &addrs,
                    thread_idx,
                    max_frame_bytes,
                    &mut poll,
                    &mut conns,
                    &mut tokens,
                    &mut next_token,
                );
                continue;
            }
            let token = event.token();
            let mut dead = false;
            if event.is_readable() {
                dead |= handle_readable(token, &mut conns, &shared);
            }
            if !dead && event.is_writable() {
                dead |= handle_writable(&mut poll, token, &mut conns);
            }
            if dead {
                teardown(&mut poll, token, &mut conns, &mut tokens, &routes, &addrs, &shared);
            }
        }

        if inline_dispatch {
            crate::dispatcher::drain_once(&shared, &routes, &addrs, &self_handles);
        }

        if shared.shutdown_graceful.load(Ordering::SeqCst) && shared.server.lock().unwrap().is_drained() {
            return Ok(());
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn drain_control(
    rx: &crossbeam_channel::Receiver<IoCommand>,
    shared: &Arc<Shared>,
    routes: &RouteTable,
    addrs: &AddrTable,
    thread_idx: usize,
    max_frame_bytes: u32,
    poll: &mut Poll,
    conns: &mut HashMap<Token, ConnIo>,
    tokens: &mut HashMap<ConnId, Token>,
    next_token: &mut usize,
) {
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            IoCommand::NewConn(std_stream) => register_new_conn(
                std_stream,
                shared,
                routes,
                addrs,
                thread_idx,
                max_frame_bytes,
                poll,
                conns,
                tokens,
                next_token,
            ),
            IoCommand::Write(conn, bytes) => {
                if let Some(&token) = tokens.get(&conn) {
                    if let Some(io) = conns.get_mut(&token) {
                        queue_write(poll, token, io, bytes);
                    }
                }
            }
            IoCommand::Close(conn) => {
                if let Some(&token) = tokens.get(&conn) {
                    teardown(poll, token, conns, tokens, routes, addrs, shared);
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn register_new_conn(
    std_stream: StdTcpStream,
    shared: &Arc<Shared>,
    routes: &RouteTable,
    addrs: &AddrTable,
    thread_idx: usize,
    max_frame_bytes: u32,
    poll: &mut Poll,
    conns: &mut HashMap<Token, ConnIo>,
    tokens: &mut HashMap<ConnId, Token>,
    next_token: &mut usize,
) {
    std_stream.set_nodelay(true).ok();
    let peer = std_stream.peer_addr().ok();
    let mut stream = MioTcpStream::from_std(std_stream);
    let conn = shared.server.lock().unwrap().register_connection();
    routes.lock().unwrap().insert(conn, thread_idx);
    if let Some(peer) = peer {
        addrs.lock().unwrap().insert(conn, peer);
    }
    CONNECTIONS.inc();

    let token = Token(*next_token);
    *next_token += 1;
    if poll.registry().register(&mut stream, token, Interest::READABLE).is_err() {
        shared.server.lock().unwrap().connections.remove(&conn);
        routes.lock().unwrap().remove(&conn);
        addrs.lock().unwrap().remove(&conn);
        return;
    }
    conns.insert(
        token,
        ConnIo {
            conn,
            stream,
            reader: FrameReader::new(max_frame_bytes),
            outbound: Vec::new(),
            write_interest: false,
        },
    );
    tokens.insert(conn, token);
}

fn handle_readable(token: Token, conns: &mut HashMap<Token, ConnIo>, shared: &Arc<Shared>) -> bool {
    let Some(io) = conns.get_mut(&token) else {
        return false;
    };
    let mut buf = [0u8; 8192];
    loop {
        match io.stream.read(&mut buf) {
            Ok(0) => return true,
            Ok(n) => io.reader.feed(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return true,
        }
    }
    match io.reader.drain() {
        Ok(units) if units.is_empty() => false,
        Ok(units) => {
            shared.push_ready(io.conn, units);
            false
        }
        Err(_) => true,
    }
}

fn handle_writable(poll: &mut Poll, token: Token, conns: &mut HashMap<Token, ConnIo>) -> bool {
    let Some(io) = conns.get_mut(&token) else {
        return false;
    };
    flush(poll, token, io)
}

fn flush(poll: &mut Poll, token: Token, io: &mut ConnIo) -> bool {
    while !io.outbound.is_empty() {
        match io.stream.write(&io.outbound) {
            Ok(0) => return true,
            Ok(n) => {
                io.outbound.drain(..n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return true,
        }
    }
    let want_writable = !io.outbound.is_empty();
    if want_writable != io.write_interest {
        io.write_interest = want_writable;
        let interest = if want_writable {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        poll.registry().reregister(&mut io.stream, token, interest).ok();
    }
    false
}

fn queue_write(poll: &mut Poll, token: Token, io: &mut ConnIo, bytes: Vec<u8>) {
    io.outbound.extend_from_slice(&bytes);
    flush(poll, token, io);
}

fn teardown(
    poll: &mut Poll,
    token: Token,
    conns: &mut HashMap<Token, ConnIo>,
    tokens: &mut HashMap<ConnId, Token>,
    routes: &RouteTable,
    addrs: &AddrTable,
    shared: &Arc<Shared>,
) {
    if let Some(mut io) = conns.remove(&token) {
        poll.registry().deregister(&mut io.stream).ok();
        tokens.remove(&io.conn);
        routes.lock().unwrap().remove(&io.conn);
        addrs.lock().unwrap().remove(&io.conn);
        CONNECTIONS.dec();
        shared.push_disconnect(io.conn);
    }
}
