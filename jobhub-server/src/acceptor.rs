//! Accepts inbound TCP connections on the dispatch service's listening
//! socket and round-robins them across the running [`crate::io_thread`]s.
//! Kept as a plain blocking loop on its own thread rather than folded into
//! any one I/O thread's `mio::Poll`, so adding or removing I/O threads
//! never changes how connections are accepted.

use crate::shared::{IoCommand, IoHandles};
use std::net::TcpListener;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Accept connections from `listener` until the shared shutdown flag is
/// set, handing each one to the next I/O thread in round-robin order.
pub fn run(listener: TcpListener, io_handles: IoHandles, shared: Arc<crate::shared::Shared>) {
    listener
        .set_nonblocking(false)
        .expect("listening socket must support blocking accept");
    let mut next = 0usize;
    loop {
        if shared.shutdown_immediate.load(Ordering::SeqCst)
            || shared.shutdown_graceful.load(Ordering::SeqCst)
        {
            return;
        }
        let (stream, _addr) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("accept failed: {}", e);
                continue;
            }
        };
        let handle = &io_handles[next % io_handles.len()];
        if handle.tx.send(IoCommand::NewConn(stream)).is_ok() {
            handle.waker.wake().ok();
        }
        next = next.wrapping_add(1);
    }
}
