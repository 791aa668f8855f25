//! `jobhubd`: a Gearman-protocol-compatible job dispatch server.

mod acceptor;
mod config;
mod dispatcher;
mod io_thread;
mod job_store;
mod metrics;
mod net;
mod shared;
mod status;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use config::AppSettings;
use job_store::{FileJobStore, JobStore, NullJobStore};
use mio::Waker;
use shared::{IoCommand, IoHandle, IoHandles, RouteTable, Shared};
use signal_hook::consts::signal::SIGINT;
use signal_hook::iterator::Signals;
use socket2::{Domain, Socket, Type};
use status::HealthState;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

fn main() -> anyhow::Result<()> {
    let settings = AppSettings::assemble()?;

    env_logger::Builder::from_default_env()
        .filter(Some(module_path!()), settings.verbosity)
        .init();
    log::debug!("application settings:\n{:#?}", &settings);

    metrics::register();

    let job_store: Box<dyn JobStore> = match &settings.job_log_dir {
        Some(dir) => Box::new(FileJobStore::new(dir.clone())?),
        None => Box::new(NullJobStore),
    };
    let server = jobhub_core::Server::new(hostname())
        .with_worker_wakeup_count(settings.worker_wakeup_count);
    let shared = Arc::new(Shared::new(server, job_store, settings.sweep_interval));
    let routes: RouteTable = Arc::new(Mutex::new(HashMap::new()));
    let health = HealthState::new();

    let listener = bind_listener((settings.address, settings.port).into(), settings.backlog)?;
    log::info!("dispatch service listening on {}:{}", settings.address, settings.port);

    spawn_status_server(health.clone(), (settings.status_address, settings.status_port));
    spawn_signal_handler(shared.clone(), &settings.graceful_shutdown_signal)?;

    if settings.io_thread_count == 0 {
        log::info!("io_thread_count is 0: running the collapsed single-threaded server");
        run_collapsed(shared, routes, listener, settings.max_frame_bytes, health)
    } else {
        run_threaded(shared, routes, listener, &settings, health)
    }
}

/// Bind the dispatch service's listening socket with a configurable accept
/// backlog — `std::net::TcpListener::bind` has no way to set this, so the
/// socket is built and listened on through `socket2` before being handed
/// back as a plain `std::net::TcpListener`.
fn bind_listener(addr: SocketAddr, backlog: u32) -> anyhow::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;
    Ok(socket.into())
}

/// Spawn a thread that blocks on the configured graceful-shutdown signal
/// (and always on `SIGINT`, which triggers an immediate shutdown) and sets
/// the matching flag on [`Shared`] when one arrives.
fn spawn_signal_handler(shared: Arc<Shared>, graceful_signal_name: &str) -> anyhow::Result<()> {
    let graceful_signal = config::signal_number(graceful_signal_name)
        .expect("graceful_shutdown_signal was already validated by AppSettings::assemble");
    let mut signals = Signals::new([SIGINT, graceful_signal])?;
    thread::Builder::new()
        .name("jobhub-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if signal == SIGINT {
                    log::info!("received SIGINT: shutting down immediately");
                    shared.shutdown_immediate.store(true, Ordering::SeqCst);
                } else {
                    log::info!("received {}: shutting down gracefully", graceful_signal_name);
                    shared.shutdown_graceful.store(true, Ordering::SeqCst);
                }
                shared.proc_cv.notify_all();
            }
        })?;
    Ok(())
}

/// Spawn the status service (`/metrics`, `/liveness`, `/readiness`) on its
/// own thread with its own single-threaded `actix_web` runtime, so it stays
/// reachable regardless of which mode the dispatch service runs in.
fn spawn_status_server(health: HealthState, status_addr: (std::net::IpAddr, u16)) {
    thread::Builder::new()
        .name("jobhub-status".to_string())
        .spawn(move || {
            let sys = actix_web::rt::System::new();
            let result = sys.block_on(async move {
                let data = web::Data::new(health);
                HttpServer::new(move || {
                    App::new()
                        .app_data(data.clone())
                        .wrap(Logger::default())
                        .route("/metrics", web::get().to(status::serve_metrics))
                        .route("/liveness", web::get().to(status::serve_liveness))
                        .route("/readiness", web::get().to(status::serve_readiness))
                })
                .bind(status_addr)?
                .run()
                .await
            });
            if let Err(e) = result {
                log::error!("status service exited: {}", e);
            }
        })
        .expect("failed to spawn status service thread");
}

/// Start `io_thread_count` I/O threads, a dispatcher thread, and an
/// acceptor thread, then block the calling thread until the dispatcher
/// exits (shutdown).
fn run_threaded(
    shared: Arc<Shared>,
    routes: RouteTable,
    listener: TcpListener,
    settings: &AppSettings,
    health: HealthState,
) -> anyhow::Result<()> {
    let mut io_handles = Vec::with_capacity(settings.io_thread_count);
    let mut io_join_handles = Vec::with_capacity(settings.io_thread_count);

    for idx in 0..settings.io_thread_count {
        let (tx, rx) = crossbeam_channel::unbounded::<IoCommand>();
        let (waker_tx, waker_rx) = mpsc::channel::<Arc<Waker>>();
        let shared_clone = shared.clone();
        let routes_clone = routes.clone();
        let addrs_clone = shared.addrs.clone();
        let max_frame_bytes = settings.max_frame_bytes;
        let self_tx = tx.clone();
        let join = thread::Builder::new()
            .name(format!("jobhub-io-{}", idx))
            .spawn(move || {
                if let Err(e) = io_thread::run(
                    idx,
                    shared_clone,
                    routes_clone,
                    addrs_clone,
                    self_tx,
                    max_frame_bytes,
                    rx,
                    waker_tx,
                    false,
                ) {
                    log::error!("I/O thread {} exited: {}", idx, e);
                }
            })?;
        let waker = waker_rx.recv().expect("I/O thread must publish its waker before accepting work");
        io_handles.push(IoHandle { tx, waker });
        io_join_handles.push(join);
    }
    let io_handles: IoHandles = Arc::new(io_handles);

    let dispatcher_join = {
        let shared = shared.clone();
        let routes = routes.clone();
        let addrs = shared.addrs.clone();
        let io_handles = io_handles.clone();
        thread::Builder::new()
            .name("jobhub-dispatcher".to_string())
            .spawn(move || dispatcher::run_loop(shared, routes, addrs, io_handles))?
    };

    {
        let shared = shared.clone();
        let io_handles = io_handles.clone();
        thread::Builder::new()
            .name("jobhub-acceptor".to_string())
            .spawn(move || acceptor::run(listener, io_handles, shared))?;
    }

    health.set_live(true);
    health.set_ready(true);

    let _ = dispatcher_join.join();
    for join in io_join_handles {
        let _ = join.join();
    }
    Ok(())
}

/// `io_thread_count == 0`: poll sockets and apply dispatch on the calling
/// thread, with only the acceptor split off. No separate dispatcher thread
/// exists in this mode.
fn run_collapsed(
    shared: Arc<Shared>,
    routes: RouteTable,
    listener: TcpListener,
    max_frame_bytes: u32,
    health: HealthState,
) -> anyhow::Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded::<IoCommand>();
    let (waker_tx, waker_rx) = mpsc::channel::<Arc<Waker>>();
    let addrs = shared.addrs.clone();

    let accept_shared = shared.clone();
    let accept_tx = tx.clone();
    let accept_join = thread::Builder::new()
        .name("jobhub-acceptor".to_string())
        .spawn(move || {
            let waker = waker_rx.recv().expect("collapsed I/O loop must publish its waker");
            let handles: IoHandles = Arc::new(vec![IoHandle { tx: accept_tx, waker }]);
            acceptor::run(listener, handles, accept_shared);
        })?;

    health.set_live(true);
    health.set_ready(true);

    io_thread::run(0, shared, routes, addrs, tx, max_frame_bytes, rx, waker_tx, true)?;
    let _ = accept_join.join();
    Ok(())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "jobhubd".to_string())
}
