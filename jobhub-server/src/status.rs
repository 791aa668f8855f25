//! Status service: `/metrics`, `/liveness`, `/readiness`, served on a
//! separate address from the job-dispatch ports so it can be scraped and
//! health-checked independently of client/worker traffic.

use crate::metrics::PROM_REGISTRY;
use actix_web::{web, HttpResponse};
use jobhub_commons::metrics::{serve as serve_registry, HasRegistry, RegistryWrapper};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared liveness/readiness flags, flipped by the I/O and dispatcher
/// threads once they are up and serving connections.
#[derive(Clone)]
pub struct HealthState {
    live: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
}

impl HealthState {
    /// A fresh, not-yet-live-or-ready state.
    pub fn new() -> Self {
        HealthState {
            live: Arc::new(AtomicBool::new(false)),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the server live: the dispatcher thread is running.
    pub fn set_live(&self, value: bool) {
        self.live.store(value, Ordering::SeqCst);
    }

    /// Mark the server ready: at least one I/O thread is accepting
    /// connections.
    pub fn set_ready(&self, value: bool) {
        self.ready.store(value, Ordering::SeqCst);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /metrics` — Prometheus textual exposition format.
pub async fn serve_metrics() -> HttpResponse {
    let wrapper = web::Data::new(RegistryWrapper(&PROM_REGISTRY));
    match serve_registry::<RegistryWrapper>(wrapper).await {
        Ok(resp) => resp,
        Err(e) => e.as_json_error(),
    }
}

/// `GET /liveness` — 200 while the dispatcher loop is running, 500
/// otherwise.
pub async fn serve_liveness(state: web::Data<HealthState>) -> HttpResponse {
    if state.live.load(Ordering::SeqCst) {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::InternalServerError().finish()
    }
}

/// `GET /readiness` — 200 once at least one I/O thread is accepting
/// connections, 500 otherwise.
pub async fn serve_readiness(state: web::Data<HealthState>) -> HttpResponse {
    if state.ready.load(Ordering::SeqCst) {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::InternalServerError().finish()
    }
}

