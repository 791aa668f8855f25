//! Test helpers shared across the workspace's crates.

/// Initialize logging for a test binary, honoring `RUST_LOG` if set.
pub fn init_logger() {
    let _ = env_logger::try_init_from_env(env_logger::Env::default());
}

/// Register a dummy gauge with a fixed value, for exercising the metrics
/// serving path without depending on real dispatcher state.
pub fn dummy_gauge(registry: &prometheus::Registry, value: f64) -> anyhow::Result<()> {
    let test_gauge = prometheus::Gauge::new("dummy_gauge", "dummy help")?;
    test_gauge.set(value);
    registry.register(Box::new(test_gauge))?;
    Ok(())
}
