use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    // Pre-register counters so they appear even before the first increment.
    counter!("poll_cycles_total").absolute(0);
    counter!("master_trades_ingested_total").absolute(0);
    counter!("copy_trades_created_total").absolute(0);
    counter!("copy_trades_skipped_total").absolute(0);
    counter!("copy_trades_errored_total").absolute(0);
    counter!("status_updates_total").absolute(0);
    counter!("upstream_failures_total").absolute(0);

    // Pre-register gauges at zero.
    gauge!("followers_registered").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("poll_cycle_seconds").record(0.0);

    Ok(handle)
}
