use tracing_subscriber::EnvFilter;

/// Logs go to stderr so snapshot lines on stdout stay clean.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;

    tracing::info!(port, "Prometheus exporter listening");
    metrics::gauge!("streamsim_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_port: u16) -> anyhow::Result<()> {
    Ok(())
}
