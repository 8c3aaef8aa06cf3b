//! Prometheus metrics

use crate::market::Timeframe;
use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Normalize, buffer and resample one message
    Pipeline,
    /// Exchange trade time to local processing time
    FeedLag,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// 1 while the upstream stream is connected
    StreamConnected,
    /// Open bars across all timeframes and symbols
    OpenBars,
}

/// Start the Prometheus exporter with an HTTP listener on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Pipeline => "tickbars_pipeline_latency_seconds",
        LatencyMetric::FeedLag => "tickbars_feed_lag_seconds",
    };
    histogram!(metric_name).record(duration.as_secs_f64());
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::StreamConnected => "tickbars_stream_connected",
        GaugeMetric::OpenBars => "tickbars_open_bars",
    };
    gauge!(metric_name).set(value);
}

/// Count a normalized tick
pub fn record_tick(symbol: &str) {
    counter!("tickbars_ticks_total", "symbol" => symbol.to_string()).increment(1);
}

/// Count a dropped message by rejection reason
pub fn record_rejected(reason: &'static str) {
    counter!("tickbars_messages_rejected_total", "reason" => reason).increment(1);
}

/// Count a completed bar
pub fn record_bar_completed(timeframe: Timeframe) {
    counter!("tickbars_bars_completed_total", "timeframe" => timeframe.label()).increment(1);
}

/// Count rows written and failed by the persistence writer
pub fn record_persisted(written: u64, failed: u64) {
    counter!("tickbars_rows_persisted_total").increment(written);
    if failed > 0 {
        counter!("tickbars_persist_failures_total").increment(failed);
    }
}

/// Count a stream reconnect
pub fn record_stream_reconnect() {
    counter!("tickbars_stream_reconnects_total").increment(1);
}
