//! Reconnecting WebSocket stream client

use super::types::{StreamConfig, StreamError};
use super::MessageHandler;
use crate::telemetry::{self, GaugeMetric};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Floor for the ping timer; a zero period would panic the worker
const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// WebSocket client for a fixed symbol set.
///
/// Any failure (connect error, protocol error, server close, pong timeout)
/// is followed by a fixed delay and a reconnect. Only [`StreamClient::stop`]
/// ends [`StreamClient::run`].
pub struct StreamClient {
    config: StreamConfig,
    cancel: CancellationToken,
}

impl StreamClient {
    /// Create a new stream client
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Ask the client to stop.
    ///
    /// Observed while connecting, waiting for a message, or backing off. A
    /// handler call already in progress runs to completion first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether [`StreamClient::stop`] has been called
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Subscribe to `symbols` and feed every text message to `handler` until stopped
    pub async fn run<H>(&self, symbols: &[String], handler: &H) -> Result<(), StreamError>
    where
        H: MessageHandler + ?Sized,
    {
        if symbols.is_empty() {
            return Err(StreamError::NoSymbols);
        }

        let url = self.config.url_for(symbols);
        let mut reconnect_attempts: u32 = 0;

        while !self.cancel.is_cancelled() {
            match self.connect_and_stream(&url, handler).await {
                Ok(()) => {
                    tracing::info!("Stream connection closed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stream connection error");
                }
            }
            telemetry::set_gauge(GaugeMetric::StreamConnected, 0.0);

            if self.cancel.is_cancelled() {
                break;
            }

            reconnect_attempts += 1;
            telemetry::record_stream_reconnect();
            tracing::info!(
                attempt = reconnect_attempts,
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Reconnecting stream..."
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }

        tracing::info!("Stream client stopped");
        Ok(())
    }

    /// Connect once and deliver messages until the connection ends
    async fn connect_and_stream<H>(&self, url: &str, handler: &H) -> Result<(), StreamError>
    where
        H: MessageHandler + ?Sized,
    {
        tracing::info!(url = %url, "Connecting to stream");

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            result = connect_async(url) => result,
        };
        let (ws_stream, _response) =
            connected.map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        tracing::info!("Stream connected");
        telemetry::set_gauge(GaugeMetric::StreamConnected, 1.0);

        let ping_period = self.config.ping_interval.max(MIN_PING_INTERVAL);
        let mut ping_interval =
            tokio::time::interval_at(Instant::now() + ping_period, ping_period);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut pong_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            handler.on_message(&text).await;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            tracing::debug!(len = data.len(), "Ignoring binary frame");
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| StreamError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Received close frame");
                            return Ok(());
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            return Err(StreamError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(StreamError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    write.send(Message::Ping(Vec::new())).await
                        .map_err(|e| StreamError::SendFailed(e.to_string()))?;
                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + self.config.pong_timeout);
                    }
                }

                _ = tokio::time::sleep_until(pong_deadline.unwrap_or_else(Instant::now)), if pong_deadline.is_some() => {
                    return Err(StreamError::PongTimeout);
                }
            }
        }
    }
}
