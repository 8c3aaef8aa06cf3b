//! tick-bars: live trade ingestion with multi-timeframe OHLCV bars
//!
//! This library provides the core components for:
//! - A reconnecting Binance trade stream client
//! - Normalization of raw trade messages into ticks
//! - 1s / 1m / 5m bar resampling
//! - Bounded per-symbol tick and bar buffers
//! - Batched SQLite persistence with cold-start reads
//! - Structured logging and Prometheus metrics

pub mod buffer;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod market;
pub mod normalize;
pub mod resample;
pub mod store;
pub mod stream;
pub mod telemetry;
