//! End-to-end: local stream server through coordinator into SQLite

use crate::support::{trade, wait_for, MockServer, Session};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tick_bars::config::Config;
use tick_bars::market::{parse_timestamp, Timeframe};
use tick_bars::coordinator::StreamCoordinator;
use tick_bars::store::PersistenceStore;

// 2024-01-01T00:00:00Z
const T0: i64 = 1_704_067_200_000;

fn config_for(server: &MockServer, db: &std::path::Path) -> Config {
    let toml = format!(
        r#"
            [stream]
            base_url = "{}"
            symbols = ["BTCUSDT", "ethusdt"]
            reconnect_delay_secs = 60

            [storage]
            db_path = "{}"
            flush_interval_ms = 50
        "#,
        server.base_url,
        db.display()
    );
    toml::from_str(&toml).unwrap()
}

#[tokio::test]
async fn test_stream_to_bars_and_storage() {
    let messages = vec![
        trade("BTCUSDT", T0 + 200, "100", "1"),
        r#"{"e":"depthUpdate","s":"BTCUSDT"}"#.to_string(),
        trade("BTCUSDT", T0 + 700, "102", "2"),
        "garbage".to_string(),
        trade("ETHUSDT", T0 + 800, "2000", "0.5"),
        trade("BTCUSDT", T0 + 1100, "101", "1"),
    ];
    let server = MockServer::start(vec![Session::hold(messages)]).await;
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("market_data.db");
    let config = config_for(&server, &db);

    let coord = StreamCoordinator::new(
        config.coordinator_config(),
        PersistenceStore::open(&config.storage.db_path).unwrap(),
    );
    coord.start();
    coord.start();

    let coord_ref = &coord;
    assert!(
        wait_for(Duration::from_secs(5), move || async move {
            coord_ref.latest_price("btcusdt").await == dec!(101)
        })
        .await
    );

    let bars = coord.bars(Timeframe::S1, "btcusdt").await;
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].timestamp, parse_timestamp("2024-01-01T00:00:00Z").unwrap());
    assert_eq!(
        (bars[0].open, bars[0].high, bars[0].low, bars[0].close, bars[0].volume),
        (dec!(100), dec!(102), dec!(100), dec!(102), dec!(3))
    );
    assert_eq!(coord.latest_price("ethusdt").await, dec!(2000));
    assert_eq!(coord.latest_price("solusdt").await, Decimal::ZERO);
    assert_eq!(coord.recent_ticks("btcusdt").await.len(), 3);
    assert!(coord.is_running());
    assert_eq!(server.connections(), 1);

    coord.shutdown().await;
    assert!(!coord.is_running());

    let store = PersistenceStore::open(&db).unwrap();
    assert_eq!(store.count_ticks("btcusdt").unwrap(), 3);
    assert_eq!(store.count_ticks("ethusdt").unwrap(), 1);
    assert_eq!(store.bars(Timeframe::S1, "btcusdt", 10).unwrap(), bars);
    assert_eq!(store.count_bars(Timeframe::M1, "btcusdt").unwrap(), 0);
}

#[tokio::test]
async fn test_shutdown_is_terminal() {
    let server = MockServer::start(vec![Session::hold(vec![trade("ethusdt", T0, "2000", "1")])]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, &dir.path().join("market_data.db"));

    let coord = StreamCoordinator::new(
        config.coordinator_config(),
        PersistenceStore::open(&config.storage.db_path).unwrap(),
    );
    coord.start();

    let coord_ref = &coord;
    assert!(
        wait_for(Duration::from_secs(5), move || async move {
            coord_ref.latest_price("ethusdt").await == dec!(2000)
        })
        .await
    );
    coord.shutdown().await;

    coord.start();
    assert!(!coord.is_running());
    assert_eq!(server.connections(), 1);

    // Reads keep working from memory after shutdown.
    assert_eq!(coord.latest_price("ethusdt").await, dec!(2000));
    assert_eq!(coord.writer().stats().await.ticks_written, 1);
}
