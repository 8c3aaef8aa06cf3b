//! Persistence across store reopen

use rust_decimal_macros::dec;
use std::time::Duration;
use tick_bars::coordinator::{CoordinatorConfig, StreamCoordinator};
use tick_bars::market::{parse_timestamp, Bar, Tick, Timeframe};
use tick_bars::store::{PersistenceStore, PersistenceWriter, WriterConfig};

fn bar(ts: &str, close: rust_decimal::Decimal) -> Bar {
    Bar {
        symbol: "solusdt".to_string(),
        timestamp: parse_timestamp(ts).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: dec!(2),
    }
}

#[tokio::test]
async fn test_writer_output_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("market_data.db");

    {
        let store = PersistenceStore::open(&path).unwrap();
        let writer = PersistenceWriter::spawn(
            store,
            WriterConfig {
                batch_size: 2,
                flush_interval: Duration::from_secs(60),
                queue_capacity: 16,
            },
        );

        let t0 = parse_timestamp("2024-01-01T00:00:00.250Z").unwrap();
        writer
            .persist_tick(Tick::new("SOLUSDT", t0, dec!(101.5), dec!(3)))
            .await;
        writer
            .persist_tick(Tick::new("SOLUSDT", t0, dec!(999), dec!(9)))
            .await;
        writer
            .persist_bar(Timeframe::M5, bar("2024-01-01T00:00:00Z", dec!(100)))
            .await;
        writer
            .persist_bar(Timeframe::M5, bar("2024-01-01T00:00:00Z", dec!(105)))
            .await;
        assert!(writer.flush().await);

        let stats = writer.stats().await;
        assert_eq!(stats.ticks_received, 2);
        assert_eq!(stats.ticks_written, 1);
        assert_eq!(stats.ticks_ignored, 1);
        assert_eq!(stats.failed, 0);
    }

    let store = PersistenceStore::open(&path).unwrap();

    // Duplicate tick keys keep the first write; bars keep the last.
    let ticks = store.recent_ticks("solusdt", 10).unwrap();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].price, dec!(101.5));
    assert_eq!(ticks[0].timestamp, parse_timestamp("2024-01-01T00:00:00.250Z").unwrap());

    let bars = store.bars(Timeframe::M5, "solusdt", 10).unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].close, dec!(105));
    assert_eq!(store.count_bars(Timeframe::S1, "solusdt").unwrap(), 0);
}

#[tokio::test]
async fn test_cold_start_after_restart_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market_data.db");

    {
        let store = PersistenceStore::open(&path).unwrap();
        for minute in 0..30 {
            let ts = format!("2024-01-01T00:{:02}:00Z", minute);
            store
                .insert_or_replace_bar(Timeframe::M1, &bar(&ts, rust_decimal::Decimal::from(minute)))
                .unwrap();
        }
    }

    let config = CoordinatorConfig {
        symbols: vec!["solusdt".to_string()],
        cold_start_limit: 10,
        ..Default::default()
    };
    let coord = StreamCoordinator::new(config, PersistenceStore::open(&path).unwrap());

    let bars = coord.bars(Timeframe::M1, "solusdt").await;
    let closes: Vec<i64> = bars
        .iter()
        .map(|b| rust_decimal::prelude::ToPrimitive::to_i64(&b.close).unwrap())
        .collect();
    assert_eq!(closes, (20..30).collect::<Vec<i64>>());
    assert_eq!(coord.buffered_bars(Timeframe::M1, "solusdt").await, 0);
    assert!(coord.bars(Timeframe::M5, "solusdt").await.is_empty());
}

#[tokio::test]
async fn test_storage_failure_leaves_memory_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market_data.db");

    let config = CoordinatorConfig {
        symbols: vec!["btcusdt".to_string()],
        ..Default::default()
    };
    let coord = StreamCoordinator::new(config, PersistenceStore::open(&path).unwrap());

    // Pull the tables out from under the coordinator's connection.
    {
        let other = rusqlite::Connection::open(&path).unwrap();
        other
            .execute_batch("DROP TABLE ticks; DROP TABLE bars_1s;")
            .unwrap();
    }

    let trade = |ms: i64, price: &str, qty: &str| {
        format!(r#"{{"e":"trade","s":"BTCUSDT","p":"{price}","q":"{qty}","T":{ms}}}"#)
    };
    let t0 = 1_704_067_200_000;
    let feed = async {
        coord.handle_message(&trade(t0 + 200, "100", "1")).await;
        coord.handle_message(&trade(t0 + 700, "102", "2")).await;
        coord.handle_message(&trade(t0 + 1100, "101", "1")).await;
        coord.writer().flush().await
    };
    let flushed = tokio::time::timeout(Duration::from_secs(10), feed)
        .await
        .expect("pipeline should not hang on storage errors");
    assert!(flushed);

    assert_eq!(coord.latest_price("btcusdt").await, dec!(101));
    let bars = coord.bars(Timeframe::S1, "btcusdt").await;
    assert_eq!(bars.len(), 1);
    assert_eq!(
        (bars[0].open, bars[0].high, bars[0].low, bars[0].close, bars[0].volume),
        (dec!(100), dec!(102), dec!(100), dec!(102), dec!(3))
    );

    let stats = coord.writer().stats().await;
    assert_eq!(stats.ticks_written, 0);
    assert_eq!(stats.bars_written, 0);
    assert_eq!(stats.failed, 4);

    // The writer keeps going after failures.
    coord.handle_message(&trade(t0 + 1500, "103", "1")).await;
    assert!(coord.writer().flush().await);
    assert_eq!(coord.writer().stats().await.failed, 5);
    assert_eq!(coord.latest_price("btcusdt").await, dec!(103));
}
