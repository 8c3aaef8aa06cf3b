//! Stream client against a local WebSocket server

use crate::support::{wait_for, MockServer, Session};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tick_bars::stream::{MessageHandler, StreamClient, StreamConfig};

#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<String>>,
}

impl Recorder {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn on_message(&self, raw: &str) {
        self.messages.lock().unwrap().push(raw.to_string());
    }
}

fn symbols() -> Vec<String> {
    vec!["btcusdt".to_string(), "ethusdt".to_string()]
}

#[tokio::test]
async fn test_messages_delivered_in_order() {
    let server = MockServer::start(vec![Session::hold(vec![
        "one".to_string(),
        "two".to_string(),
        "three".to_string(),
    ])])
    .await;

    let client = Arc::new(StreamClient::new(StreamConfig::new(&server.base_url)));
    let recorder = Arc::new(Recorder::default());
    let task = {
        let client = client.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move { client.run(&symbols(), recorder.as_ref()).await })
    };

    assert!(
        wait_for(Duration::from_secs(5), || {
            let recorder = recorder.clone();
            async move { recorder.messages().len() == 3 }
        })
        .await
    );
    assert_eq!(recorder.messages(), vec!["one", "two", "three"]);
    assert_eq!(server.paths(), vec!["/ws/btcusdt@trade/ethusdt@trade"]);

    client.stop();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("client should stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockServer::start(vec![
        Session::close(vec!["first".to_string()]),
        Session::hold(vec!["second".to_string()]),
    ])
    .await;

    let config = StreamConfig::new(&server.base_url)
        .stream_type("aggTrade")
        .reconnect_delay(Duration::from_millis(50));
    let client = Arc::new(StreamClient::new(config));
    let recorder = Arc::new(Recorder::default());
    let task = {
        let client = client.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move { client.run(&symbols(), recorder.as_ref()).await })
    };

    assert!(
        wait_for(Duration::from_secs(5), || {
            let recorder = recorder.clone();
            async move { recorder.messages().len() == 2 }
        })
        .await
    );
    assert_eq!(recorder.messages(), vec!["first", "second"]);
    assert_eq!(server.connections(), 2);
    assert!(server
        .paths()
        .iter()
        .all(|p| p == "/ws/btcusdt@aggTrade/ethusdt@aggTrade"));

    client.stop();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("client should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_stop_while_connected_and_idle() {
    let server = MockServer::start(vec![Session::hold(Vec::new())]).await;

    let client = Arc::new(StreamClient::new(StreamConfig::new(&server.base_url)));
    let recorder = Arc::new(Recorder::default());
    let task = {
        let client = client.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move { client.run(&symbols(), recorder.as_ref()).await })
    };

    let server_ref = &server;
    assert!(
        wait_for(Duration::from_secs(5), move || async move {
            server_ref.connections() == 1
        })
        .await
    );
    client.stop();

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("client should stop while idle")
        .unwrap()
        .unwrap();
    assert!(recorder.messages().is_empty());
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_zero_ping_interval_keeps_connection() {
    let server = MockServer::start(vec![Session::hold(vec![
        "one".to_string(),
        "two".to_string(),
    ])])
    .await;

    let config = StreamConfig::new(&server.base_url).ping_interval(Duration::ZERO);
    let client = Arc::new(StreamClient::new(config));
    let recorder = Arc::new(Recorder::default());
    let task = {
        let client = client.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move { client.run(&symbols(), recorder.as_ref()).await })
    };

    assert!(
        wait_for(Duration::from_secs(5), || {
            let recorder = recorder.clone();
            async move { recorder.messages().len() == 2 }
        })
        .await
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!task.is_finished());
    assert_eq!(server.connections(), 1);

    client.stop();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("client should stop")
        .unwrap()
        .unwrap();
}
