//! Local WebSocket server and polling helpers

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// What one accepted connection does
#[derive(Clone)]
pub struct Session {
    pub messages: Vec<String>,
    /// Close the connection after sending instead of holding it open
    pub close: bool,
}

impl Session {
    pub fn hold(messages: Vec<String>) -> Self {
        Self { messages, close: false }
    }

    pub fn close(messages: Vec<String>) -> Self {
        Self { messages, close: true }
    }
}

/// Upstream stand-in. Connection `n` plays `sessions[n]`, reusing the last one.
pub struct MockServer {
    pub base_url: String,
    connections: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(sessions: Vec<Session>) -> Self {
        assert!(!sessions.is_empty());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let connections = connections.clone();
            let paths = paths.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let n = connections.fetch_add(1, Ordering::SeqCst);
                    let session = sessions[n.min(sessions.len() - 1)].clone();
                    let paths = paths.clone();

                    tokio::spawn(async move {
                        let record_path =
                            move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                                paths.lock().unwrap().push(req.uri().path().to_string());
                                Ok(resp)
                            };
                        let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, record_path).await
                        else {
                            return;
                        };
                        serve(ws, session).await;
                    });
                }
            })
        };

        Self {
            base_url: format!("ws://{}/ws", addr),
            connections,
            paths,
            task,
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    session: Session,
) {
    let (mut write, mut read) = ws.split();
    for message in session.messages {
        if write.send(Message::Text(message)).await.is_err() {
            return;
        }
    }
    if session.close {
        let _ = write.send(Message::Close(None)).await;
    }
    // Drain until the client goes away; pings are answered while reading.
    while let Some(Ok(_)) = read.next().await {}
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Binance trade payload at `ms` epoch milliseconds
pub fn trade(symbol: &str, ms: i64, price: &str, qty: &str) -> String {
    format!(
        r#"{{"e":"trade","E":{ms},"s":"{symbol}","t":1,"p":"{price}","q":"{qty}","T":{ms},"m":false}}"#
    )
}
