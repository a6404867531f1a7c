//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use self_heal::config::MonitorConfig;

#[allow(dead_code)]
/// Start a programmable health endpoint on an ephemeral port.
///
/// `f` is called per request and returns the status code and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Health endpoint body in the probed service's format.
#[allow(dead_code)]
pub fn health_body(status: &str, last_error: Option<&str>) -> String {
    serde_json::json!({ "status": status, "last_error": last_error }).to_string()
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Fresh, empty directory for one test's state file.
pub fn scratch_state_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("self-heal-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("health_state.json")
}

/// Config probing `addr` with short timeouts and a private state file.
pub fn test_config(addr: SocketAddr, name: &str) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.watcher.state_path = scratch_state_path(name);
    config.watcher.interval_ms = 250;
    config.probe.base_url = "http://127.0.0.1".into();
    config.probe.port = addr.port();
    config.probe.timeout_ms = 200;
    config
}

#[allow(dead_code)]
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
