//! HyperTransport against a local plain-HTTP endpoint.
//!
//! The server reads one request, records it, and writes a canned reply.

use std::sync::Arc;
use std::time::Duration;

use sefaz_probe::scripted::status_reply_xml;
use sefaz_probe::{HyperTransport, ProbeClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve a single connection with `status` and `body`; hand back the raw request.
async fn serve_once(status_line: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        // Read until the declared body has fully arrived.
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&received);
            if let Some(split) = text.find("\r\n\r\n") {
                let content_length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if received.len() >= split + 4 + content_length {
                    break;
                }
            }
        }

        let reply = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: text/xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&received).into_owned());
    });

    (format!("http://{addr}/ws/NfeStatusServico2.asmx"), rx)
}

fn client() -> ProbeClient {
    ProbeClient::new(Arc::new(HyperTransport::new().unwrap()))
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(1))
}

#[tokio::test]
async fn probe_posts_envelope_and_classifies_reply() {
    let (url, request) = serve_once("200 OK", status_reply_xml("107", "Servico em Operacao")).await;

    let result = client().probe(&url, "35").await;
    assert!(result.available(), "{}", result.reason_text());
    assert_eq!(result.reason_code(), Some("107"));

    let raw = request.await.unwrap();
    assert!(raw.starts_with("POST /ws/NfeStatusServico2.asmx HTTP/1.1"));
    assert!(raw.to_ascii_lowercase().contains("soapaction: nfestatusserviconf"));
    assert!(raw.contains("text/xml; charset=utf-8"));
    assert!(raw.contains("<cUF>35</cUF>"));
}

#[tokio::test]
async fn server_error_is_transport_status() {
    let (url, _request) = serve_once("500 Internal Server Error", String::new()).await;

    let result = client().probe(&url, "35").await;
    assert!(!result.available());
    assert!(result.is_transport_failure());
    assert_eq!(result.reason_text(), "transport status 500");
}

#[tokio::test]
async fn paused_service_is_unavailable_but_not_transport_failure() {
    let (url, _request) =
        serve_once("200 OK", status_reply_xml("108", "Servico Paralisado Momentaneamente")).await;

    let result = client().probe(&url, "35").await;
    assert!(!result.available());
    assert!(!result.is_transport_failure());
    assert_eq!(result.reason_code(), Some("108"));
}

#[tokio::test]
async fn silent_server_hits_probe_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and hold the connection open without answering.
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = ProbeClient::new(Arc::new(HyperTransport::new().unwrap()))
        .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));
    let result = client.probe(&format!("http://{addr}/ws"), "35").await;
    assert!(result.is_transport_failure());
    assert!(result.reason_text().contains("timed out"));
}

#[tokio::test]
async fn reachability_check_only_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    assert!(client().check_reachable(&format!("http://{addr}/ws")).await.is_ok());
    drop(listener);
    assert!(client().check_reachable("http://127.0.0.1:1/ws").await.is_err());
}
