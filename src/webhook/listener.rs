use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RingError;

use super::event::WebhookDelivery;

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal HTTP receiver for webhook deliveries when running outside the hub.
///
/// Every well-formed `POST` is acknowledged with `200` and forwarded on the
/// channel; authenticity is checked by the consumer.
#[derive(Debug)]
pub struct WebhookListener {
    listener: TcpListener,
}

impl WebhookListener {
    pub async fn bind(addr: &str) -> Result<Self, RingError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RingError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn spawn(self, tx: mpsc::Sender<WebhookDelivery>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let (stream, peer) = match self.listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("Webhook listener accept failed: {e}");
                        continue;
                    }
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, tx).await {
                        tracing::warn!("Webhook delivery from {peer} rejected: {e}");
                    }
                });
            }
        })
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    tx: mpsc::Sender<WebhookDelivery>,
) -> Result<(), RingError> {
    let request = match tokio::time::timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(request)) => request,
        Ok(Err(e @ RingError::Webhook(_))) => {
            respond(&mut stream, "413 Payload Too Large").await?;
            return Err(e);
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(RingError::Webhook(format!(
                "Timed out reading request after {}s",
                READ_TIMEOUT.as_secs()
            )))
        }
    };

    let (status, result) = match parse_request(&request) {
        Some((method, delivery)) if method == "POST" => {
            let forwarded = tx
                .send(delivery)
                .await
                .map_err(|_| RingError::Webhook("Event loop is gone".into()));
            match forwarded {
                Ok(()) => ("200 OK", Ok(())),
                Err(e) => ("503 Service Unavailable", Err(e)),
            }
        }
        Some((method, _)) => (
            "405 Method Not Allowed",
            Err(RingError::Webhook(format!("Unsupported method {method}"))),
        ),
        None => (
            "400 Bad Request",
            Err(RingError::Webhook("Malformed HTTP request".into())),
        ),
    };

    respond(&mut stream, status).await?;
    result
}

async fn respond(stream: &mut TcpStream, status: &str) -> Result<(), RingError> {
    let response =
        format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Read until the header block and the announced body are complete.
async fn read_request(stream: &mut TcpStream) -> Result<Vec<u8>, RingError> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_REQUEST_BYTES {
            return Err(RingError::Webhook("Request too large".into()));
        }
        if let Some(head_end) = find_head_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..head_end]);
            let wanted = (head_end + 4)
                .checked_add(content_length(&head).unwrap_or(0))
                .filter(|&wanted| wanted <= MAX_REQUEST_BYTES)
                .ok_or_else(|| RingError::Webhook("Request too large".into()))?;
            if buf.len() >= wanted {
                return Ok(buf);
            }
        }
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> Option<usize> {
    head.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Split a raw request into its method and the delivery it carries.
fn parse_request(raw: &[u8]) -> Option<(String, WebhookDelivery)> {
    let head_end = find_head_end(raw)?;
    let head = std::str::from_utf8(&raw[..head_end]).ok()?;
    let mut lines = head.split("\r\n");

    // "POST /path HTTP/1.1"
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    parts.next()?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    let body_start = head_end + 4;
    let body_end = match content_length(head) {
        Some(len) => body_start.checked_add(len)?.min(raw.len()),
        None => raw.len(),
    };
    let body = String::from_utf8_lossy(&raw[body_start..body_end]).into_owned();

    Some((method, WebhookDelivery::new(headers, body)))
}
