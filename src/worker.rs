//! Drives one client connection end to end: read the request, parse it,
//! consult the cache, exchange with the upstream, and shape any error into
//! a response before the connection closes.

use std::sync::Arc;

use smol::io::{AsyncReadExt, AsyncWriteExt};
use smol::net::TcpStream;

use crate::cache::LruCache;
use crate::codec::{self, Request};
use crate::error::ProxyError;
use crate::limits::MAX_REQUEST_WINDOW;
use crate::response::build_error_response;
use crate::upstream;
use crate::util::find_subslice;

pub async fn handle_connection(mut client: TcpStream, cache: Arc<LruCache>) {
    let fingerprint = match read_request_window(&mut client).await {
        Ok(bytes) => bytes,
        Err(_) => return,
    };

    let mut request = match codec::parse(&fingerprint) {
        Ok(req) => req,
        Err(_) => {
            send_error(&mut client, 400).await;
            return;
        }
    };

    if !request.is_forwardable() {
        send_error(&mut client, 501).await;
        return;
    }

    if let Err(err) = validate_shape(&request) {
        log::debug!("rejecting request: {err}");
        send_error(&mut client, 400).await;
        return;
    }

    let is_get = request.method == "GET";
    if is_get {
        if let Some(cached) = cache.lookup(&fingerprint, "GET").await {
            if client.write_all(&cached).await.is_ok() {
                let _ = client.flush().await;
            }
            return;
        }
    }

    match upstream::exchange(&mut request, &mut client, is_get).await {
        Ok(outcome) => {
            if is_get && !outcome.captured.is_empty() {
                cache.insert(outcome.captured, &fingerprint, "GET").await;
            }
        }
        Err(ProxyError::UpstreamUnreachable(msg)) | Err(ProxyError::UpstreamIoError(msg)) => {
            log::warn!("upstream exchange failed: {msg}");
            send_error(&mut client, 500).await;
        }
        Err(other) => {
            log::warn!("unexpected exchange error: {other}");
        }
    }
}

fn validate_shape(request: &Request) -> Result<(), ProxyError> {
    if request.host.is_empty() || request.path.is_empty() {
        return Err(ProxyError::InvalidRequestShape(
            "missing host or path".into(),
        ));
    }
    Ok(())
}

/// Read from `client` until the buffer contains `\r\n\r\n`, the channel
/// yields zero/error, or `MAX_REQUEST_WINDOW` bytes have been read. Returns
/// the raw bytes read so far, which doubles as the cache fingerprint.
async fn read_request_window(client: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(4096);
    let mut tmp = [0u8; 4096];

    loop {
        let remaining = MAX_REQUEST_WINDOW - buf.len();
        let n = client.read(&mut tmp[..remaining.min(tmp.len())]).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "client closed before sending a complete request",
            ));
        }
        buf.extend_from_slice(&tmp[..n]);

        if find_subslice(&buf, b"\r\n\r\n").is_some() {
            return Ok(buf);
        }
        if buf.len() >= MAX_REQUEST_WINDOW {
            return Ok(buf);
        }
    }
}

async fn send_error(client: &mut TcpStream, status: u16) {
    if let Some(bytes) = build_error_response(status) {
        let _ = client.write_all(&bytes).await;
        let _ = client.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::net::TcpListener;

    #[test]
    fn malformed_request_gets_400() {
        smol::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let cache = Arc::new(LruCache::new());

            let server = smol::spawn(async move {
                let (stream, _) = listener.accept().await.unwrap();
                handle_connection(stream, cache).await;
            });

            let mut client = TcpStream::connect(addr).await.unwrap();
            client.write_all(b"NOTAVERB / HTTP/1.1\r\n\r\n").await.unwrap();
            let mut buf = [0u8; 512];
            let n = client.read(&mut buf).await.unwrap();
            server.await;
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 400 Bad Request"));
        });
    }

    #[test]
    fn unsupported_method_gets_501() {
        smol::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let cache = Arc::new(LruCache::new());

            let server = smol::spawn(async move {
                let (stream, _) = listener.accept().await.unwrap();
                handle_connection(stream, cache).await;
            });

            let mut client = TcpStream::connect(addr).await.unwrap();
            client
                .write_all(b"HEAD / HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut buf = [0u8; 512];
            let n = client.read(&mut buf).await.unwrap();
            server.await;
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 501 Not Implemented"));
        });
    }

    #[test]
    fn second_identical_get_is_served_from_cache_without_upstream() {
        smol::block_on(async {
            let origin = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let origin_addr = origin.local_addr().unwrap();
            let origin_task = smol::spawn(async move {
                let (mut stream, _) = origin.accept().await.unwrap();
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await.unwrap();
                stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                    .await
                    .unwrap();
            });

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let cache = Arc::new(LruCache::new());
            let cache_for_server = cache.clone();

            let server = smol::spawn(async move {
                let (stream, _) = listener.accept().await.unwrap();
                handle_connection(stream, cache_for_server).await;
            });

            let raw = format!("GET http://{origin_addr}/x HTTP/1.1\r\n\r\n");
            let mut client = TcpStream::connect(addr).await.unwrap();
            client.write_all(raw.as_bytes()).await.unwrap();
            let mut buf = [0u8; 512];
            let n = client.read(&mut buf).await.unwrap();
            server.await;
            origin_task.await;
            assert_eq!(&buf[..n], b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");

            assert!(cache.lookup(raw.as_bytes(), "GET").await.is_some());
        });
    }
}
