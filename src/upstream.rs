//! Opens one TCP connection to the origin named by a parsed request,
//! writes the re-serialized request, and relays the reply back to the
//! client a chunk at a time.

use smol::io::{AsyncReadExt, AsyncWriteExt};
use smol::net::TcpStream;

use crate::codec::Request;
use crate::error::{ProxyError, Result};
use crate::limits::MAX_BYTES;

/// Outcome of one upstream exchange: the raw bytes forwarded to the client,
/// captured only when the request is a GET so its response can be offered
/// to the cache. Non-GET exchanges leave this empty.
pub struct ExchangeOutcome {
    pub captured: Vec<u8>,
}

/// Perform one request/response round trip against `request.host:port` and
/// relay the response to `client`. Forces `Connection: close` and ensures a
/// `Host` header is present before sending. Only buffers the response for
/// caching when `should_capture` is set, matching `should_cache` in the
/// system this was distilled from.
pub async fn exchange(
    request: &mut Request,
    client: &mut TcpStream,
    should_capture: bool,
) -> Result<ExchangeOutcome> {
    request.set_header("Connection", "close");
    if request.get_header("Host").is_none() {
        let host = request.host.clone();
        request.set_header("Host", &host);
    }

    let mut out = Vec::with_capacity(MAX_BYTES);
    request.serialize(&mut out);

    let addr = format!("{}:{}", request.host, request.port);
    let mut upstream = TcpStream::connect(&addr)
        .await
        .map_err(|e| ProxyError::UpstreamUnreachable(format!("connect {addr}: {e}")))?;

    upstream
        .write_all(&out)
        .await
        .map_err(|e| ProxyError::UpstreamIoError(format!("write headers: {e}")))?;
    if !request.body.is_empty() {
        upstream
            .write_all(&request.body)
            .await
            .map_err(|e| ProxyError::UpstreamIoError(format!("write body: {e}")))?;
    }

    let mut captured = Vec::new();
    let mut buf = [0u8; MAX_BYTES - 1];
    loop {
        let n = upstream
            .read(&mut buf)
            .await
            .map_err(|e| ProxyError::UpstreamIoError(format!("read: {e}")))?;
        if n == 0 {
            break;
        }
        if client.write_all(&buf[..n]).await.is_err() {
            // client went away mid-relay; not an error worth reporting upstream
            break;
        }
        if should_capture {
            captured.extend_from_slice(&buf[..n]);
        }
    }

    Ok(ExchangeOutcome { captured })
}
