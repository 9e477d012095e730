//! Parses a client byte stream into a structured [`Request`] and serializes
//! a `Request` back onto the wire. No I/O happens here; both directions are
//! pure functions over byte buffers.

use crate::error::{ProxyError, Result};
use crate::limits::MAX_HOSTNAME_LEN;
use crate::util::{find_subslice, trimmed_str};

const VALID_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    fn parse(s: &str) -> Option<Version> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub version: Version,
    pub host: String,
    pub port: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub content_length: usize,
}

impl Request {
    /// Supported-for-forwarding methods, a narrower set than what the codec
    /// will successfully parse (see the worker's 501 check).
    pub fn is_forwardable(&self) -> bool {
        matches!(
            self.method.as_str(),
            "GET" | "POST" | "PUT" | "PATCH" | "DELETE"
        )
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Serialize the request line, headers (insertion order), and body into
    /// `out`, appending to whatever it already contains.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.method.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.path.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.version.as_str().as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        if !self.body.is_empty() {
            out.extend_from_slice(&self.body);
        }
    }
}

/// Parse a byte buffer containing at least a full header block terminated
/// by `\r\n\r\n`. Any bytes following the terminator become the initial
/// body segment; the codec does not itself read further bytes from a
/// socket to satisfy `Content-Length` (that is the worker's concern).
pub fn parse(buffer: &[u8]) -> Result<Request> {
    let header_end = find_subslice(buffer, b"\r\n\r\n")
        .ok_or_else(|| ProxyError::MalformedRequest("no header terminator".into()))?;

    let head = &buffer[..header_end];
    let body = buffer[header_end + 4..].to_vec();

    let line_end = find_subslice(head, b"\r\n")
        .ok_or_else(|| ProxyError::MalformedRequest("no request line terminator".into()))?;
    let request_line = &head[..line_end];
    let header_block = &head[line_end + 2..];

    let fields: Vec<&[u8]> = request_line.split(|&b| b == b' ').collect();
    let [method_bytes, target_bytes, version_bytes] = fields.as_slice() else {
        return Err(ProxyError::MalformedRequest(format!(
            "request line must have exactly 3 fields, got {}",
            fields.len()
        )));
    };

    let method = trimmed_str(method_bytes);
    if !VALID_METHODS.contains(&method.as_str()) {
        return Err(ProxyError::MalformedRequest(format!(
            "unrecognized method {method:?}"
        )));
    }

    let version_str = trimmed_str(version_bytes);
    let version = Version::parse(&version_str)
        .ok_or_else(|| ProxyError::MalformedRequest(format!("bad version {version_str:?}")))?;

    let target = trimmed_str(target_bytes);
    let (mut host, mut port, path) = parse_target(&target);

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in header_block.split(|&b| b == b'\r').filter(|l| !l.is_empty()) {
        let line = if line.starts_with(b"\n") { &line[1..] } else { line };
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let name = trimmed_str(&line[..colon]);
        let value = trimmed_str(&line[colon + 1..]);
        if name.is_empty() {
            continue;
        }

        if name.eq_ignore_ascii_case("host") && host.is_empty() {
            if let Some(idx) = value.rfind(':') {
                host = value[..idx].to_string();
                port = value[idx + 1..].to_string();
            } else {
                host = value.clone();
            }
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(0);
        }

        upsert_header(&mut headers, &name, &value);
    }

    if host.len() > MAX_HOSTNAME_LEN {
        let cut = (0..=MAX_HOSTNAME_LEN)
            .rev()
            .find(|&i| host.is_char_boundary(i))
            .unwrap_or(0);
        host.truncate(cut);
    }

    Ok(Request {
        method,
        version,
        host,
        port: if port.is_empty() { "80".to_string() } else { port },
        path,
        headers,
        body,
        content_length,
    })
}

fn upsert_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if let Some(existing) = headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        existing.1 = value.to_string();
    } else {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// Split a request-target into (host, port, path). Absolute-form targets
/// (`http://host[:port][/path]`) yield all three; origin-form targets yield
/// an empty host/port, left to be filled from the `Host` header by the
/// caller.
fn parse_target(target: &str) -> (String, String, String) {
    if let Some(rest) = target.strip_prefix("http://") {
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, "/".to_string()),
        };
        let (host, port) = match authority.find(':') {
            Some(idx) => (authority[..idx].to_string(), authority[idx + 1..].to_string()),
            None => (authority.to_string(), String::new()),
        };
        (host, port, path)
    } else {
        let path = if target.is_empty() {
            "/".to_string()
        } else {
            target.to_string()
        };
        (String::new(), String::new(), path)
    }
}
