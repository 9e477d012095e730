//! Typed outcomes for the core request-handling components.
//!
//! `anyhow` is reserved for process-level plumbing (CLI, logger, shutdown
//! wiring); every core component contract returns one of these variants so
//! callers can match on disposition instead of inspecting a message string.

pub type Result<T> = core::result::Result<T, ProxyError>;

#[derive(Debug, Clone)]
pub enum ProxyError {
    /// The client byte stream could not be parsed into a request.
    MalformedRequest(String),
    /// The request's method is well-formed but not one this proxy forwards.
    UnsupportedMethod(String),
    /// Parse succeeded but host, path, or version are missing/invalid.
    InvalidRequestShape(String),
    /// DNS resolution or the upstream TCP connect failed.
    UpstreamUnreachable(String),
    /// A read or write against the upstream socket failed.
    UpstreamIoError(String),
    /// A read or write against the client socket failed.
    ClientIoError(String),
    /// The cache rejected an entry (too large, or allocation failure).
    CacheRejection(String),
}

impl ProxyError {
    /// The status line this error maps to, when the client socket is still
    /// writable. `ClientIoError` and `CacheRejection` have no client-facing
    /// status: the former means the socket is already gone, the latter is
    /// an advisory outcome the worker never surfaces.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProxyError::MalformedRequest(_) | ProxyError::InvalidRequestShape(_) => Some(400),
            ProxyError::UnsupportedMethod(_) => Some(501),
            ProxyError::UpstreamUnreachable(_) | ProxyError::UpstreamIoError(_) => Some(500),
            ProxyError::ClientIoError(_) | ProxyError::CacheRejection(_) => None,
        }
    }
}

impl core::error::Error for ProxyError {}

impl core::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::MalformedRequest(msg) => write!(f, "[MalformedRequest] {msg}"),
            ProxyError::UnsupportedMethod(msg) => write!(f, "[UnsupportedMethod] {msg}"),
            ProxyError::InvalidRequestShape(msg) => write!(f, "[InvalidRequestShape] {msg}"),
            ProxyError::UpstreamUnreachable(msg) => write!(f, "[UpstreamUnreachable] {msg}"),
            ProxyError::UpstreamIoError(msg) => write!(f, "[UpstreamIoError] {msg}"),
            ProxyError::ClientIoError(msg) => write!(f, "[ClientIoError] {msg}"),
            ProxyError::CacheRejection(msg) => write!(f, "[CacheRejection] {msg}"),
        }
    }
}
