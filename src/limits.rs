//! Size and concurrency constants shared across the proxy.

/// Read/write chunk size for a single socket operation, and the size of the
/// buffer used to build an outgoing request line plus headers.
pub const MAX_BYTES: usize = 8192;

/// Maximum number of concurrently in-flight client connections.
pub const MAX_CLIENTS: usize = 400;

/// Total bytes the response cache may hold across all entries.
pub const MAX_TOTAL: usize = 200 * 1024 * 1024;

/// Largest single response the cache will accept.
pub const MAX_ELEMENT: usize = 10 * 1024 * 1024;

/// Client request read window: large enough to hold a full header block
/// plus a modest inline body before the worker gives up waiting for CRLFCRLF.
pub const MAX_REQUEST_WINDOW: usize = 2 * MAX_BYTES - 1;

/// Fixed per-entry bookkeeping overhead folded into cache byte accounting,
/// standing in for `sizeof(cache_element)` in the system this cache design
/// was distilled from.
pub const CACHE_ENTRY_OVERHEAD: usize = 64;

/// Maximum host length accepted by the codec.
pub const MAX_HOSTNAME_LEN: usize = 256;
