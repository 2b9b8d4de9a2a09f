//! Error types for the routing announcement subsystem
//!
//! Helper failures bubble up untouched to the nearest command handler, which
//! decides reset-vs-continue; the boundary module translates whatever reaches
//! the outermost callable surface into negative status codes.

use thiserror::Error;

use crate::types::NodeAddr;

/// Result type for routing operations
pub type RouteResult<T> = Result<T, RouteError>;

/// Failures that can surface from table mutation and announcement handling.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Allocation failure. Always propagated, never retried internally.
    #[error("resource exhaustion: {0}")]
    Resource(String),
    /// Malformed or inconsistent inbound packet.
    #[error(transparent)]
    Framing(#[from] FramingError),
    /// Peer protocol version rejected; the connection must be reset.
    #[error("incompatible peer version {remote:?}, local version {local:?}")]
    VersionIncompatible { local: [u32; 4], remote: [u32; 4] },
    /// The transport collaborator failed to hand the packet off.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Framing violations detected while decoding untrusted inbound bytes.
///
/// Every variant is rejected before the offending value is used to size or
/// index memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// The buffer ended before a fixed-size field or array.
    #[error("buffer underrun: need {need} bytes, {have} available")]
    Truncated { need: usize, have: usize },
    /// The declared payload length does not match the bytes present.
    #[error("payload declares {declared} bytes, {actual} present")]
    LengthMismatch { declared: u64, actual: u64 },
    /// Bytes were left over after the id container.
    #[error("{trailing} trailing bytes after the id container")]
    TrailingBytes { trailing: usize },
    /// The peer's address count disagrees with the local cluster layout.
    #[error("peer declared {declared} addresses, local table expects {expected}")]
    AddrCountMismatch { declared: u32, expected: u32 },
    /// The address observed for the peer is missing from its declared list.
    #[error("observed peer address {0} not present in the declared address list")]
    UnknownPeerAddress(NodeAddr),
    /// A backend block declares more ids than the payload can hold.
    #[error("backend {backend_id} declares {ids_count} ids, exceeding the remaining payload")]
    OversizedIdArray { backend_id: u32, ids_count: u32 },
    /// The header carries a command code this node does not speak.
    #[error("unknown command code {0}")]
    UnknownCommand(u32),
}

impl From<std::collections::TryReserveError> for RouteError {
    fn from(err: std::collections::TryReserveError) -> Self {
        RouteError::Resource(err.to_string())
    }
}
