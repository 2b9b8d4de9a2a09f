//! Protocol version exchange piggybacked on the destination id
//!
//! Reverse lookup is the first command exchanged on a fresh connection, so
//! both sides stuff their protocol version and index shard count into the
//! opaque bytes of the header's destination id instead of widening the
//! header. The handler decodes the peer's fields, overwrites them with the
//! local values for the reply, and checks compatibility.

use log::warn;

use crate::error::{RouteError, RouteResult};
use crate::types::PacketId;

/// Protocol version announced by this node.
pub const PROTOCOL_VERSION: [u32; 4] = [2, 28, 0, 0];

const SHARD_COUNT_OFFSET: usize = 16;

/// Write a protocol version into the id's opaque bytes (little-endian words).
pub fn encode_version(id: &mut PacketId, version: &[u32; 4]) {
    for (i, part) in version.iter().enumerate() {
        id.id[i * 4..i * 4 + 4].copy_from_slice(&part.to_le_bytes());
    }
}

/// Read the protocol version back out of the id's opaque bytes.
pub fn decode_version(id: &PacketId) -> [u32; 4] {
    let mut version = [0u32; 4];
    for (i, part) in version.iter_mut().enumerate() {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&id.id[i * 4..i * 4 + 4]);
        *part = u32::from_le_bytes(raw);
    }
    version
}

/// Write the index shard count next to the version words.
pub fn encode_shard_count(id: &mut PacketId, shard_count: u32) {
    id.id[SHARD_COUNT_OFFSET..SHARD_COUNT_OFFSET + 4].copy_from_slice(&shard_count.to_le_bytes());
}

/// Read the index shard count back out of the id's opaque bytes.
pub fn decode_shard_count(id: &PacketId) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&id.id[SHARD_COUNT_OFFSET..SHARD_COUNT_OFFSET + 4]);
    u32::from_le_bytes(raw)
}

/// Check whether a peer's protocol version can interoperate with ours.
///
/// Only the major component is load-bearing; a minor mismatch is logged and
/// tolerated.
pub fn check(local: &[u32; 4], remote: &[u32; 4]) -> RouteResult<()> {
    if local[0] != remote[0] {
        return Err(RouteError::VersionIncompatible { local: *local, remote: *remote });
    }
    if local[1] != remote[1] {
        warn!(
            "peer minor version {} differs from local minor version {}",
            remote[1], local[1]
        );
    }
    Ok(())
}
