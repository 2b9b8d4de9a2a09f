//! Announcement packet codec
//!
//! An announcement packet is fully self-describing: a fixed command header,
//! an address container, an id-container header, and one backend block per
//! slot, packed little-endian with no padding. The receiver recomputes every
//! offset purely from the counts embedded in the stream; any mismatch
//! against the declared payload length is a framing violation.

pub mod addr;
pub mod command;
pub mod cursor;
pub mod ids;

pub use addr::AddrContainer;
pub use command::CmdHeader;
pub use cursor::{ReadCursor, WriteCursor};
pub use ids::{decode_id_container, encode_block, BackendAnnouncement, ID_CONTAINER_HEADER_SIZE};

use crate::error::FramingError;
use crate::types::NodeAddr;

/// Fully validated join payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPayload {
    /// Index of the peer's authoritative address within `addrs` (the entry
    /// matching the address this node observed for the connection).
    pub addr_index: usize,
    /// The peer's declared address list, in its configured order.
    pub addrs: Vec<NodeAddr>,
    /// The peer's locally configured address count.
    pub node_addr_num: u32,
    /// Per-backend ownership declarations, in packet order.
    pub backends: Vec<BackendAnnouncement>,
}

/// Validate and decode a join payload: address container followed by the id
/// container.
///
/// `observed_addr` is the socket address this node observed for the peer;
/// the peer must list it among its declared addresses, proving it asserts a
/// consistently observed identity. `local_addr_num` is this node's own
/// configured address count; a symmetric cluster requires both sides to
/// agree on it. Nothing is returned unless the payload was consumed exactly.
pub fn parse_join_payload(
    payload: &[u8],
    observed_addr: &NodeAddr,
    local_addr_num: usize,
) -> Result<JoinPayload, FramingError> {
    let mut cur = ReadCursor::new(payload);

    let container = AddrContainer::decode(&mut cur)?;

    // The id-container header must follow the address array.
    if cur.remaining() < ID_CONTAINER_HEADER_SIZE {
        return Err(FramingError::Truncated {
            need: ID_CONTAINER_HEADER_SIZE,
            have: cur.remaining(),
        });
    }

    if container.addr_num as usize != local_addr_num {
        return Err(FramingError::AddrCountMismatch {
            declared: container.addr_num,
            expected: local_addr_num as u32,
        });
    }

    let addr_index = container
        .addrs
        .iter()
        .position(|a| a == observed_addr)
        .ok_or(FramingError::UnknownPeerAddress(*observed_addr))?;

    let backends = decode_id_container(&mut cur)?;
    cur.finish()?;

    Ok(JoinPayload {
        addr_index,
        addrs: container.addrs,
        node_addr_num: container.node_addr_num,
        backends,
    })
}

/// Decode a complete announcement packet, header included.
///
/// This is the receiving side of a reverse-lookup reply or join
/// announcement; the declared payload length must match the bytes present
/// exactly.
pub fn decode_announcement(
    packet: &[u8],
) -> Result<(CmdHeader, AddrContainer, Vec<BackendAnnouncement>), FramingError> {
    let mut cur = ReadCursor::new(packet);
    let header = CmdHeader::decode(&mut cur)?;

    if header.size != cur.remaining() as u64 {
        return Err(FramingError::LengthMismatch {
            declared: header.size,
            actual: cur.remaining() as u64,
        });
    }

    let addrs = AddrContainer::decode(&mut cur)?;
    let backends = decode_id_container(&mut cur)?;
    cur.finish()?;

    Ok((header, addrs, backends))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawId, RAW_ID_SIZE};
    use std::net::SocketAddr;

    fn addr(spec: &str) -> NodeAddr {
        NodeAddr::from(spec.parse::<SocketAddr>().unwrap())
    }

    fn build_payload(addrs: &[NodeAddr], backends: &[BackendAnnouncement]) -> Vec<u8> {
        let total = AddrContainer::wire_size(addrs.len())
            + ID_CONTAINER_HEADER_SIZE
            + backends.iter().map(|b| BackendAnnouncement::wire_size(b.ids.len())).sum::<usize>();
        let mut cur = WriteCursor::with_exact_size(total).unwrap();
        AddrContainer::encode(&mut cur, addrs);
        cur.put_u32_le(backends.len() as u32);
        for backend in backends {
            backend.encode(&mut cur);
        }
        cur.finish().unwrap()
    }

    #[test]
    fn join_payload_round_trip() {
        let addrs = vec![addr("10.0.0.1:1025"), addr("10.0.0.1:1026")];
        let backends = vec![BackendAnnouncement {
            backend_id: 0,
            group_id: 2,
            ids: vec![RawId::from_bytes([0xaa; RAW_ID_SIZE])],
        }];
        let payload = build_payload(&addrs, &backends);

        let parsed = parse_join_payload(&payload, &addrs[1], 2).unwrap();
        assert_eq!(parsed.addr_index, 1);
        assert_eq!(parsed.addrs, addrs);
        assert_eq!(parsed.node_addr_num, 2);
        assert_eq!(parsed.backends, backends);
    }

    #[test]
    fn addr_count_mismatch_is_rejected() {
        let addrs = vec![addr("10.0.0.1:1025")];
        let payload = build_payload(&addrs, &[]);

        let err = parse_join_payload(&payload, &addrs[0], 2).unwrap_err();
        assert_eq!(err, FramingError::AddrCountMismatch { declared: 1, expected: 2 });
    }

    #[test]
    fn unknown_observed_address_is_rejected() {
        let addrs = vec![addr("10.0.0.1:1025")];
        let payload = build_payload(&addrs, &[]);
        let other = addr("10.0.0.2:1025");

        let err = parse_join_payload(&payload, &other, 1).unwrap_err();
        assert_eq!(err, FramingError::UnknownPeerAddress(other));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let addrs = vec![addr("10.0.0.1:1025")];
        let payload = build_payload(&addrs, &[]);

        // Cut the id-container header off.
        let err = parse_join_payload(&payload[..payload.len() - 4], &addrs[0], 1).unwrap_err();
        assert_eq!(err, FramingError::Truncated { need: ID_CONTAINER_HEADER_SIZE, have: 0 });
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let addrs = vec![addr("10.0.0.1:1025")];
        let mut payload = build_payload(&addrs, &[]);
        payload.push(0);

        let err = parse_join_payload(&payload, &addrs[0], 1).unwrap_err();
        assert_eq!(err, FramingError::TrailingBytes { trailing: 1 });
    }
}
