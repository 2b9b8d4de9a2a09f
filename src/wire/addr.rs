//! Address container codec
//!
//! A count-prefixed block of the sender's reachable addresses. `addr_num` is
//! the number of entries that follow; `node_addr_num` repeats the sender's
//! locally configured address count so the receiver can detect asymmetric
//! cluster configurations.

use crate::error::FramingError;
use crate::types::{NodeAddr, ADDR_STORAGE_SIZE};

use super::cursor::{ReadCursor, WriteCursor};

/// Decoded address container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrContainer {
    /// Number of address entries carried.
    pub addr_num: u32,
    /// The sender's locally configured address count.
    pub node_addr_num: u32,
    /// The address entries, in the sender's configured order.
    pub addrs: Vec<NodeAddr>,
}

impl AddrContainer {
    /// Size of the count prefix.
    pub const HEADER_SIZE: usize = 8;

    /// Encoded size of a container holding `addr_count` entries.
    pub fn wire_size(addr_count: usize) -> usize {
        Self::HEADER_SIZE + addr_count * NodeAddr::WIRE_SIZE
    }

    /// Encode the local address list; both counts match the list length.
    pub fn encode(cur: &mut WriteCursor, addrs: &[NodeAddr]) {
        cur.put_u32_le(addrs.len() as u32);
        cur.put_u32_le(addrs.len() as u32);
        for addr in addrs {
            addr.encode(cur);
        }
    }

    /// Decode a container, verifying the declared count fits the buffer
    /// before any entry is read.
    pub fn decode(cur: &mut ReadCursor<'_>) -> Result<Self, FramingError> {
        let addr_num = cur.get_u32_le()?;
        let node_addr_num = cur.get_u32_le()?;

        let need = (addr_num as usize)
            .checked_mul(NodeAddr::WIRE_SIZE)
            .ok_or(FramingError::Truncated { need: usize::MAX, have: cur.remaining() })?;
        if cur.remaining() < need {
            return Err(FramingError::Truncated { need, have: cur.remaining() });
        }

        let mut addrs = Vec::with_capacity(addr_num as usize);
        for _ in 0..addr_num {
            addrs.push(NodeAddr::decode(cur)?);
        }
        Ok(Self { addr_num, node_addr_num, addrs })
    }
}

impl NodeAddr {
    pub(crate) fn encode(&self, cur: &mut WriteCursor) {
        cur.put_bytes(&self.addr);
        cur.put_u16_le(self.addr_len);
        cur.put_u16_le(self.family);
    }

    pub(crate) fn decode(cur: &mut ReadCursor<'_>) -> Result<Self, FramingError> {
        let mut addr = [0u8; ADDR_STORAGE_SIZE];
        addr.copy_from_slice(cur.get_bytes(ADDR_STORAGE_SIZE)?);
        let addr_len = cur.get_u16_le()?;
        let family = cur.get_u16_le()?;
        Ok(Self { addr, addr_len, family })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn addr(spec: &str) -> NodeAddr {
        NodeAddr::from(spec.parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn container_round_trip() {
        let addrs = vec![addr("10.0.0.1:1025"), addr("[fe80::1]:1025")];

        let mut cur = WriteCursor::with_exact_size(AddrContainer::wire_size(addrs.len())).unwrap();
        AddrContainer::encode(&mut cur, &addrs);
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let container = AddrContainer::decode(&mut cur).unwrap();
        cur.finish().unwrap();

        assert_eq!(container.addr_num, 2);
        assert_eq!(container.node_addr_num, 2);
        assert_eq!(container.addrs, addrs);
    }

    #[test]
    fn declared_count_checked_before_reading_entries() {
        // Declares 100 entries but carries none.
        let mut cur = WriteCursor::with_exact_size(AddrContainer::HEADER_SIZE).unwrap();
        cur.put_u32_le(100);
        cur.put_u32_le(100);
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let err = AddrContainer::decode(&mut cur).unwrap_err();
        assert_eq!(err, FramingError::Truncated { need: 100 * NodeAddr::WIRE_SIZE, have: 0 });
    }

    #[test]
    fn empty_container_round_trip() {
        let mut cur = WriteCursor::with_exact_size(AddrContainer::wire_size(0)).unwrap();
        AddrContainer::encode(&mut cur, &[]);
        let buf = cur.finish().unwrap();

        let mut cur = ReadCursor::new(&buf);
        let container = AddrContainer::decode(&mut cur).unwrap();
        assert!(container.addrs.is_empty());
        assert_eq!(container.addr_num, 0);
    }
}
