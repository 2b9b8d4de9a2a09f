//! Core types for the routing announcement subsystem
//!
//! Identifiers, wire constants, and node-level configuration shared by the
//! ownership table, the announcement codec, and the command handlers.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Size in bytes of a raw content-addressing identifier.
pub const RAW_ID_SIZE: usize = 16;

/// Size in bytes of the opaque portion of a packet destination id.
pub const PACKET_ID_SIZE: usize = 32;

/// Size in bytes of the address storage area inside a wire address entry.
pub const ADDR_STORAGE_SIZE: usize = 28;

/// Address family code for IPv4 entries.
pub const FAMILY_IPV4: u16 = 2;
/// Address family code for IPv6 entries.
pub const FAMILY_IPV6: u16 = 10;

/// Header flag: the receiver must acknowledge the command.
pub const FLAG_NEED_ACK: u64 = 1 << 0;
/// Header flag: the command targets this node directly and must not be re-routed.
pub const FLAG_DIRECT: u64 = 1 << 3;
/// Header flag: the packet was produced for transmission outside the routing lock.
pub const FLAG_NOLOCK: u64 = 1 << 4;

/// High bit of the transaction id, reserved as the reply marker.
pub const TRANS_REPLY: u64 = 1 << 63;

/// Opaque fixed-width content-addressing identifier owned by a backend.
///
/// Compared and copied as a byte blob, never interpreted numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawId(pub [u8; RAW_ID_SIZE]);

impl RawId {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; RAW_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; RAW_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Packet destination id: opaque node identity bytes plus group affiliation.
///
/// During the reverse-lookup exchange the opaque bytes double as the carrier
/// for the piggybacked protocol version fields (see the `version` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketId {
    /// Opaque identity bytes
    pub id: [u8; PACKET_ID_SIZE],
    /// Replication group affiliation
    pub group_id: u32,
}

impl PacketId {
    /// Encoded size on the wire: identity bytes plus the group id.
    pub const WIRE_SIZE: usize = PACKET_ID_SIZE + 4;

    pub fn new(id: [u8; PACKET_ID_SIZE], group_id: u32) -> Self {
        Self { id, group_id }
    }
}

impl Default for PacketId {
    fn default() -> Self {
        Self { id: [0; PACKET_ID_SIZE], group_id: 0 }
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(&self.id[..6]), self.group_id)
    }
}

/// Fixed-size wire representation of a node address.
///
/// Carries enough raw storage for an IPv6 socket address; `addr_len` says how
/// many storage bytes are meaningful. Equality covers the full entry, so two
/// addresses match only if family, length, and bytes all agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAddr {
    /// Raw address storage: port first, then the IP octets.
    pub addr: [u8; ADDR_STORAGE_SIZE],
    /// Number of meaningful bytes in `addr`.
    pub addr_len: u16,
    /// Address family code.
    pub family: u16,
}

impl NodeAddr {
    /// Encoded size on the wire: storage plus length plus family.
    pub const WIRE_SIZE: usize = ADDR_STORAGE_SIZE + 4;
}

impl From<SocketAddr> for NodeAddr {
    fn from(sockaddr: SocketAddr) -> Self {
        let mut addr = [0u8; ADDR_STORAGE_SIZE];
        addr[0..2].copy_from_slice(&sockaddr.port().to_le_bytes());
        match sockaddr.ip() {
            IpAddr::V4(ip) => {
                addr[2..6].copy_from_slice(&ip.octets());
                Self { addr, addr_len: 6, family: FAMILY_IPV4 }
            }
            IpAddr::V6(ip) => {
                addr[2..18].copy_from_slice(&ip.octets());
                Self { addr, addr_len: 18, family: FAMILY_IPV6 }
            }
        }
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = (self.addr_len as usize).min(ADDR_STORAGE_SIZE);
        write!(f, "fam{}:{}", self.family, hex::encode(&self.addr[..len]))
    }
}

/// Protocol command codes carried in the packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    /// A peer requests this node's ownership table on demand.
    ReverseLookup = 1,
    /// A node announces its full backend ownership to a peer.
    Join = 2,
}

impl Command {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Command::ReverseLookup),
            2 => Some(Command::Join),
            _ => None,
        }
    }
}

/// Whether this node has announced itself to a peer yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    /// No join announcement has been sent on this connection.
    NotJoined,
    /// The join announcement was handed to the transport successfully.
    Joined,
}

/// Node-level configuration for the routing subsystem.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// This node's identity, used as the destination id of outbound joins.
    pub node_id: PacketId,
    /// Reachable addresses of this node, in configured order.
    pub addrs: Vec<NodeAddr>,
    /// Local protocol version, piggybacked on the reverse-lookup exchange.
    pub version: [u32; 4],
    /// Number of local index shards, piggybacked next to the version.
    pub shard_count: u32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            node_id: PacketId::default(),
            addrs: vec![NodeAddr::from("127.0.0.1:1025".parse::<SocketAddr>().unwrap())],
            version: crate::version::PROTOCOL_VERSION,
            shard_count: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_addr_from_socket_addr() {
        let v4 = NodeAddr::from("10.0.0.1:1025".parse::<SocketAddr>().unwrap());
        assert_eq!(v4.family, FAMILY_IPV4);
        assert_eq!(v4.addr_len, 6);
        assert_eq!(&v4.addr[0..2], &1025u16.to_le_bytes());
        assert_eq!(&v4.addr[2..6], &[10, 0, 0, 1]);

        let v6 = NodeAddr::from("[::1]:1025".parse::<SocketAddr>().unwrap());
        assert_eq!(v6.family, FAMILY_IPV6);
        assert_eq!(v6.addr_len, 18);
    }

    #[test]
    fn node_addr_equality_is_exact() {
        let a = NodeAddr::from("10.0.0.1:1025".parse::<SocketAddr>().unwrap());
        let b = NodeAddr::from("10.0.0.1:1026".parse::<SocketAddr>().unwrap());
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn command_codes_round_trip() {
        assert_eq!(Command::from_u32(Command::ReverseLookup as u32), Some(Command::ReverseLookup));
        assert_eq!(Command::from_u32(Command::Join as u32), Some(Command::Join));
        assert_eq!(Command::from_u32(99), None);
    }
}
