//! Routecast — cluster membership and routing announcements
//!
//! Tracks which storage backends are active on this node and which id
//! ranges each one owns, and serializes that ownership into the
//! announcement packets exchanged when a node joins the cluster or answers
//! a peer's reverse lookup.
//!
//! The table is a single mutex-guarded component owned by the node for its
//! lifetime; handlers receive it by reference. Snapshots are built in one
//! critical section so a packet's declared payload length always matches
//! the bytes written, and every inbound count is validated before it sizes
//! memory.

pub mod boundary;
pub mod error;
pub mod handlers;
pub mod table;
pub mod types;
pub mod version;
pub mod wire;

// Re-export core types and functions
pub use error::{FramingError, RouteError, RouteResult};
pub use handlers::{PeerState, Transport};
pub use table::{BackendSlot, RouteList};
pub use types::{Command, JoinState, NodeAddr, PacketId, RawId, RouteConfig};
pub use wire::{decode_announcement, parse_join_payload, BackendAnnouncement, CmdHeader, JoinPayload};
